//! encode command - produce a static credential list

use super::{prompt_line, CommandContext, PROMPT_PREFIX};
use anyhow::Result;
use bindguard_auth::Credential;
use bindguard_core::config::PROP_STATIC_CREDENTIALS;
use colored::Colorize;
use std::io::{self, BufRead, Write};
use tracing::debug;

const PROMPT_FOR_USERNAME: &str = "Enter username:";
const PROMPT_FOR_PASSWORD: &str = "Enter password:";
const PROMPT_FOR_MORE_USERS: &str = "Would you like to encode another user? (y/n)";

pub fn execute(ctx: &CommandContext, username: Option<String>, password: Option<String>) -> Result<()> {
    let credentials = match (username, password) {
        (Some(username), Some(password)) => {
            if let Some(problem) = username_problem(&username) {
                anyhow::bail!(problem);
            }
            if password.trim().is_empty() {
                anyhow::bail!("Password cannot be empty");
            }
            vec![Credential::with_random_salt(username, &password)?]
        }
        _ => {
            println!("\nSpecify the username and password you would like to encode:\n");
            let stdin = io::stdin();
            prompt_for_credentials(&mut stdin.lock(), &mut io::stdout())?
        }
    };

    debug!("Encoded {} credential(s)", credentials.len());
    let list = credential_list(&credentials);
    if ctx.is_json() {
        println!("{}", serde_json::json!({ (PROP_STATIC_CREDENTIALS): list }));
    } else {
        println!(
            "\n{}\n",
            "Place this credential string in the broker property file:".bold()
        );
        println!("{}{} = \"{}\"", PROMPT_PREFIX, PROP_STATIC_CREDENTIALS, list);
        println!();
    }
    Ok(())
}

/// Space separated `username:salt:hash` tokens
pub fn credential_list(credentials: &[Credential]) -> String {
    credentials
        .iter()
        .map(Credential::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Usernames become the first field of a space separated `user:salt:hash`
/// token, so they cannot hold a separator.
fn username_problem(username: &str) -> Option<&'static str> {
    if username.is_empty() {
        Some("Username cannot be empty.")
    } else if username.contains(':') || username.chars().any(char::is_whitespace) {
        Some("Username cannot contain ':' or whitespace.")
    } else {
        None
    }
}

fn print_error<W: Write>(output: &mut W, message: &str) -> Result<()> {
    writeln!(output, "{}{} {}", PROMPT_PREFIX, "ERROR:".red(), message)?;
    Ok(())
}

/// Prompt until the user stops adding users.
///
/// Usernames must be unique and free of separators; passwords must not be
/// blank.
pub fn prompt_for_credentials<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
) -> Result<Vec<Credential>> {
    let mut credentials: Vec<Credential> = Vec::new();

    loop {
        let username = loop {
            let username = prompt_line(input, output, PROMPT_FOR_USERNAME)?;
            if let Some(problem) = username_problem(&username) {
                print_error(output, problem)?;
            } else if credentials.iter().any(|c| c.username() == username) {
                print_error(output, "That username was previously entered.")?;
            } else {
                break username;
            }
        };

        let password = loop {
            let password = prompt_line(input, output, PROMPT_FOR_PASSWORD)?;
            if password.trim().is_empty() {
                print_error(output, "Password cannot be empty.")?;
            } else {
                break password;
            }
        };

        credentials.push(Credential::with_random_salt(username, &password)?);
        writeln!(output)?;

        let more = loop {
            match prompt_line(input, output, PROMPT_FOR_MORE_USERS)?.trim() {
                "y" | "Y" => break true,
                "n" | "N" => break false,
                _ => {}
            }
        };
        writeln!(output)?;

        if !more {
            return Ok(credentials);
        }
    }
}
