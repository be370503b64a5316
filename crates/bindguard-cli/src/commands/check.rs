//! check command - authenticate once against the configured backend

use super::{prompt_line, CommandContext};
use anyhow::Result;
use bindguard_auth::{build_authenticator, AuthStatus, AuthenticationAttempt};
use colored::Colorize;
use std::io;
use tracing::debug;

/// Returns whether the attempt succeeded
pub async fn execute(ctx: &CommandContext, username: &str, password: Option<String>) -> Result<bool> {
    let password = match password {
        Some(password) => password,
        None => {
            let stdin = io::stdin();
            prompt_line(&mut stdin.lock(), &mut io::stdout(), "Enter password:")?
        }
    };

    let authenticator = build_authenticator(&ctx.config).await?;
    debug!("Checking credentials for {}", username);
    let attempt = authenticator.authenticate(username, &password).await;

    if ctx.is_json() {
        println!("{}", attempt_json(&attempt));
    } else {
        let status = match attempt.status() {
            AuthStatus::Success => attempt.status().to_string().green(),
            AuthStatus::Failure => attempt.status().to_string().yellow(),
            AuthStatus::Error => attempt.status().to_string().red(),
        };
        println!(
            "{} {} [{} ms] {}",
            status.bold(),
            username,
            attempt.elapsed().num_milliseconds(),
            attempt.message()
        );
    }

    Ok(attempt.was_successful())
}

fn attempt_json(attempt: &AuthenticationAttempt) -> serde_json::Value {
    serde_json::json!({
        "username": attempt.username(),
        "status": attempt.status().as_str(),
        "message": attempt.message(),
        "start_time": attempt.start_time().to_rfc3339(),
        "elapsed_ms": attempt.elapsed().num_milliseconds(),
    })
}
