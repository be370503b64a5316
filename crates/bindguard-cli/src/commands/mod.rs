//! CLI command implementations

pub mod check;
pub mod encode;

use crate::OutputFormat;
use bindguard_core::AuthConfig;
use std::io::{BufRead, Write};

/// Context passed to all commands
pub struct CommandContext {
    pub config: AuthConfig,
    pub output_format: OutputFormat,
}

impl CommandContext {
    /// Check if output should be JSON
    pub fn is_json(&self) -> bool {
        matches!(self.output_format, OutputFormat::Json)
    }
}

/// Indent applied to interactive prompts
pub const PROMPT_PREFIX: &str = "   ";

/// Print `prompt` and read one line without its line ending.
///
/// End of input is an error so a closed stdin cannot loop forever.
pub fn prompt_line<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    prompt: &str,
) -> anyhow::Result<String> {
    write!(output, "{}{} ", PROMPT_PREFIX, prompt)?;
    output.flush()?;

    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        anyhow::bail!("Unexpected end of input");
    }
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}
