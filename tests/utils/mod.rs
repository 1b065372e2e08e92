use anyhow::Result;
use std::process::Command;

use crate::common::TestEnvironment;

#[derive(Debug)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

/// Runs the built binary with the environment's config and colors off.
pub fn run_prepwizard_command(env: &TestEnvironment, args: &[&str]) -> Result<CommandOutput> {
    let output = Command::new(env!("CARGO_BIN_EXE_prepwizard"))
        .arg("--no-color")
        .arg("--config")
        .arg(env.config_path())
        .args(args)
        .env("NO_COLOR", "1")
        .current_dir(env.path())
        .output()?;

    Ok(CommandOutput {
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        exit_code: output.status.code().unwrap_or(-1),
    })
}

/// Parses every stdout line as a JSON event.
pub fn json_events(output: &CommandOutput) -> Result<Vec<serde_json::Value>> {
    output
        .stdout
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| Ok(serde_json::from_str(line)?))
        .collect()
}
