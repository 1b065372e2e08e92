use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{OpenOptions, create_dir_all};
use std::io::Write;
use std::path::PathBuf;

use super::{Invocation, ProcessResult};

#[derive(Debug, Serialize, Deserialize)]
pub struct CommandLog {
    pub timestamp: DateTime<Utc>,
    pub command: String,
    pub args: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<String>,
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
    pub signal: Option<i32>,
    pub success: bool,
}

/// Appends one JSON line per external command to a log file.
#[derive(Debug, Clone)]
pub struct CommandLogger {
    log_file: PathBuf,
}

impl CommandLogger {
    pub fn new(log_file: PathBuf) -> Result<Self> {
        if let Some(parent) = log_file.parent() {
            create_dir_all(parent).context("Failed to create command log directory")?;
        }

        Ok(Self { log_file })
    }

    pub fn log_command(&self, invocation: &Invocation, result: &ProcessResult) -> Result<()> {
        let log_entry = CommandLog {
            timestamp: Utc::now(),
            command: invocation.program.clone(),
            args: invocation.args.clone(),
            input: invocation.input.clone(),
            stdout: result.stdout.clone(),
            stderr: result.stderr.clone(),
            exit_code: result.exit_code,
            signal: result.signal,
            success: result.is_success(),
        };

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_file)
            .context("Failed to open command log file")?;

        let json_line =
            serde_json::to_string(&log_entry).context("Failed to serialize command log")?;

        writeln!(file, "{json_line}").context("Failed to write to command log file")?;

        Ok(())
    }
}
