use thiserror::Error;

use crate::process::ProcessResult;

#[derive(Error, Debug)]
pub enum PrepareError {
    #[error("Failed to start {tool}: {source}")]
    ToolInvocation {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{tool} failed ({}): {}", .result.status_description(), .result.stderr.trim())]
    ToolExit { tool: String, result: ProcessResult },

    #[error("{drive} must be at least {}GB", .min_bytes / crate::disk::units::BYTES_PER_GB)]
    DriveTooSmall {
        drive: String,
        size_bytes: u64,
        min_bytes: u64,
    },

    #[error(
        "Cannot fit {swap_bytes} bytes of swap on {drive}: only {available_bytes} bytes are usable"
    )]
    PlanInfeasible {
        drive: String,
        swap_bytes: u64,
        available_bytes: u64,
    },

    #[error("{drive} was not confirmed for erasure")]
    UserDeclined { drive: String },

    #[error("No drives found. Are you running as root?")]
    NoDrives,

    #[error("Prompt failed: {0}")]
    Prompt(#[from] dialoguer::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    Config(#[from] toml::de::Error),
}

impl PrepareError {
    /// Process exit status to report for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            PrepareError::ToolExit { result, .. } => match result.exit_code {
                Some(code) if code != 0 => code,
                _ => 1,
            },
            _ => 1,
        }
    }

    /// True for errors caused by operator intent rather than a failing tool.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            PrepareError::DriveTooSmall { .. }
                | PrepareError::PlanInfeasible { .. }
                | PrepareError::UserDeclined { .. }
        )
    }

    pub fn tool_exit(tool: impl Into<String>, result: ProcessResult) -> Self {
        PrepareError::ToolExit {
            tool: tool.into(),
            result,
        }
    }
}
