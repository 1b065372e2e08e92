//! External process execution.
//!
//! Every tool the wizard drives goes through a [`CommandRunner`]. The system
//! runner spawns the process with tokio, feeds optional stdin, drains stdout
//! and stderr concurrently and hands back an owned [`ProcessResult`].

pub mod logging;

use serde::Serialize;
use std::io::{ErrorKind, Write};
use std::process::{ExitStatus, Stdio};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWriteExt, BufReader};
use tokio::process::Command;

use crate::error::PrepareError;
use crate::ui::prelude::*;

use self::logging::CommandLogger;

/// Outcome of one external process invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProcessResult {
    pub exit_code: Option<i32>,
    pub signal: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessResult {
    /// A successful result with no output, used for simulated runs.
    pub fn success() -> Self {
        Self {
            exit_code: Some(0),
            ..Self::default()
        }
    }

    pub fn from_status(status: ExitStatus, stdout: String, stderr: String) -> Self {
        use std::os::unix::process::ExitStatusExt;

        Self {
            exit_code: status.code(),
            signal: status.signal(),
            stdout,
            stderr,
        }
    }

    pub fn is_success(&self) -> bool {
        self.exit_code == Some(0)
    }

    pub fn status_description(&self) -> String {
        match (self.exit_code, self.signal) {
            (Some(code), _) => format!("exit code {code}"),
            (None, Some(signal)) => format!("killed by signal {signal}"),
            (None, None) => "unknown status".to_string(),
        }
    }
}

/// Where the tool's stdout goes while it runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Echo {
    /// Only captured.
    Capture,
    /// Captured and also forwarded line by line to the operator's terminal.
    Forward,
}

/// A fully described external command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub input: Option<String>,
    pub echo: Echo,
    /// Read-only commands still run in dry-run mode.
    pub read_only: bool,
}

impl Invocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            input: None,
            echo: Echo::Capture,
            read_only: false,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn input(mut self, input: impl Into<String>) -> Self {
        self.input = Some(input.into());
        self
    }

    pub fn forward_output(mut self) -> Self {
        self.echo = Echo::Forward;
        self
    }

    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    pub fn command_line(&self) -> String {
        if self.args.is_empty() {
            self.program.clone()
        } else {
            format!("{} {}", self.program, self.args.join(" "))
        }
    }
}

#[async_trait::async_trait]
pub trait CommandRunner: Send + Sync {
    /// Runs the command to completion. Fails only when it cannot be started.
    async fn run(&self, invocation: &Invocation) -> Result<ProcessResult, PrepareError>;

    /// Runs the command and turns a non-zero exit into [`PrepareError::ToolExit`].
    async fn run_checked(&self, invocation: &Invocation) -> Result<ProcessResult, PrepareError> {
        let result = self.run(invocation).await?;
        if result.is_success() {
            Ok(result)
        } else {
            Err(PrepareError::tool_exit(invocation.program.clone(), result))
        }
    }
}

pub struct SystemRunner {
    pub dry_run: bool,
    logger: Option<CommandLogger>,
}

impl SystemRunner {
    pub fn new(dry_run: bool) -> Self {
        Self {
            dry_run,
            logger: None,
        }
    }

    pub fn with_logger(mut self, logger: CommandLogger) -> Self {
        self.logger = Some(logger);
        self
    }

    fn print_dry_run(&self, invocation: &Invocation) {
        let cmd_str = invocation.command_line();

        match invocation.input.as_deref() {
            Some(input) if input.contains('\n') => {
                println!("[DRY RUN] --- BEGIN COMMAND ---");
                println!("> {}", cmd_str);
                for line in input.lines() {
                    println!("{}", line);
                }
                println!("[DRY RUN] --- END COMMAND ---");
            }
            Some(input) => println!("[DRY RUN] echo '{}' | {}", input, cmd_str),
            None => println!("[DRY RUN] {}", cmd_str),
        }
    }

    async fn spawn(&self, invocation: &Invocation) -> Result<ProcessResult, PrepareError> {
        let invocation_error = |source| PrepareError::ToolInvocation {
            tool: invocation.program.clone(),
            source,
        };

        let mut child = Command::new(&invocation.program)
            .args(&invocation.args)
            .stdin(if invocation.input.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(invocation_error)?;

        let stdout = child.stdout.take().map(|out| {
            let forward = (invocation.echo == Echo::Forward)
                .then(|| ForwardTo::for_format(get_output_format()));
            tokio::spawn(drain(out, forward))
        });
        let stderr = child.stderr.take().map(|err| tokio::spawn(drain(err, None)));

        if let (Some(input), Some(mut stdin)) = (invocation.input.as_deref(), child.stdin.take()) {
            match stdin.write_all(input.as_bytes()).await {
                Ok(()) => {}
                // The tool quit before reading every answer; its exit status tells why.
                Err(err) if err.kind() == ErrorKind::BrokenPipe => {}
                Err(err) => {
                    let _ = child.kill().await;
                    return Err(invocation_error(err));
                }
            }
            // Closing stdin lets the tool see EOF after the last answer.
            drop(stdin);
        }

        let status = child.wait().await.map_err(invocation_error)?;

        let stdout = collect(stdout).await;
        let stderr = collect(stderr).await;

        Ok(ProcessResult::from_status(status, stdout, stderr))
    }
}

#[async_trait::async_trait]
impl CommandRunner for SystemRunner {
    async fn run(&self, invocation: &Invocation) -> Result<ProcessResult, PrepareError> {
        if self.dry_run && !invocation.read_only {
            self.print_dry_run(invocation);
            return Ok(ProcessResult::success());
        }

        emit(
            Level::Debug,
            "process.spawn",
            &format!("Running: {}", invocation.command_line()),
            None,
        );

        let result = self.spawn(invocation).await?;

        if let Some(logger) = &self.logger
            && let Err(e) = logger.log_command(invocation, &result)
        {
            emit(
                Level::Warn,
                "process.log_failed",
                &format!("Warning: Failed to log command: {e}"),
                None,
            );
        }

        Ok(result)
    }
}

/// Terminal stream that receives forwarded tool output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ForwardTo {
    Stdout,
    Stderr,
}

impl ForwardTo {
    /// JSON mode keeps stdout for events only.
    fn for_format(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Text => ForwardTo::Stdout,
            OutputFormat::Json => ForwardTo::Stderr,
        }
    }

    fn write_line(self, line: &str) {
        let _ = match self {
            ForwardTo::Stdout => writeln!(std::io::stdout().lock(), "{line}"),
            ForwardTo::Stderr => writeln!(std::io::stderr().lock(), "{line}"),
        };
    }
}

/// Reads the stream to EOF. Bytes that are not UTF-8 are replaced, never dropped.
async fn drain<R>(reader: R, forward: Option<ForwardTo>) -> String
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    let mut captured = String::new();

    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }

        let text = String::from_utf8_lossy(&buf);
        let line = text.strip_suffix('\n').unwrap_or(&text);
        if let Some(target) = forward {
            target.write_line(line);
        }
        captured.push_str(line);
        captured.push('\n');
    }

    captured
}

async fn collect(handle: Option<tokio::task::JoinHandle<String>>) -> String {
    match handle {
        Some(handle) => handle.await.unwrap_or_default(),
        None => String::new(),
    }
}
