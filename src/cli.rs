use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use serde_json::json;
use std::path::PathBuf;

use crate::config::WizardConfig;
use crate::disk::backend::BackendKind;
use crate::disk::catalog::{Drive, filter_candidates, list_drives};
use crate::disk::plan::{compute_plan, validate_drive};
use crate::disk::prepare::{DiskPreparer, PrepareOptions};
use crate::disk::units::{self, format_gb};
use crate::error::PrepareError;
use crate::process::SystemRunner;
use crate::process::logging::CommandLogger;
use crate::prompt::{DialoguerPrompter, Prompter};
use crate::system::{fstab, locale, timesync};
use crate::ui::prelude::*;

/// Interactive disk preparation for a fresh Linux installation
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Activate debug mode and log every command to the command log
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// Print destructive commands instead of running them
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Configuration file (defaults to /etc/prepwizard/config.toml when present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format for status events
    #[arg(long, value_enum, default_value = "text", global = true)]
    pub output: OutputFormat,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Options shared by the commands that partition a drive.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct DiskArgs {
    /// Partitioning tool used to write the table
    #[arg(long, value_enum)]
    pub backend: Option<BackendKind>,

    /// Proposed swap size in MB
    #[arg(long)]
    pub swap_mb: Option<u64>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Set up the locale, enable time sync and prepare a disk
    Install {
        #[command(flatten)]
        disk: DiskArgs,
    },
    /// Select, partition, format and mount a drive
    Disk {
        #[command(flatten)]
        disk: DiskArgs,
    },
    /// List drives that can receive the installation
    List,
    /// Show the partition layout and tool input for a drive without writing it
    Plan {
        /// Drive to plan for; prompts when omitted
        #[arg(long)]
        drive: Option<String>,

        /// Plan for a drive of this size instead of reading it from the system
        #[arg(long)]
        size_bytes: Option<u64>,

        #[command(flatten)]
        disk: DiskArgs,
    },
    /// Choose, generate and set the system locale
    Locale,
    /// Enable network time synchronization
    TimeSync,
    /// Append generated fstab entries for the mounted target
    Fstab {
        /// Root of the mounted installation (defaults to the configured mount target)
        #[arg(long)]
        target: Option<PathBuf>,
    },
}

fn ensure_root() -> Result<()> {
    if let sudo::RunningAs::User = sudo::check() {
        sudo::with_env(&["RUST_BACKTRACE"])
            .map_err(|e| anyhow::anyhow!("Failed to escalate privileges: {}", e))?;
    }
    Ok(())
}

fn check_tools(tools: &[&str]) -> Result<()> {
    let missing: Vec<&str> = tools
        .iter()
        .copied()
        .filter(|tool| which::which(tool).is_err())
        .collect();

    if !missing.is_empty() {
        anyhow::bail!("Missing required tools: {}", missing.join(", "));
    }
    Ok(())
}

/// Everything a command handler needs: configuration, process runner, prompts.
struct App {
    config: WizardConfig,
    runner: SystemRunner,
    prompter: DialoguerPrompter,
    dry_run: bool,
}

impl App {
    fn new(cli: &Cli) -> Result<Self> {
        let config =
            WizardConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;

        let mut runner = SystemRunner::new(cli.dry_run);
        if cli.debug {
            match CommandLogger::new(config.log.command_log.clone()) {
                Ok(logger) => runner = runner.with_logger(logger),
                Err(e) => emit(
                    Level::Warn,
                    "log.unavailable",
                    &format!("Command log disabled: {e:#}"),
                    None,
                ),
            }
        }

        Ok(Self {
            config,
            runner,
            prompter: DialoguerPrompter,
            dry_run: cli.dry_run,
        })
    }

    /// Root is needed for anything that touches block devices or /etc.
    fn require_root(&self) -> Result<()> {
        if self.dry_run {
            return Ok(());
        }
        ensure_root()
    }

    fn apply_disk_args(&mut self, args: &DiskArgs) {
        if let Some(backend) = args.backend {
            self.config.disk.backend = backend;
        }
        if let Some(swap_mb) = args.swap_mb {
            self.config.swap.default_mb = swap_mb;
        }
    }

    async fn prepare_disk(&self) -> Result<()> {
        if !self.dry_run {
            check_tools(&crate::disk::required_tools(&self.config))?;
        }

        DiskPreparer::new(&self.runner, &self.prompter, PrepareOptions::from(&self.config))
            .run()
            .await
            .context("Disk preparation failed")?;
        Ok(())
    }

    async fn candidates(&self) -> Result<Vec<Drive>> {
        let drives = list_drives(&self.runner)
            .await
            .context("Failed to list drives")?;
        Ok(filter_candidates(drives, &self.config.disk.exclude_prefixes))
    }
}

pub async fn run(cli: Cli) -> Result<()> {
    let mut app = App::new(&cli)?;

    let Some(command) = cli.command else {
        println!("prepwizard: run with --help for usage");
        return Ok(());
    };

    match command {
        Commands::Install { disk } => {
            app.require_root()?;
            app.apply_disk_args(&disk);
            if !app.dry_run {
                let mut tools = crate::disk::required_tools(&app.config);
                tools.extend(["locale-gen", "timedatectl"]);
                check_tools(&tools)?;
            }
            crate::install::run_install(&app.runner, &app.prompter, &app.config, app.dry_run)
                .await?;
        }
        Commands::Disk { disk } => {
            app.require_root()?;
            app.apply_disk_args(&disk);
            app.prepare_disk().await?;
        }
        Commands::List => {
            app.require_root()?;
            let drives = app.candidates().await?;
            print_drives(&drives);
        }
        Commands::Plan {
            drive,
            size_bytes,
            disk,
        } => {
            app.apply_disk_args(&disk);
            let drive = match size_bytes {
                Some(size_bytes) => Drive {
                    name: drive.unwrap_or_else(|| "/dev/sda".to_string()),
                    size_bytes,
                },
                None => {
                    app.require_root()?;
                    pick_drive(&app, drive.as_deref()).await?
                }
            };
            print_plan(&app.config, &drive)?;
        }
        Commands::Locale => {
            app.require_root()?;
            locale::setup_locale(&app.runner, &app.prompter, &app.config.locale, app.dry_run)
                .await
                .context("Locale setup failed")?;
        }
        Commands::TimeSync => {
            app.require_root()?;
            timesync::enable_time_sync(&app.runner)
                .await
                .context("Failed to enable time synchronization")?;
        }
        Commands::Fstab { target } => {
            app.require_root()?;
            let target = target.unwrap_or_else(|| app.config.disk.mount_target.clone());
            fstab::generate_fstab(&app.runner, &target, &app.config.fstab.path, app.dry_run)
                .await
                .context("Failed to generate fstab")?;
        }
    }

    Ok(())
}

async fn pick_drive(app: &App, name: Option<&str>) -> Result<Drive> {
    let drives = app.candidates().await?;
    if drives.is_empty() {
        return Err(PrepareError::NoDrives.into());
    }

    if let Some(name) = name {
        return drives
            .into_iter()
            .find(|drive| drive.name == name)
            .ok_or_else(|| anyhow::anyhow!("Drive {} not found", name));
    }

    let labels: Vec<String> = drives.iter().map(Drive::label).collect();
    let index = app.prompter.select("Choose a drive:", &labels, 0)?;
    drives
        .get(index)
        .cloned()
        .ok_or_else(|| PrepareError::NoDrives.into())
}

fn print_drives(drives: &[Drive]) {
    if get_output_format() == OutputFormat::Json {
        emit(
            Level::Info,
            "disk.list",
            &format!("{} drives found", drives.len()),
            Some(json!({ "drives": drives })),
        );
        return;
    }

    if drives.is_empty() {
        emit(Level::Warn, "disk.list", "No drives found", None);
        return;
    }

    for drive in drives {
        println!(
            "  {}  {:<16} {:>12}",
            NerdFont::HardDrive.to_string().bright_cyan(),
            drive.name.bright_white(),
            format_gb(drive.size_bytes)
        );
    }
}

fn print_plan(config: &WizardConfig, drive: &Drive) -> Result<()> {
    validate_drive(drive, config.disk.min_drive_bytes)?;
    let plan = compute_plan(
        drive,
        units::mb_to_bytes(config.swap.default_mb),
        &config.disk.geometry(),
    )?;
    let backend = config.disk.backend.create();
    let script = backend.script(&plan);

    if get_output_format() == OutputFormat::Json {
        emit(
            Level::Info,
            "disk.plan",
            &format!("Partition plan for {}", drive.name),
            Some(json!({
                "plan": &plan,
                "program": backend.program(),
                "script": script.tokens(),
            })),
        );
        return Ok(());
    }

    println!(
        "  {} {} {}",
        NerdFont::HardDrive.to_string().bright_cyan(),
        drive.name.bright_white().bold(),
        format_gb(drive.size_bytes)
    );
    separator(true);
    println!(
        "  #{} primary   {:>16} bytes",
        plan.primary.number, plan.primary.size_bytes
    );
    println!(
        "  #{} extended  {:>16} bytes",
        plan.extended.number, plan.extended.size_bytes
    );
    println!(
        "  #{} swap      {:>16} bytes (type {})",
        plan.swap.number,
        plan.swap_size_bytes(),
        plan.swap.type_code
    );
    println!(
        "     reserved  {:>16} bytes",
        plan.reserved_offset_bytes
    );
    separator(true);

    println!("  {} {} {}", NerdFont::Terminal, backend.program(), plan.drive_name);
    for step in script.steps() {
        let inputs: Vec<String> = step
            .inputs
            .iter()
            .map(|input| format!("{input:?}"))
            .collect();
        println!(
            "    {:<40} {}",
            step.description.bright_black(),
            inputs.join(" ")
        );
    }

    Ok(())
}

/// Prints a failure the way the operator needs it: validation problems as a
/// plain explanation, tool failures with the tool's own output.
pub fn report_error(err: &anyhow::Error) {
    let prepare = err
        .chain()
        .find_map(|cause| cause.downcast_ref::<PrepareError>());

    match prepare {
        Some(e) if e.is_validation() => {
            emit(
                Level::Error,
                "error.validation",
                &format!("{} {}", NerdFont::Warning, e),
                None,
            );
        }
        Some(PrepareError::ToolExit { tool, result }) => {
            emit(
                Level::Error,
                "error.tool",
                &format!("{} {err:#}", NerdFont::Cross),
                Some(json!({
                    "tool": tool,
                    "exit_code": result.exit_code,
                    "signal": result.signal,
                    "stderr": result.stderr,
                })),
            );
        }
        _ => {
            emit(
                Level::Error,
                "error",
                &format!("{} {err:#}", NerdFont::Cross),
                None,
            );
        }
    }
}

pub fn exit_code(err: &anyhow::Error) -> i32 {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<PrepareError>())
        .map_or(1, PrepareError::exit_code)
}
