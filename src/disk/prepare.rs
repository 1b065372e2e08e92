//! The disk preparation state machine.
//!
//! Each state owns exactly the data the next step needs, so a declined
//! confirmation can hand the drive list back to selection without
//! re-listing or recursing. Any other error ends the run where it happened;
//! nothing already written to the disk is rolled back.

use serde::Serialize;
use serde_json::json;
use std::path::PathBuf;

use crate::config::WizardConfig;
use crate::error::PrepareError;
use crate::process::CommandRunner;
use crate::prompt::Prompter;
use crate::ui::prelude::*;

use super::backend::BackendKind;
use super::catalog::{Drive, filter_candidates, list_drives};
use super::format::{FormatOptions, format, make_swap};
use super::mount::{mount, partition_path, swap_on};
use super::plan::{Geometry, PartitionPlan, compute_plan, max_swap_bytes, validate_drive};
use super::units::{self, BYTES_PER_MB};
use super::wipe::wipe;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Listing,
    Selecting,
    Validating,
    Confirming,
    Wiping,
    Planning,
    Partitioning,
    Formatting,
    Mounting,
    Done,
}

impl Stage {
    fn code(self) -> &'static str {
        match self {
            Stage::Listing => "listing",
            Stage::Selecting => "selecting",
            Stage::Validating => "validating",
            Stage::Confirming => "confirming",
            Stage::Wiping => "wiping",
            Stage::Planning => "planning",
            Stage::Partitioning => "partitioning",
            Stage::Formatting => "formatting",
            Stage::Mounting => "mounting",
            Stage::Done => "done",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PrepareOptions {
    pub min_drive_bytes: u64,
    pub geometry: Geometry,
    pub exclude_prefixes: Vec<String>,
    pub backend: BackendKind,
    pub format: FormatOptions,
    pub mount_target: PathBuf,
    pub default_swap_mb: u64,
    pub format_swap: bool,
    pub activate_swap: bool,
}

impl From<&WizardConfig> for PrepareOptions {
    fn from(config: &WizardConfig) -> Self {
        Self {
            min_drive_bytes: config.disk.min_drive_bytes,
            geometry: config.disk.geometry(),
            exclude_prefixes: config.disk.exclude_prefixes.clone(),
            backend: config.disk.backend,
            format: FormatOptions {
                fs_type: config.disk.filesystem.clone(),
                force: config.disk.force_format,
            },
            mount_target: config.disk.mount_target.clone(),
            default_swap_mb: config.swap.default_mb,
            format_swap: config.swap.format,
            activate_swap: config.swap.activate,
        }
    }
}

/// What the run left behind: a partitioned, formatted and mounted drive.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreparedDisk {
    pub drive: Drive,
    pub plan: PartitionPlan,
    pub root_partition: String,
    pub swap_partition: String,
    pub mount_target: PathBuf,
}

enum State {
    Listing,
    Selecting { drives: Vec<Drive> },
    Validating { drives: Vec<Drive>, drive: Drive },
    Confirming { drives: Vec<Drive>, drive: Drive },
    Wiping { drive: Drive, swap_bytes: u64 },
    Planning { drive: Drive, swap_bytes: u64 },
    Partitioning { drive: Drive, plan: PartitionPlan },
    Formatting { drive: Drive, plan: PartitionPlan },
    Mounting { drive: Drive, plan: PartitionPlan },
    Done(PreparedDisk),
}

impl State {
    fn stage(&self) -> Stage {
        match self {
            State::Listing => Stage::Listing,
            State::Selecting { .. } => Stage::Selecting,
            State::Validating { .. } => Stage::Validating,
            State::Confirming { .. } => Stage::Confirming,
            State::Wiping { .. } => Stage::Wiping,
            State::Planning { .. } => Stage::Planning,
            State::Partitioning { .. } => Stage::Partitioning,
            State::Formatting { .. } => Stage::Formatting,
            State::Mounting { .. } => Stage::Mounting,
            State::Done(_) => Stage::Done,
        }
    }
}

pub struct DiskPreparer<'a> {
    runner: &'a dyn CommandRunner,
    prompter: &'a dyn Prompter,
    options: PrepareOptions,
}

impl<'a> DiskPreparer<'a> {
    pub fn new(
        runner: &'a dyn CommandRunner,
        prompter: &'a dyn Prompter,
        options: PrepareOptions,
    ) -> Self {
        Self {
            runner,
            prompter,
            options,
        }
    }

    /// Drives the machine from listing to a mounted root partition.
    pub async fn run(&self) -> Result<PreparedDisk, PrepareError> {
        let mut state = State::Listing;

        loop {
            let stage = state.stage();
            emit(
                Level::Debug,
                "disk.stage",
                &format!("Entering {}", stage.code()),
                Some(json!({ "stage": stage })),
            );

            if let State::Done(prepared) = state {
                emit(
                    Level::Success,
                    "disk.prepared",
                    &format!(
                        "{} {} is ready at {}",
                        NerdFont::Check,
                        prepared.root_partition,
                        prepared.mount_target.display()
                    ),
                    Some(json!({ "prepared": &prepared })),
                );
                return Ok(prepared);
            }

            state = match self.advance(state).await {
                Ok(next) => next,
                // The caller reports the error itself; this only traces the stage.
                Err(err) => {
                    emit(
                        Level::Debug,
                        "disk.failed",
                        &format!(
                            "{} Disk preparation failed while {}: {}",
                            NerdFont::Cross,
                            stage.code(),
                            err
                        ),
                        Some(json!({ "stage": stage, "exit_code": err.exit_code() })),
                    );
                    return Err(err);
                }
            };
        }
    }

    async fn advance(&self, state: State) -> Result<State, PrepareError> {
        match state {
            State::Listing => {
                let drives = filter_candidates(
                    list_drives(self.runner).await?,
                    &self.options.exclude_prefixes,
                );
                if drives.is_empty() {
                    return Err(PrepareError::NoDrives);
                }
                Ok(State::Selecting { drives })
            }

            State::Selecting { drives } => {
                let labels: Vec<String> = drives.iter().map(Drive::label).collect();
                let index = self.prompter.select("Choose a drive:", &labels, 0)?;
                let drive = drives.get(index).cloned().ok_or(PrepareError::NoDrives)?;
                Ok(State::Validating { drives, drive })
            }

            State::Validating { drives, drive } => {
                validate_drive(&drive, self.options.min_drive_bytes)?;
                Ok(State::Confirming { drives, drive })
            }

            State::Confirming { drives, drive } => match self.confirm(&drive) {
                Ok(swap_bytes) => Ok(State::Wiping { drive, swap_bytes }),
                Err(PrepareError::UserDeclined { drive: declined }) => {
                    emit(
                        Level::Warn,
                        "disk.declined",
                        &format!("{declined} left untouched, choose another drive"),
                        None,
                    );
                    Ok(State::Selecting { drives })
                }
                Err(err) => Err(err),
            },

            State::Wiping { drive, swap_bytes } => {
                emit(
                    Level::Info,
                    "disk.wipe",
                    &format!("{} Wiping partition table on {}", NerdFont::Eraser, drive.name),
                    None,
                );
                wipe(&drive.name, self.runner).await?;
                Ok(State::Planning { drive, swap_bytes })
            }

            State::Planning { drive, swap_bytes } => {
                let plan = compute_plan(&drive, swap_bytes, &self.options.geometry)?;
                emit(
                    Level::Debug,
                    "disk.plan",
                    &format!(
                        "Primary {} bytes, swap {} bytes, reserved {} bytes",
                        plan.primary.size_bytes,
                        plan.swap_size_bytes(),
                        plan.reserved_offset_bytes
                    ),
                    Some(json!({ "plan": &plan })),
                );
                Ok(State::Partitioning { drive, plan })
            }

            State::Partitioning { drive, plan } => {
                emit(
                    Level::Info,
                    "disk.partition",
                    &format!("{} Writing partition table to {}", NerdFont::Partition, drive.name),
                    None,
                );
                let backend = self.options.backend.create();
                backend.apply(&plan, self.runner).await?;
                Ok(State::Formatting { drive, plan })
            }

            State::Formatting { drive, plan } => {
                let root = partition_path(&drive.name, plan.primary.number);
                emit(
                    Level::Info,
                    "disk.format",
                    &format!(
                        "{} Creating {} on {}",
                        NerdFont::HardDrive,
                        self.options.format.fs_type,
                        root
                    ),
                    None,
                );
                format(&root, &self.options.format, self.runner).await?;

                if self.options.format_swap {
                    make_swap(&partition_path(&drive.name, plan.swap.number), self.runner).await?;
                }
                Ok(State::Mounting { drive, plan })
            }

            State::Mounting { drive, plan } => {
                let root = partition_path(&drive.name, plan.primary.number);
                let swap = partition_path(&drive.name, plan.swap.number);
                let target = self.options.mount_target.clone();

                emit(
                    Level::Info,
                    "disk.mount",
                    &format!("{} Mounting {} at {}", NerdFont::Folder, root, target.display()),
                    None,
                );
                mount(&root, &target, self.runner).await?;

                // Active swap is what lets fstab generation record it.
                if self.options.format_swap && self.options.activate_swap {
                    swap_on(&swap, self.runner).await?;
                }

                Ok(State::Done(PreparedDisk {
                    drive,
                    plan,
                    root_partition: root,
                    swap_partition: swap,
                    mount_target: target,
                }))
            }

            State::Done(prepared) => Ok(State::Done(prepared)),
        }
    }

    /// Asks for erasure consent, then for the swap size in megabytes.
    fn confirm(&self, drive: &Drive) -> Result<u64, PrepareError> {
        let confirmed = self.prompter.confirm(
            &format!(
                "{} will be erased. Are you sure you want to use this drive?",
                drive.name
            ),
            false,
        )?;
        if !confirmed {
            return Err(PrepareError::UserDeclined {
                drive: drive.name.clone(),
            });
        }

        self.ask_swap_bytes(drive)
    }

    fn ask_swap_bytes(&self, drive: &Drive) -> Result<u64, PrepareError> {
        let max_bytes = max_swap_bytes(drive, &self.options.geometry);

        loop {
            let mb = self
                .prompter
                .input_u64("Swap partition size (MB)", self.options.default_swap_mb)?;
            let bytes = units::mb_to_bytes(mb);

            if bytes > 0 && bytes <= max_bytes {
                return Ok(bytes);
            }

            emit(
                Level::Warn,
                "disk.swap_out_of_range",
                &format!(
                    "{mb} MB does not fit on {}. Enter a size between 1 and {} MB",
                    drive.name,
                    max_bytes / BYTES_PER_MB
                ),
                None,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::Echo;
    use crate::testing::{Answer, FakeRunner, ScriptedPrompter, failure, stdout};

    const LISTING: &str = "\
Disk /dev/sda: 9.31 GiB, 10000000000 bytes, 19531250 sectors
Units: sectors of 1 * 512 = 512 bytes

Disk /dev/sdb: 3.73 GiB, 4000000000 bytes, 7812500 sectors
Units: sectors of 1 * 512 = 512 bytes

Disk /dev/loop0: 1.00 GiB, 1073741824 bytes, 2097152 sectors
";

    fn runner() -> FakeRunner {
        FakeRunner::new().respond("fdisk", stdout(LISTING))
    }

    fn options() -> PrepareOptions {
        PrepareOptions::from(&WizardConfig::default())
    }

    #[tokio::test]
    async fn happy_path_runs_every_tool_in_order() {
        let runner = runner();
        let prompter = ScriptedPrompter::new([
            Answer::Select(0),
            Answer::Confirm(true),
            Answer::Number(4000),
        ]);

        let prepared = DiskPreparer::new(&runner, &prompter, options())
            .run()
            .await
            .unwrap();

        assert_eq!(
            runner.programs(),
            vec!["fdisk", "dd", "fdisk", "mkfs", "mkswap", "mount", "swapon"]
        );
        assert_eq!(prepared.root_partition, "/dev/sda1");
        assert_eq!(prepared.swap_partition, "/dev/sda5");
        assert_eq!(prepared.plan.swap_size_bytes(), 4_000_000_000);
        assert_eq!(prepared.plan.total_bytes(), 10_000_000_000);

        let calls = runner.calls();
        assert_eq!(calls[2].args, vec!["/dev/sda"]);
        assert_eq!(calls[2].echo, Echo::Forward);
        assert!(calls[2].input.as_deref().unwrap().contains("+3906250K\n"));
        assert_eq!(calls[3].args, vec!["-t", "ext4", "-F", "/dev/sda1"]);
        assert_eq!(calls[5].args, vec!["/dev/sda1", "/mnt"]);
        assert_eq!(prompter.remaining(), 0);
    }

    #[tokio::test]
    async fn too_small_drive_fails_before_touching_the_disk() {
        let runner = runner();
        let prompter = ScriptedPrompter::new([Answer::Select(1)]);

        let err = DiskPreparer::new(&runner, &prompter, options())
            .run()
            .await
            .unwrap_err();

        match err {
            PrepareError::DriveTooSmall { drive, .. } => assert_eq!(drive, "/dev/sdb"),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(runner.programs(), vec!["fdisk"]);
        assert_eq!(prompter.prompts(), vec!["Choose a drive:"]);
    }

    #[tokio::test]
    async fn declined_confirmation_returns_to_selection() {
        let runner = runner();
        let prompter = ScriptedPrompter::new([
            Answer::Select(0),
            Answer::Confirm(false),
            Answer::Select(0),
            Answer::Confirm(true),
            Answer::Number(1000),
        ]);

        let prepared = DiskPreparer::new(&runner, &prompter, options())
            .run()
            .await
            .unwrap();

        let prompts = prompter.prompts();
        assert_eq!(prompts[0], "Choose a drive:");
        assert_eq!(
            prompts[1],
            "/dev/sda will be erased. Are you sure you want to use this drive?"
        );
        assert_eq!(prompts[2], "Choose a drive:");
        assert_eq!(prepared.plan.swap_size_bytes(), 1_000_000_000);
        // The drive list is reused, not re-read.
        assert_eq!(runner.programs().iter().filter(|p| *p == "fdisk").count(), 2);
    }

    #[tokio::test]
    async fn out_of_range_swap_is_asked_again() {
        let runner = runner();
        let prompter = ScriptedPrompter::new([
            Answer::Select(0),
            Answer::Confirm(true),
            Answer::Number(0),
            Answer::Number(20_000),
            Answer::Number(2000),
        ]);

        let prepared = DiskPreparer::new(&runner, &prompter, options())
            .run()
            .await
            .unwrap();

        assert_eq!(prepared.plan.swap_size_bytes(), 2_000_000_000);
        assert_eq!(
            prompter
                .prompts()
                .iter()
                .filter(|p| *p == "Swap partition size (MB)")
                .count(),
            3
        );
    }

    #[tokio::test]
    async fn swap_leaving_less_than_a_mebibyte_primary_is_asked_again() {
        let runner = runner();
        // 9997 MB on the 10 GB drive would leave a primary of 902,848 bytes.
        let prompter = ScriptedPrompter::new([
            Answer::Select(0),
            Answer::Confirm(true),
            Answer::Number(9997),
            Answer::Number(9996),
        ]);

        let prepared = DiskPreparer::new(&runner, &prompter, options())
            .run()
            .await
            .unwrap();

        assert_eq!(prepared.plan.swap_size_bytes(), 9_996_000_000);
        assert!(prepared.plan.primary.size_bytes >= 1024 * 1024);
        assert_eq!(prompter.remaining(), 0);
    }

    #[tokio::test]
    #[serial_test::serial]
    async fn failure_is_left_for_the_caller_to_report() {
        let runner = runner().respond("dd", failure(1, "dd: /dev/sda: Permission denied"));
        let prompter = ScriptedPrompter::new([
            Answer::Select(0),
            Answer::Confirm(true),
            Answer::Number(4000),
        ]);

        crate::ui::start_recording();
        let err = DiskPreparer::new(&runner, &prompter, options())
            .run()
            .await
            .unwrap_err();
        let events = crate::ui::take_recorded();

        assert!(matches!(err, PrepareError::ToolExit { .. }));
        assert!(events.contains(&(Level::Info, "disk.wipe".to_string())));
        assert!(
            !events
                .iter()
                .any(|(level, code)| *level == Level::Error && code == "disk.failed")
        );
    }

    #[tokio::test]
    async fn wipe_failure_stops_before_partitioning() {
        let runner = runner().respond("dd", failure(1, "dd: Permission denied"));
        let prompter = ScriptedPrompter::new([
            Answer::Select(0),
            Answer::Confirm(true),
            Answer::Number(4000),
        ]);

        let err = DiskPreparer::new(&runner, &prompter, options())
            .run()
            .await
            .unwrap_err();

        assert!(matches!(err, PrepareError::ToolExit { ref tool, .. } if tool == "dd"));
        assert_eq!(runner.programs(), vec!["fdisk", "dd"]);
    }

    #[tokio::test]
    async fn format_failure_stops_before_mount() {
        let runner =
            runner().respond("mkfs", failure(8, "mkfs.ext4: Device size reported to be zero"));
        let prompter = ScriptedPrompter::new([
            Answer::Select(0),
            Answer::Confirm(true),
            Answer::Number(4000),
        ]);

        let err = DiskPreparer::new(&runner, &prompter, options())
            .run()
            .await
            .unwrap_err();

        match &err {
            PrepareError::ToolExit { tool, result } => {
                assert_eq!(tool, "mkfs");
                assert_eq!(result.exit_code, Some(8));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(err.exit_code(), 8);
        assert!(!runner.programs().contains(&"mount".to_string()));
    }

    #[tokio::test]
    async fn empty_catalog_is_no_drives() {
        let runner = FakeRunner::new().respond("fdisk", stdout(""));
        let prompter = ScriptedPrompter::new([]);

        let err = DiskPreparer::new(&runner, &prompter, options())
            .run()
            .await
            .unwrap_err();

        assert!(matches!(err, PrepareError::NoDrives));
    }

    #[tokio::test]
    async fn swap_steps_follow_configuration() {
        let runner = runner();
        let prompter = ScriptedPrompter::new([
            Answer::Select(0),
            Answer::Confirm(true),
            Answer::Number(4000),
        ]);
        let mut options = options();
        options.format_swap = false;
        options.backend = BackendKind::Sfdisk;

        DiskPreparer::new(&runner, &prompter, options)
            .run()
            .await
            .unwrap();

        assert_eq!(
            runner.programs(),
            vec!["fdisk", "dd", "sfdisk", "mkfs", "mount"]
        );
    }
}
