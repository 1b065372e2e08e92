//! Partition table writers.
//!
//! A backend turns a [`PartitionPlan`] into the exact input its tool expects
//! and runs the tool once against the drive. Success is decided by the exit
//! status alone; the written table is not read back.

mod fdisk;
mod sfdisk;

pub use fdisk::FdiskBackend;
pub use sfdisk::SfdiskBackend;

use serde::{Deserialize, Serialize};

use crate::error::PrepareError;
use crate::process::{CommandRunner, Invocation, ProcessResult};

use super::plan::PartitionPlan;
use super::script::CommandScript;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Scripted interactive fdisk session
    #[default]
    Fdisk,
    /// sfdisk input script
    Sfdisk,
}

impl BackendKind {
    pub fn create(self) -> Box<dyn PartitioningBackend> {
        match self {
            BackendKind::Fdisk => Box::new(FdiskBackend),
            BackendKind::Sfdisk => Box::new(SfdiskBackend),
        }
    }
}

#[async_trait::async_trait]
pub trait PartitioningBackend: Send + Sync {
    /// Program spawned with the drive path as its only argument.
    fn program(&self) -> &'static str;

    fn script(&self, plan: &PartitionPlan) -> CommandScript;

    /// Writes the planned table. The tool's stdout is shown to the operator
    /// and returned as the session transcript.
    async fn apply(
        &self,
        plan: &PartitionPlan,
        runner: &dyn CommandRunner,
    ) -> Result<ProcessResult, PrepareError> {
        let invocation = Invocation::new(self.program())
            .arg(plan.drive_name.clone())
            .input(self.script(plan).render())
            .forward_output();

        runner.run_checked(&invocation).await
    }
}
