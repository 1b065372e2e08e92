use crate::disk::plan::PartitionPlan;
use crate::disk::script::CommandScript;
use crate::disk::units::bytes_to_kib;

use super::PartitioningBackend;

/// Writes the same layout through an `sfdisk` input script.
pub struct SfdiskBackend;

#[async_trait::async_trait]
impl PartitioningBackend for SfdiskBackend {
    fn program(&self) -> &'static str {
        "sfdisk"
    }

    fn script(&self, plan: &PartitionPlan) -> CommandScript {
        CommandScript::new()
            .step("dos label", ["label: dos"])
            .step(
                "primary partition",
                [format!(
                    "size={}KiB, type=83",
                    bytes_to_kib(plan.primary.size_bytes)
                )],
            )
            .step(
                "extended partition",
                [format!(
                    "size={}KiB, type=5",
                    bytes_to_kib(plan.extended.size_bytes)
                )],
            )
            .step(
                "logical swap partition",
                [format!("type={}", plan.swap.type_code)],
            )
    }
}
