use crate::disk::plan::PartitionPlan;
use crate::disk::script::CommandScript;
use crate::disk::units::bytes_to_kib;

use super::PartitioningBackend;

/// Drives util-linux `fdisk` through its single-letter menu.
pub struct FdiskBackend;

/// Last-sector answer expressed as a size, e.g. `+488281K`.
fn size_answer(bytes: u64) -> String {
    format!("+{}K", bytes_to_kib(bytes))
}

#[async_trait::async_trait]
impl PartitioningBackend for FdiskBackend {
    fn program(&self) -> &'static str {
        "fdisk"
    }

    fn script(&self, plan: &PartitionPlan) -> CommandScript {
        let primary = plan.primary.number.to_string();
        let extended = plan.extended.number.to_string();
        let swap = plan.swap.number.to_string();

        CommandScript::new()
            .step("create a new empty DOS partition table", ["o"])
            .step(
                "add primary partition",
                vec![
                    "n".to_string(),
                    "p".to_string(),
                    primary,
                    String::new(),
                    size_answer(plan.primary.size_bytes),
                ],
            )
            .step(
                "add extended partition",
                vec![
                    "n".to_string(),
                    "e".to_string(),
                    extended,
                    String::new(),
                    size_answer(plan.extended.size_bytes),
                ],
            )
            // fdisk numbers the first logical partition itself and defaults
            // both ends to the extended container's bounds.
            .step("add logical swap partition", ["n", "l", "", ""])
            .step(
                "set swap partition type",
                vec!["t".to_string(), swap, plan.swap.type_code.clone()],
            )
            .step("write table to disk and exit", ["w"])
    }
}
