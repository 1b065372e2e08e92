use std::path::Path;

use crate::error::PrepareError;
use crate::process::{CommandRunner, Invocation};

pub async fn mount(
    partition: &str,
    target: &Path,
    runner: &dyn CommandRunner,
) -> Result<(), PrepareError> {
    let invocation = Invocation::new("mount")
        .arg(partition)
        .arg(target.to_string_lossy());

    runner.run_checked(&invocation).await?;
    Ok(())
}

/// Activates swap so fstab generation can pick it up.
pub async fn swap_on(partition: &str, runner: &dyn CommandRunner) -> Result<(), PrepareError> {
    runner
        .run_checked(&Invocation::new("swapon").arg(partition))
        .await?;
    Ok(())
}

/// Partition device path for a drive, e.g. `/dev/sda` → `/dev/sda1` and
/// `/dev/nvme0n1` → `/dev/nvme0n1p1`.
pub fn partition_path(drive: &str, number: u32) -> String {
    if drive.chars().last().is_some_and(|c| c.is_ascii_digit()) {
        format!("{}p{}", drive, number)
    } else {
        format!("{}{}", drive, number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeRunner;

    #[test]
    fn partition_paths_follow_kernel_naming() {
        assert_eq!(partition_path("/dev/sda", 1), "/dev/sda1");
        assert_eq!(partition_path("/dev/vdb", 5), "/dev/vdb5");
        assert_eq!(partition_path("/dev/nvme0n1", 1), "/dev/nvme0n1p1");
        assert_eq!(partition_path("/dev/mmcblk0", 5), "/dev/mmcblk0p5");
    }

    #[tokio::test]
    async fn mounts_partition_at_target() {
        let runner = FakeRunner::new();
        mount("/dev/sda1", Path::new("/mnt"), &runner).await.unwrap();

        let calls = runner.calls();
        assert_eq!(calls[0].program, "mount");
        assert_eq!(calls[0].args, vec!["/dev/sda1", "/mnt"]);
    }
}
