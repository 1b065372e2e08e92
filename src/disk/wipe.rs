use crate::error::PrepareError;
use crate::process::{CommandRunner, Invocation};

/// Bytes zeroed at the start of the drive; covers the DOS table signature.
pub const WIPE_BYTES: u64 = 512;

/// Destroys any partition-table signature at the start of the drive.
pub async fn wipe(drive_name: &str, runner: &dyn CommandRunner) -> Result<(), PrepareError> {
    let invocation = Invocation::new("dd").args([
        "if=/dev/zero".to_string(),
        format!("of={drive_name}"),
        format!("bs={WIPE_BYTES}"),
        "count=1".to_string(),
    ]);

    runner.run_checked(&invocation).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::ProcessResult;
    use crate::testing::FakeRunner;

    #[tokio::test]
    async fn zeroes_one_sector_of_the_drive() {
        let runner = FakeRunner::new();
        wipe("/dev/sdb", &runner).await.unwrap();

        let calls = runner.calls();
        assert_eq!(calls[0].program, "dd");
        assert_eq!(
            calls[0].args,
            vec!["if=/dev/zero", "of=/dev/sdb", "bs=512", "count=1"]
        );
    }

    #[tokio::test]
    async fn dd_failure_is_fatal() {
        let runner = FakeRunner::new().respond(
            "dd",
            ProcessResult {
                exit_code: Some(1),
                stderr: "dd: failed to open '/dev/sdb': Permission denied\n".to_string(),
                ..ProcessResult::default()
            },
        );

        let err = wipe("/dev/sdb", &runner).await.unwrap_err();
        assert_eq!(err.exit_code(), 1);
        assert!(matches!(err, PrepareError::ToolExit { .. }));
    }
}
