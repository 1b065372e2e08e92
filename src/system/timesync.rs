use crate::error::PrepareError;
use crate::process::{CommandRunner, Invocation};
use crate::ui::prelude::*;

/// Turns on NTP so the installed system starts with a correct clock.
pub async fn enable_time_sync(runner: &dyn CommandRunner) -> Result<(), PrepareError> {
    runner
        .run_checked(&Invocation::new("timedatectl").args(["set-ntp", "true"]))
        .await?;

    emit(
        Level::Success,
        "timesync.enabled",
        &format!("{} Network time synchronization enabled", NerdFont::Clock),
        None,
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeRunner, failure};

    #[tokio::test]
    async fn enables_ntp() {
        let runner = FakeRunner::new();
        enable_time_sync(&runner).await.unwrap();

        let calls = runner.calls();
        assert_eq!(calls[0].program, "timedatectl");
        assert_eq!(calls[0].args, vec!["set-ntp", "true"]);
    }

    #[tokio::test]
    async fn reports_timedatectl_failure() {
        let runner =
            FakeRunner::new().respond("timedatectl", failure(1, "Failed to connect to bus"));
        let err = enable_time_sync(&runner).await.unwrap_err();
        assert!(err.to_string().contains("Failed to connect to bus"));
    }
}
