use crate::error::PrepareError;
use crate::process::{CommandRunner, Invocation};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatOptions {
    pub fs_type: String,
    /// Proceed even when mkfs finds an existing filesystem signature.
    pub force: bool,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            fs_type: "ext4".to_string(),
            force: false,
        }
    }
}

pub async fn format(
    partition: &str,
    options: &FormatOptions,
    runner: &dyn CommandRunner,
) -> Result<(), PrepareError> {
    let mut invocation = Invocation::new("mkfs").args(["-t", options.fs_type.as_str()]);
    if options.force {
        invocation = invocation.arg("-F");
    }
    invocation = invocation.arg(partition).forward_output();

    runner.run_checked(&invocation).await?;
    Ok(())
}

pub async fn make_swap(partition: &str, runner: &dyn CommandRunner) -> Result<(), PrepareError> {
    runner
        .run_checked(&Invocation::new("mkswap").arg(partition).forward_output())
        .await?;
    Ok(())
}
