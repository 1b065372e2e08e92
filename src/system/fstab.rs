use std::path::Path;

use crate::error::PrepareError;
use crate::process::{CommandRunner, Invocation};
use crate::ui::prelude::*;

use super::append_file;

/// Appends `genfstab -U <target>` output to the fstab under `target`.
/// Returns the generated entries.
pub async fn generate_fstab(
    runner: &dyn CommandRunner,
    target: &Path,
    fstab: &Path,
    dry_run: bool,
) -> Result<String, PrepareError> {
    // genfstab only inspects mounts, so it also runs in dry-run mode.
    let invocation = Invocation::new("genfstab")
        .arg("-U")
        .arg(target.to_string_lossy())
        .read_only();
    let result = runner.run_checked(&invocation).await?;

    let fstab_path = target.join(fstab);
    append_file(&fstab_path, &result.stdout, dry_run)?;

    emit(
        Level::Success,
        "fstab.generated",
        &format!("{} Wrote {}", NerdFont::FileText, fstab_path.display()),
        None,
    );
    Ok(result.stdout)
}
