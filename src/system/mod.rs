//! Host setup around the disk flow: locale, clock and fstab.

pub mod fstab;
pub mod locale;
pub mod timesync;

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

use crate::error::PrepareError;

/// Replaces `path` with `contents`, or only announces it in dry-run mode.
pub(crate) fn write_file(path: &Path, contents: &str, dry_run: bool) -> Result<(), PrepareError> {
    if dry_run {
        println!("[DRY RUN] Writing {} bytes to {}", contents.len(), path.display());
        return Ok(());
    }
    fs::write(path, contents)?;
    Ok(())
}

pub(crate) fn append_file(path: &Path, contents: &str, dry_run: bool) -> Result<(), PrepareError> {
    if dry_run {
        println!("[DRY RUN] Appending {} bytes to {}", contents.len(), path.display());
        return Ok(());
    }
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(contents.as_bytes())?;
    Ok(())
}
