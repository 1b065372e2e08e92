//! Drive discovery from `fdisk --list` output.

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;

use crate::error::PrepareError;
use crate::process::{CommandRunner, Invocation};

use super::units;

/// A whole block device that can receive the installation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Drive {
    pub name: String,
    pub size_bytes: u64,
}

impl Drive {
    /// Menu label, e.g. `/dev/sda 500.11GB`.
    pub fn label(&self) -> String {
        format!("{} {}", self.name, units::format_gb(self.size_bytes))
    }
}

lazy_static! {
    // Example: Disk /dev/nvme0n1: 476.94 GiB, 512110190592 bytes, 1000215216 sectors
    static ref DISK_HEADER: Regex =
        Regex::new(r"^Disk ([^:]+): [\d.]+ \w+, (\d+) bytes, ").expect("valid disk header regex");
    static ref BLOCK_SEPARATOR: Regex = Regex::new(r"\n{2,}").expect("valid separator regex");
}

/// Parses one report block. Only the first line is inspected.
fn parse_block(block: &str) -> Option<Drive> {
    let header = block.lines().next()?;
    let captures = DISK_HEADER.captures(header)?;
    let size_bytes: u64 = captures[2].parse().ok()?;

    if size_bytes == 0 {
        return None;
    }

    Some(Drive {
        name: captures[1].to_string(),
        size_bytes,
    })
}

/// Extracts drives from a disk listing report, in source order.
pub fn parse_drive_listing(report: &str) -> Vec<Drive> {
    BLOCK_SEPARATOR
        .split(report)
        .map(|block| block.trim_start_matches('\n'))
        .filter(|block| block.starts_with("Disk "))
        .filter_map(parse_block)
        .collect()
}

/// Runs the disk listing utility and parses its report.
pub async fn list_drives(runner: &dyn CommandRunner) -> Result<Vec<Drive>, PrepareError> {
    let invocation = Invocation::new("fdisk").arg("--list").read_only();
    let result = runner.run_checked(&invocation).await?;
    Ok(parse_drive_listing(&result.stdout))
}

/// Drops pseudo devices the operator should never install onto.
pub fn filter_candidates(drives: Vec<Drive>, exclude_prefixes: &[String]) -> Vec<Drive> {
    drives
        .into_iter()
        .filter(|drive| {
            !exclude_prefixes
                .iter()
                .any(|prefix| drive.name.starts_with(prefix.as_str()))
        })
        .collect()
}
