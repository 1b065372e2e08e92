//! Wizard configuration loaded from TOML.
//!
//! Every section and field has a default, so an empty file (or no file at
//! all) yields the standard single-disk layout.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::disk::backend::BackendKind;
use crate::disk::plan::Geometry;
use crate::error::PrepareError;

pub const DEFAULT_CONFIG_FILE: &str = "/etc/prepwizard/config.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WizardConfig {
    pub disk: DiskConfig,
    pub swap: SwapConfig,
    pub locale: LocaleConfig,
    pub fstab: FstabConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiskConfig {
    /// Smallest drive accepted for installation, in bytes.
    pub min_drive_bytes: u64,
    pub sector_size: u64,
    /// Default first sector the partitioning tool proposes for a new partition.
    pub first_sector: u64,
    pub filesystem: String,
    pub force_format: bool,
    pub mount_target: PathBuf,
    pub backend: BackendKind,
    /// Device path prefixes that are never offered for installation.
    pub exclude_prefixes: Vec<String>,
}

impl Default for DiskConfig {
    fn default() -> Self {
        Self {
            min_drive_bytes: 5 * crate::disk::units::BYTES_PER_GB,
            sector_size: 512,
            first_sector: 2048,
            filesystem: "ext4".to_string(),
            force_format: true,
            mount_target: PathBuf::from("/mnt"),
            backend: BackendKind::Fdisk,
            exclude_prefixes: vec![
                "/dev/loop".to_string(),
                "/dev/ram".to_string(),
                "/dev/zram".to_string(),
            ],
        }
    }
}

impl DiskConfig {
    pub fn geometry(&self) -> Geometry {
        Geometry {
            sector_size: self.sector_size,
            first_sector: self.first_sector,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SwapConfig {
    /// Proposed swap size in (decimal) megabytes.
    pub default_mb: u64,
    pub format: bool,
    pub activate: bool,
}

impl Default for SwapConfig {
    fn default() -> Self {
        Self {
            default_mb: 4000,
            format: true,
            activate: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocaleConfig {
    pub locale_gen: PathBuf,
    pub locale_conf: PathBuf,
    pub default_locale: String,
}

impl Default for LocaleConfig {
    fn default() -> Self {
        Self {
            locale_gen: PathBuf::from("/etc/locale.gen"),
            locale_conf: PathBuf::from("/etc/locale.conf"),
            default_locale: "en_US.UTF-8".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FstabConfig {
    /// fstab path relative to the mount target.
    pub path: PathBuf,
}

impl Default for FstabConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("etc/fstab"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub command_log: PathBuf,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            command_log: PathBuf::from("/var/log/prepwizard/commands.jsonl"),
        }
    }
}

impl WizardConfig {
    pub fn from_toml(contents: &str) -> Result<Self, PrepareError> {
        Ok(toml::from_str(contents)?)
    }

    pub fn load_from(path: &Path) -> Result<Self, PrepareError> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Loads the explicit path, or the system-wide file when present, or defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, PrepareError> {
        match path {
            Some(path) => Self::load_from(path),
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::load_from(Path::new(DEFAULT_CONFIG_FILE))
            }
            None => Ok(Self::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let config = WizardConfig::from_toml("").unwrap();
        assert_eq!(config, WizardConfig::default());
        assert_eq!(config.disk.min_drive_bytes, 5_000_000_000);
        assert_eq!(config.swap.default_mb, 4000);
        assert_eq!(config.disk.backend, BackendKind::Fdisk);
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() {
        let config = WizardConfig::from_toml(
            r#"
[disk]
filesystem = "xfs"
backend = "sfdisk"

[swap]
activate = false
"#,
        )
        .unwrap();

        assert_eq!(config.disk.filesystem, "xfs");
        assert_eq!(config.disk.backend, BackendKind::Sfdisk);
        assert_eq!(config.disk.sector_size, 512);
        assert!(!config.swap.activate);
        assert!(config.swap.format);
        assert_eq!(config.locale, LocaleConfig::default());
    }

    #[test]
    fn malformed_file_is_a_config_error() {
        let err = WizardConfig::from_toml("[disk]\nsector_size = \"big\"").unwrap_err();
        assert!(matches!(err, PrepareError::Config(_)));
    }

    #[test]
    fn load_reads_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[disk]\nmount_target = \"/target\"\n").unwrap();

        let config = WizardConfig::load(Some(&path)).unwrap();
        assert_eq!(config.disk.mount_target, PathBuf::from("/target"));
    }
}
