//! Disk preparation: discover drives, lay out a DOS table with a root and
//! a swap partition, then format and mount the root.

pub mod backend;
pub mod catalog;
pub mod format;
pub mod mount;
pub mod plan;
pub mod prepare;
pub mod script;
pub mod units;
pub mod wipe;

use crate::config::WizardConfig;

/// Programs the disk flow spawns with the given configuration.
pub fn required_tools(config: &WizardConfig) -> Vec<&'static str> {
    let mut tools = vec!["fdisk", "dd", "mkfs", "mount"];

    if config.disk.backend == backend::BackendKind::Sfdisk {
        tools.push("sfdisk");
    }
    if config.swap.format {
        tools.push("mkswap");
        if config.swap.activate {
            tools.push("swapon");
        }
    }

    tools
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn swap_tools_depend_on_configuration() {
        let mut config = WizardConfig::default();
        assert_eq!(
            required_tools(&config),
            vec!["fdisk", "dd", "mkfs", "mount", "mkswap", "swapon"]
        );

        config.swap.format = false;
        config.disk.backend = backend::BackendKind::Sfdisk;
        assert_eq!(
            required_tools(&config),
            vec!["fdisk", "dd", "mkfs", "mount", "sfdisk"]
        );
    }
}
