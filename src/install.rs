//! The full interactive installation: locale, clock, then disk.

use anyhow::{Context, Result};

use crate::config::WizardConfig;
use crate::disk::prepare::{DiskPreparer, PrepareOptions, PreparedDisk};
use crate::process::CommandRunner;
use crate::prompt::Prompter;
use crate::system::{locale, timesync};
use crate::ui::prelude::*;

pub async fn run_install(
    runner: &dyn CommandRunner,
    prompter: &dyn Prompter,
    config: &WizardConfig,
    dry_run: bool,
) -> Result<PreparedDisk> {
    emit(
        Level::Info,
        "install.start",
        &format!("{} Starting installation", NerdFont::Info),
        None,
    );
    separator(false);

    locale::setup_locale(runner, prompter, &config.locale, dry_run)
        .await
        .context("Locale setup failed")?;

    timesync::enable_time_sync(runner)
        .await
        .context("Failed to enable time synchronization")?;

    let prepared = DiskPreparer::new(runner, prompter, PrepareOptions::from(config))
        .run()
        .await
        .context("Disk preparation failed")?;

    separator(false);
    emit(
        Level::Success,
        "install.disk_ready",
        &format!(
            "{} Target mounted at {}. Run `prepwizard fstab` once the base system is installed.",
            NerdFont::Check,
            prepared.mount_target.display()
        ),
        None,
    );
    Ok(prepared)
}
