use std::fs;
use std::io::ErrorKind;

use crate::config::LocaleConfig;
use crate::error::PrepareError;
use crate::process::{CommandRunner, Invocation};
use crate::prompt::Prompter;
use crate::ui::prelude::*;

use super::write_file;

/// UTF-8 locales listed in a locale.gen file, enabled or not.
pub fn parse_locale_gen(contents: &str) -> Vec<String> {
    let mut locales: Vec<String> = contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('%'))
        .filter_map(|line| line.trim_start_matches('#').split_whitespace().next())
        .filter(|locale| locale.ends_with(".UTF-8"))
        .map(str::to_string)
        .collect();

    locales.sort();
    locales.dedup();
    locales
}

fn entry_name(line: &str) -> Option<&str> {
    line.trim().trim_start_matches('#').split_whitespace().next()
}

/// Returns locale.gen contents with `locale` enabled: an existing
/// commented entry is uncommented, otherwise a new entry is appended.
pub fn enable_locale(contents: &str, locale: &str) -> String {
    let mut commented = None;

    for (index, line) in contents.lines().enumerate() {
        if entry_name(line) != Some(locale) {
            continue;
        }
        match line.trim_start().strip_prefix('#') {
            None => return contents.to_string(),
            // `#  en_US.UTF-8 UTF-8` in the header is an example, not an entry.
            Some(rest) if rest.starts_with(locale) && commented.is_none() => {
                commented = Some(index)
            }
            Some(_) => {}
        }
    }

    match commented {
        Some(target) => {
            let mut enabled: String = contents
                .lines()
                .enumerate()
                .map(|(index, line)| {
                    if index == target {
                        format!("{}\n", line.trim().trim_start_matches('#'))
                    } else {
                        format!("{line}\n")
                    }
                })
                .collect();
            if !contents.ends_with('\n') {
                enabled.pop();
            }
            enabled
        }
        None => {
            let charset = locale.rsplit_once('.').map_or("UTF-8", |(_, c)| c);
            let separator = if contents.is_empty() || contents.ends_with('\n') {
                ""
            } else {
                "\n"
            };
            format!("{contents}{separator}{locale} {charset}\n")
        }
    }
}

/// Lets the operator pick a locale, generates it and makes it the default.
pub async fn setup_locale(
    runner: &dyn CommandRunner,
    prompter: &dyn Prompter,
    config: &LocaleConfig,
    dry_run: bool,
) -> Result<String, PrepareError> {
    let contents = match fs::read_to_string(&config.locale_gen) {
        Ok(contents) => contents,
        Err(err) if err.kind() == ErrorKind::NotFound => String::new(),
        Err(err) => return Err(err.into()),
    };

    let mut locales = parse_locale_gen(&contents);
    if !locales.contains(&config.default_locale) {
        locales.push(config.default_locale.clone());
        locales.sort();
    }
    let default = locales
        .iter()
        .position(|locale| *locale == config.default_locale)
        .unwrap_or(0);

    let index = prompter.select("Choose a locale:", &locales, default)?;
    let locale = locales
        .get(index)
        .cloned()
        .unwrap_or_else(|| config.default_locale.clone());

    emit(
        Level::Info,
        "locale.enable",
        &format!(
            "{} Enabling {} in {}",
            NerdFont::Globe,
            locale,
            config.locale_gen.display()
        ),
        None,
    );
    write_file(&config.locale_gen, &enable_locale(&contents, &locale), dry_run)?;

    runner
        .run_checked(&Invocation::new("locale-gen").forward_output())
        .await?;

    write_file(&config.locale_conf, &format!("LANG={locale}\n"), dry_run)?;

    emit(
        Level::Success,
        "locale.configured",
        &format!(
            "{} LANG={} set in {}",
            NerdFont::Check,
            locale,
            config.locale_conf.display()
        ),
        None,
    );
    Ok(locale)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Answer, FakeRunner, ScriptedPrompter, failure};

    const LOCALE_GEN: &str = "\
# Configuration file for locale-gen
#
#  en_US.UTF-8 UTF-8
#
#de_DE.UTF-8 UTF-8
#de_DE ISO-8859-1
#en_US.UTF-8 UTF-8
en_GB.UTF-8 UTF-8
%include
";

    #[test]
    fn lists_utf8_locales_once() {
        assert_eq!(
            parse_locale_gen(LOCALE_GEN),
            vec!["de_DE.UTF-8", "en_GB.UTF-8", "en_US.UTF-8"]
        );
    }

    #[test]
    fn uncomments_first_matching_entry() {
        let enabled = enable_locale(LOCALE_GEN, "de_DE.UTF-8");
        assert!(enabled.contains("\nde_DE.UTF-8 UTF-8\n"));
        assert!(enabled.contains("#de_DE ISO-8859-1"));
        assert_eq!(enabled.lines().count(), LOCALE_GEN.lines().count());
    }

    #[test]
    fn header_examples_stay_commented() {
        let enabled = enable_locale(LOCALE_GEN, "en_US.UTF-8");
        assert!(enabled.contains("#  en_US.UTF-8 UTF-8\n"));
        assert!(enabled.contains("\nen_US.UTF-8 UTF-8\nen_GB.UTF-8 UTF-8\n"));
    }

    #[test]
    fn enabled_locale_is_left_alone() {
        assert_eq!(enable_locale(LOCALE_GEN, "en_GB.UTF-8"), LOCALE_GEN);
    }

    #[test]
    fn unknown_locale_is_appended() {
        assert_eq!(enable_locale("", "fr_FR.UTF-8"), "fr_FR.UTF-8 UTF-8\n");
        assert_eq!(
            enable_locale("en_GB.UTF-8 UTF-8", "fr_FR.UTF-8"),
            "en_GB.UTF-8 UTF-8\nfr_FR.UTF-8 UTF-8\n"
        );
    }

    fn config(dir: &tempfile::TempDir) -> LocaleConfig {
        LocaleConfig {
            locale_gen: dir.path().join("locale.gen"),
            locale_conf: dir.path().join("locale.conf"),
            default_locale: "en_US.UTF-8".to_string(),
        }
    }

    #[tokio::test]
    async fn selected_locale_is_generated_and_set() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(&dir);
        fs::write(&config.locale_gen, LOCALE_GEN).unwrap();

        let runner = FakeRunner::new();
        let prompter = ScriptedPrompter::new([Answer::Select(0)]);

        let locale = setup_locale(&runner, &prompter, &config, false)
            .await
            .unwrap();

        assert_eq!(locale, "de_DE.UTF-8");
        assert_eq!(runner.programs(), vec!["locale-gen"]);
        assert!(
            fs::read_to_string(&config.locale_gen)
                .unwrap()
                .contains("\nde_DE.UTF-8 UTF-8\n")
        );
        assert_eq!(
            fs::read_to_string(&config.locale_conf).unwrap(),
            "LANG=de_DE.UTF-8\n"
        );
    }

    #[tokio::test]
    async fn missing_locale_gen_offers_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(&dir);

        let runner = FakeRunner::new();
        let prompter = ScriptedPrompter::new([Answer::Select(0)]);

        let locale = setup_locale(&runner, &prompter, &config, false)
            .await
            .unwrap();

        assert_eq!(locale, "en_US.UTF-8");
        assert_eq!(
            fs::read_to_string(&config.locale_gen).unwrap(),
            "en_US.UTF-8 UTF-8\n"
        );
    }

    #[tokio::test]
    async fn locale_gen_failure_skips_locale_conf() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(&dir);
        let runner = FakeRunner::new().respond("locale-gen", failure(1, "locale-gen: error"));
        let prompter = ScriptedPrompter::new([Answer::Select(0)]);

        let err = setup_locale(&runner, &prompter, &config, false)
            .await
            .unwrap_err();

        assert!(matches!(err, PrepareError::ToolExit { .. }));
        assert!(!config.locale_conf.exists());
    }
}
