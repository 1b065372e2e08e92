//! Operator prompts.
//!
//! The wizard only ever asks three kinds of question. Keeping them behind a
//! trait lets the disk flow run against scripted answers in tests.

use dialoguer::{Confirm, Input, Select};

use crate::error::PrepareError;

pub trait Prompter: Send + Sync {
    /// Index of the chosen item.
    fn select(&self, prompt: &str, items: &[String], default: usize)
    -> Result<usize, PrepareError>;

    fn confirm(&self, prompt: &str, default: bool) -> Result<bool, PrepareError>;

    fn input_u64(&self, prompt: &str, default: u64) -> Result<u64, PrepareError>;
}

/// Terminal prompts backed by dialoguer.
pub struct DialoguerPrompter;

impl Prompter for DialoguerPrompter {
    fn select(
        &self,
        prompt: &str,
        items: &[String],
        default: usize,
    ) -> Result<usize, PrepareError> {
        Ok(Select::new()
            .with_prompt(prompt)
            .items(items)
            .default(default)
            .interact()?)
    }

    fn confirm(&self, prompt: &str, default: bool) -> Result<bool, PrepareError> {
        Ok(Confirm::new()
            .with_prompt(prompt)
            .default(default)
            .interact()?)
    }

    fn input_u64(&self, prompt: &str, default: u64) -> Result<u64, PrepareError> {
        Ok(Input::<u64>::new()
            .with_prompt(prompt)
            .default(default)
            .interact_text()?)
    }
}
