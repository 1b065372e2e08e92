//! Scripted stand-ins for the process runner and the operator.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use crate::error::PrepareError;
use crate::process::{CommandRunner, Invocation, ProcessResult};
use crate::prompt::Prompter;

/// Records every invocation and answers from per-program queues.
/// Programs without a queued response succeed with empty output.
#[derive(Default)]
pub struct FakeRunner {
    responses: Mutex<HashMap<String, VecDeque<ProcessResult>>>,
    calls: Mutex<Vec<Invocation>>,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(self, program: &str, result: ProcessResult) -> Self {
        self.responses
            .lock()
            .unwrap()
            .entry(program.to_string())
            .or_default()
            .push_back(result);
        self
    }

    pub fn calls(&self) -> Vec<Invocation> {
        self.calls.lock().unwrap().clone()
    }

    pub fn programs(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .map(|call| call.program)
            .collect()
    }
}

#[async_trait::async_trait]
impl CommandRunner for FakeRunner {
    async fn run(&self, invocation: &Invocation) -> Result<ProcessResult, PrepareError> {
        self.calls.lock().unwrap().push(invocation.clone());

        let queued = self
            .responses
            .lock()
            .unwrap()
            .get_mut(&invocation.program)
            .and_then(VecDeque::pop_front);

        Ok(queued.unwrap_or_else(ProcessResult::success))
    }
}

pub fn stdout(text: &str) -> ProcessResult {
    ProcessResult {
        exit_code: Some(0),
        stdout: text.to_string(),
        ..ProcessResult::default()
    }
}

pub fn failure(code: i32, stderr: &str) -> ProcessResult {
    ProcessResult {
        exit_code: Some(code),
        stderr: stderr.to_string(),
        ..ProcessResult::default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answer {
    Select(usize),
    Confirm(bool),
    Number(u64),
}

/// Replays answers in order and records each prompt it was shown.
#[derive(Default)]
pub struct ScriptedPrompter {
    answers: Mutex<VecDeque<Answer>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedPrompter {
    pub fn new(answers: impl IntoIterator<Item = Answer>) -> Self {
        Self {
            answers: Mutex::new(answers.into_iter().collect()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn remaining(&self) -> usize {
        self.answers.lock().unwrap().len()
    }

    fn next(&self, prompt: &str) -> Answer {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.answers
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| panic!("no scripted answer for prompt: {prompt}"))
    }
}

impl Prompter for ScriptedPrompter {
    fn select(
        &self,
        prompt: &str,
        items: &[String],
        _default: usize,
    ) -> Result<usize, PrepareError> {
        match self.next(prompt) {
            Answer::Select(index) => {
                assert!(index < items.len(), "selection {index} out of range");
                Ok(index)
            }
            other => panic!("expected a selection for {prompt}, scripted {other:?}"),
        }
    }

    fn confirm(&self, prompt: &str, _default: bool) -> Result<bool, PrepareError> {
        match self.next(prompt) {
            Answer::Confirm(answer) => Ok(answer),
            other => panic!("expected a confirmation for {prompt}, scripted {other:?}"),
        }
    }

    fn input_u64(&self, prompt: &str, _default: u64) -> Result<u64, PrepareError> {
        match self.next(prompt) {
            Answer::Number(value) => Ok(value),
            other => panic!("expected a number for {prompt}, scripted {other:?}"),
        }
    }
}
