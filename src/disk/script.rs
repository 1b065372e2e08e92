/// One logical answer group fed to an interactive tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptStep {
    pub description: String,
    pub inputs: Vec<String>,
}

/// Ordered answers for a partitioning session. An empty input accepts the
/// tool's default for that prompt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandScript {
    steps: Vec<ScriptStep>,
}

impl CommandScript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn step<I, S>(mut self, description: impl Into<String>, inputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.steps.push(ScriptStep {
            description: description.into(),
            inputs: inputs.into_iter().map(Into::into).collect(),
        });
        self
    }

    pub fn steps(&self) -> &[ScriptStep] {
        &self.steps
    }

    pub fn tokens(&self) -> Vec<&str> {
        self.steps
            .iter()
            .flat_map(|step| step.inputs.iter().map(String::as_str))
            .collect()
    }

    /// Newline-terminated stdin feed.
    pub fn render(&self) -> String {
        self.tokens()
            .into_iter()
            .map(|token| format!("{token}\n"))
            .collect()
    }
}
