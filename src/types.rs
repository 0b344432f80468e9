use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Prefix marking a failed item in artifact text.
pub const FAILURE_PREFIX: &str = "Error:";

/// One weighted prompt variant. Configs are identified by position, so two
/// entries with the same text are still distinct.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptConfig {
    pub prompt: String,
    pub weight: f64,
}

impl PromptConfig {
    /// `prompt` must hold some text; a batch with a blank prompt is refused
    /// before any call is made.
    pub fn new(prompt: impl Into<String>, weight: f64) -> Self {
        Self {
            prompt: prompt.into(),
            weight,
        }
    }

    /// Single-prompt batches are a mix with one entry of weight 1.
    pub fn single(prompt: impl Into<String>) -> Self {
        Self::new(prompt, 1.0)
    }

    pub fn is_eligible(&self) -> bool {
        self.weight.is_finite() && self.weight > 0.0
    }
}

/// One image to caption, with the name it was uploaded under.
#[derive(Debug, Clone)]
pub struct WorkItem {
    pub label: String,
    pub payload: Vec<u8>,
}

impl WorkItem {
    pub fn new(label: impl Into<String>, payload: Vec<u8>) -> Self {
        Self {
            label: label.into(),
            payload,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "text", rename_all = "snake_case")]
pub enum ArtifactContent {
    Caption(String),
    Failed(String),
}

impl ArtifactContent {
    pub fn is_success(&self) -> bool {
        matches!(self, ArtifactContent::Caption(_))
    }

    /// Text written to the item's `.txt` file.
    pub fn render(&self) -> String {
        match self {
            ArtifactContent::Caption(text) => text.clone(),
            ArtifactContent::Failed(message) => format!("{} {}", FAILURE_PREFIX, message),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    pub label: String,
    pub prompt_index: usize,
    pub content: ArtifactContent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchResult {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Items assigned to each config index, regardless of outcome.
    pub usage_counts: BTreeMap<usize, usize>,
    /// One entry per input item, in input order.
    pub artifacts: Vec<Artifact>,
}

impl BatchResult {
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.succeeded as f64 / self.total as f64
    }
}
