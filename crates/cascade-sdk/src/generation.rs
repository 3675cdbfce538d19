use std::path::PathBuf;

use cascade_store::{LogEntry, TokenUsage};

/// One generated artifact, ready to be recorded.
#[derive(Clone, Debug)]
pub struct GenerationRecord {
    /// Spec the artifact was generated from, relative to the workspace root.
    pub spec_path: PathBuf,
    /// Generated bytes.
    pub output: Vec<u8>,
    /// Where to write the artifact. Defaults to the spec's own output path.
    pub output_path: Option<PathBuf>,
    pub message: String,
    pub model: String,
    pub tokens: TokenUsage,
}

impl GenerationRecord {
    pub fn new(spec_path: impl Into<PathBuf>, output: impl Into<Vec<u8>>) -> Self {
        Self {
            spec_path: spec_path.into(),
            output: output.into(),
            output_path: None,
            message: String::new(),
            model: String::new(),
            tokens: TokenUsage::default(),
        }
    }

    pub fn with_output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = Some(path.into());
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_tokens(mut self, input: u64, output: u64) -> Self {
        self.tokens = TokenUsage::new(input, output);
        self
    }

    pub fn effective_message(&self) -> String {
        if self.message.is_empty() {
            format!("generate {}", self.spec_path.display())
        } else {
            self.message.clone()
        }
    }
}

/// What `record_generation` wrote.
#[derive(Clone, Debug, PartialEq)]
pub struct GenerationResult {
    /// Position of the entry in the provenance log.
    pub position: u64,
    pub entry: LogEntry,
}
