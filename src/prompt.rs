/// Built-in instruction header rendered ahead of every question.
pub const DEFAULT_INSTRUCTIONS: &str = "As an intelligent AI assistant, give the precise answer \
     to the following question. If you don't know the answer, just say that you don't know, \
     don't try to make up an answer.";

/// Renders the fixed single-question template sent to the generation backend.
///
/// The question is embedded verbatim into one placeholder slot. Prior turns
/// are tracked in [`MemoryWindow`](crate::MemoryWindow) but are deliberately
/// not interpolated into the rendered text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptAssembler {
    instructions: String,
}

impl Default for PromptAssembler {
    fn default() -> Self {
        Self::new()
    }
}

impl PromptAssembler {
    #[must_use]
    pub fn new() -> Self {
        Self::with_instructions(None)
    }

    /// Uses `instructions` as the header when non-blank, the built-in text
    /// otherwise.
    #[must_use]
    pub fn with_instructions(instructions: Option<String>) -> Self {
        Self {
            instructions: sanitize_instructions(instructions),
        }
    }

    #[must_use]
    pub fn instructions(&self) -> &str {
        &self.instructions
    }

    /// Deterministically renders the template for `question`.
    ///
    /// Never fails, for any input including the empty string.
    #[must_use]
    pub fn assemble(&self, question: &str) -> String {
        format!(
            "{}\n\nQuestion: ```{question}```\n\nAnswer:",
            self.instructions
        )
    }
}

fn sanitize_instructions(raw: Option<String>) -> String {
    let Some(value) = raw else {
        return DEFAULT_INSTRUCTIONS.to_string();
    };

    let trimmed = value.trim();
    if trimmed.is_empty() {
        DEFAULT_INSTRUCTIONS.to_string()
    } else {
        trimmed.to_string()
    }
}
