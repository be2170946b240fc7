use crate::error::StepError;

/// Text-in, text-out language model.
///
/// Implementations:
/// - `OllamaModel`: local or remote Ollama server
pub trait TextModel: Send + Sync {
    fn generate(&self, prompt: &str) -> Result<String, StepError>;

    /// Model identifier, for logging.
    fn model(&self) -> &str;
}
