use chattax_core::error::AppError;

/// Finite, non-restartable sequence of generated text fragments. Dropping it
/// cancels generation at the next fragment boundary.
pub type FragmentStream = Box<dyn Iterator<Item = Result<String, AppError>> + Send>;

/// Streaming generation boundary.
pub trait TextGenerator: Send + Sync {
    fn stream(&self, model: &str, prompt: &str) -> Result<FragmentStream, AppError>;
}

pub mod ollama_llm;

pub use ollama_llm::OllamaGenerator;
