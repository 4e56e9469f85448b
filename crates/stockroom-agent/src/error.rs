use stockroom_images::ImageError;
use stockroom_llm::LlmError;
use thiserror::Error;

/// Errors that end a chat turn
///
/// Tool failures are not here: they are reported back to the model as
/// tool results.
#[derive(Debug, Error)]
pub enum AgentError {
    /// The chat model failed
    #[error(transparent)]
    Llm(#[from] LlmError),

    /// The image client could not be built
    #[error(transparent)]
    Images(#[from] ImageError),
}

impl AgentError {
    /// Message safe to show an end user
    pub fn client_message(&self) -> String {
        match self {
            Self::Llm(e) => e.client_message(),
            Self::Images(e) => e.to_string(),
        }
    }
}
