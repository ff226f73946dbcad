//! The text-generation capability.

use async_trait::async_trait;

use crate::errors::LlmError;

/// Something that turns a prompt into text.
///
/// Sampling settings (model, temperature) belong to the implementation, so
/// each workflow holds a provider configured for it.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Generates a completion for `prompt`.
    async fn generate(&self, prompt: &str) -> Result<String, LlmError>;
}
