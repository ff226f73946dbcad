//! Test doubles for the external capabilities.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;

use crate::errors::{LlmError, RenderError};
use crate::providers::{LlmProvider, RenderedArtifact, Renderer};

/// An LLM that replays a fixed script of responses in order.
///
/// Every prompt it receives is recorded. Once the script runs out, calls
/// fail with [`LlmError::Exhausted`].
#[derive(Debug, Default)]
pub struct ScriptedLlm {
    script: Mutex<VecDeque<Result<String, LlmError>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedLlm {
    /// Creates an LLM that answers with `responses`, one per call.
    #[must_use]
    pub fn new<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            script: Mutex::new(responses.into_iter().map(|r| Ok(r.into())).collect()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Appends a successful response to the script.
    #[must_use]
    pub fn then(self, response: impl Into<String>) -> Self {
        self.script.lock().push_back(Ok(response.into()));
        self
    }

    /// Appends a failure to the script.
    #[must_use]
    pub fn then_fail(self, error: LlmError) -> Self {
        self.script.lock().push_back(Err(error));
        self
    }

    /// Number of calls received so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.prompts.lock().len()
    }

    /// Every prompt received, in order.
    #[must_use]
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }

    /// Responses not yet consumed.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.script.lock().len()
    }
}

#[async_trait]
impl LlmProvider for ScriptedLlm {
    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        let call = {
            let mut prompts = self.prompts.lock();
            prompts.push(prompt.to_string());
            prompts.len()
        };
        self.script
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::Exhausted(format!("no response scripted for call {call}"))))
    }
}

/// An LLM whose every call fails with a transport error.
#[derive(Debug, Clone)]
pub struct FailingLlm {
    message: String,
}

impl FailingLlm {
    /// Creates a failing LLM with the given transport message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[async_trait]
impl LlmProvider for FailingLlm {
    async fn generate(&self, _prompt: &str) -> Result<String, LlmError> {
        Err(LlmError::Transport(self.message.clone()))
    }
}

/// A renderer that never touches the filesystem.
///
/// Succeeds with `/media/videos/<id>.mp4` unless built with
/// [`StaticRenderer::failing`].
#[derive(Debug, Default)]
pub struct StaticRenderer {
    failure: Option<String>,
    sources: Mutex<Vec<String>>,
}

impl StaticRenderer {
    /// A renderer that always succeeds.
    #[must_use]
    pub fn ok() -> Self {
        Self::default()
    }

    /// A renderer that always fails with `stderr`.
    #[must_use]
    pub fn failing(stderr: impl Into<String>) -> Self {
        Self {
            failure: Some(stderr.into()),
            sources: Mutex::new(Vec::new()),
        }
    }

    /// Every source handed to the renderer.
    #[must_use]
    pub fn sources(&self) -> Vec<String> {
        self.sources.lock().clone()
    }
}

#[async_trait]
impl Renderer for StaticRenderer {
    async fn render(&self, source: &str, artifact_id: &str) -> Result<RenderedArtifact, RenderError> {
        self.sources.lock().push(source.to_string());
        match &self.failure {
            Some(stderr) => Err(RenderError::Failed {
                code: Some(1),
                stderr: stderr.clone(),
            }),
            None => Ok(RenderedArtifact {
                artifact_id: artifact_id.to_string(),
                location: format!("/media/videos/{artifact_id}.mp4"),
            }),
        }
    }
}
