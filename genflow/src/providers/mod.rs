//! External capabilities the workflows depend on.
//!
//! Workflows only see the [`LlmProvider`] and [`Renderer`] traits; the
//! concrete Gemini client and Manim renderer are wired in by the caller.

#[cfg(feature = "gemini")]
mod gemini;
mod llm;
mod renderer;

#[cfg(feature = "gemini")]
pub use gemini::{GeminiProvider, API_KEY_VAR};
pub use llm::LlmProvider;
pub use renderer::{
    find_video, scene_name, ManimRenderer, RenderedArtifact, Renderer, DEFAULT_RENDER_TIMEOUT,
    MEDIA_URL_PREFIX,
};

#[cfg(test)]
pub use llm::MockLlmProvider;
#[cfg(test)]
pub use renderer::MockRenderer;
