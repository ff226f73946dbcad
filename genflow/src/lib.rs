//! # Genflow
//!
//! Staged LLM generation pipelines with structured-output recovery.
//!
//! Genflow runs short, fixed sequences of LLM-backed stages and streams a
//! progress event after each one:
//!
//! - **Workflows**: animation, system design and career roadmap pipelines
//! - **Orchestration**: label-driven sequencing with failures folded into an
//!   error stage and cancellation when the consumer goes away
//! - **Extraction**: fenced code, JSON objects and a rescue chain for
//!   malformed JSON
//! - **Layout**: tree placement and edge synthesis for roadmap graphs
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use genflow::prelude::*;
//! use std::sync::Arc;
//!
//! let config = GenflowConfig::from_env()?;
//! let llm = Arc::new(config.llm(RoadmapWorkflow::TEMPERATURE)?);
//! let orchestrator = Orchestrator::new(RoadmapWorkflow::new(llm));
//!
//! let mut stream = orchestrator.run("data engineer")?;
//! while let Some(event) = stream.next().await {
//!     println!("{} {}%", event.stage, event.progress);
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod cancellation;
pub mod config;
pub mod core;
pub mod errors;
pub mod events;
pub mod extract;
pub mod features;
pub mod layout;
pub mod observability;
pub mod pipeline;
pub mod providers;
pub mod testing;
pub mod utils;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::cancellation::CancellationToken;
    pub use crate::config::GenflowConfig;
    pub use crate::core::{PipelineState, ProgressEvent, ProgressStatus};
    pub use crate::errors::{
        ConfigError, GenflowError, InputRejected, LlmError, RenderError, StageError,
    };
    pub use crate::events::{EventSink, LoggingEventSink, NoOpEventSink};
    pub use crate::extract::{extract_code_block, extract_explanation, extract_json};
    pub use crate::features::{
        AnimationResult, AnimationWorkflow, DesignResult, DesignWorkflow, RoadmapResult,
        RoadmapWorkflow,
    };
    pub use crate::layout::{layout, RoadmapGraph};
    pub use crate::observability::{init_tracing, LogFormat};
    pub use crate::pipeline::{Orchestrator, ProgressStream, StageInfo, Workflow};
    #[cfg(feature = "gemini")]
    pub use crate::providers::GeminiProvider;
    pub use crate::providers::{LlmProvider, ManimRenderer, Renderer};
    pub use crate::utils::{generate_uuid, iso_timestamp, short_id, Timestamp};
    pub use futures::StreamExt;
}
