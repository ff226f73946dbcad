//! Core domain model types for genflow.
//!
//! This module contains the fundamental types threaded through every run:
//! - The accumulating pipeline state
//! - Progress events and their status

mod event;
mod state;
mod status;

pub use event::ProgressEvent;
pub use state::{PipelineState, ERROR_STAGE, STARTING_STAGE};
pub use status::ProgressStatus;
