//! Staged pipeline execution.
//!
//! A [`Workflow`] declares its labels, steps and a total transition
//! function. The [`Orchestrator`] runs the steps one at a time on a tokio
//! task, stamps labels, folds every failure into the error stage and
//! streams a [`ProgressEvent`](crate::core::ProgressEvent) after each stage
//! through a [`ProgressStream`].

mod orchestrator;
mod stream;
mod workflow;

pub use orchestrator::{Orchestrator, DEFAULT_MAX_TRANSITIONS};
pub use stream::{ProgressStream, STREAM_DROPPED};
pub use workflow::{
    description_of, progress_of, StageInfo, StageLabel, Transition, Workflow, WorkflowStep,
    ERROR_PROGRESS, UNKNOWN_STAGE_DESCRIPTION,
};
