//! Testing utilities for genflow workflows.
//!
//! This module provides:
//! - Scripted and failing LLM doubles
//! - A renderer that never spawns a process
//! - Assertions over progress event sequences

mod assertions;
mod mocks;

pub use assertions::{
    assert_progress_monotonic, assert_terminal_complete, assert_terminal_error, collect_events,
};
pub use mocks::{FailingLlm, ScriptedLlm, StaticRenderer};
