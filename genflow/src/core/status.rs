//! Progress status enum.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::state::ERROR_STAGE;

/// Coarse status carried by every progress event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStatus {
    /// The pipeline is still running.
    InProgress,
    /// The pipeline reached its final stage.
    Complete,
    /// The pipeline ended in the error stage.
    Error,
}

impl Default for ProgressStatus {
    fn default() -> Self {
        Self::InProgress
    }
}

impl fmt::Display for ProgressStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InProgress => write!(f, "in_progress"),
            Self::Complete => write!(f, "complete"),
            Self::Error => write!(f, "error"),
        }
    }
}

impl ProgressStatus {
    /// Derives the status for a stage label and its progress percentage.
    ///
    /// The error label always wins; otherwise 100% means complete.
    #[must_use]
    pub fn derive(stage: &str, progress: i32) -> Self {
        if stage == ERROR_STAGE {
            Self::Error
        } else if progress >= 100 {
            Self::Complete
        } else {
            Self::InProgress
        }
    }

    /// Returns true if no further events follow this status.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Error)
    }

    /// Returns true if the status indicates success.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Complete)
    }

    /// Returns true if the status indicates failure.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Error)
    }
}
