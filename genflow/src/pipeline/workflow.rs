//! The contract between a feature pipeline and the orchestrator.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt::Debug;

use crate::core::{PipelineState, ERROR_STAGE};
use crate::errors::StageError;

/// Description reported for labels a workflow does not know.
pub const UNKNOWN_STAGE_DESCRIPTION: &str = "Processing...";

/// Progress reported for the error label.
pub const ERROR_PROGRESS: i32 = -1;

/// A finite-state label of a workflow.
///
/// Implemented by a fieldless enum that lists every label the workflow can
/// reach, including its error label.
pub trait StageLabel: Copy + Eq + Debug + Send + Sync + 'static {
    /// Parses a wire label. Unknown labels return `None`.
    fn parse(label: &str) -> Option<Self>;

    /// The wire label.
    fn as_str(self) -> &'static str;

    /// Percent complete reported when the run sits at this label.
    fn progress(self) -> i32;

    /// Human-readable description of this label.
    fn description(self) -> &'static str;
}

/// An executable stage of a workflow.
pub trait WorkflowStep: Copy + Debug + Send + Sync + 'static {
    /// Short name used in logs and lifecycle events.
    fn name(self) -> &'static str;

    /// Prefix of the error message when this step fails.
    fn failure_context(self) -> &'static str;
}

/// What happens after a label is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition<S> {
    /// Execute this step next.
    Run(S),
    /// The label is terminal.
    Finish,
}

/// Static description of one step, for the workflow-info endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageInfo {
    /// Step name.
    pub stage: &'static str,
    /// What the step does.
    pub description: &'static str,
    /// State keys the step writes.
    pub outputs: Vec<&'static str>,
}

impl StageInfo {
    /// Creates a step description.
    #[must_use]
    pub fn new(stage: &'static str, description: &'static str, outputs: &[&'static str]) -> Self {
        Self {
            stage,
            description,
            outputs: outputs.to_vec(),
        }
    }
}

/// A fixed sequence of LLM-backed stages.
///
/// The orchestrator owns sequencing: it asks [`transition`](Self::transition)
/// what to run for the current label, runs it with
/// [`execute`](Self::execute), stamps [`completes`](Self::completes) on the
/// result and reports [`payload`](Self::payload) in the progress event.
#[async_trait]
pub trait Workflow: Send + Sync + 'static {
    /// Every label the workflow can reach.
    type Label: StageLabel;

    /// Every step the workflow can execute.
    type Step: WorkflowStep;

    /// Pipeline name for logs.
    fn name(&self) -> &'static str;

    /// Name of the input field, used when rejecting empty input.
    fn input_field(&self) -> &'static str {
        "prompt"
    }

    /// Next step for a label. Must be total over the label enum.
    fn transition(&self, label: Self::Label) -> Transition<Self::Step>;

    /// Label the run moves to after `step` succeeds.
    fn completes(&self, step: Self::Step) -> Self::Label;

    /// Runs one step against the current state and returns the new state.
    ///
    /// The returned state must keep every key of `state`.
    async fn execute(
        &self,
        step: Self::Step,
        state: &PipelineState,
    ) -> Result<PipelineState, StageError>;

    /// Stage-specific fields of the progress event for `state`.
    fn payload(&self, state: &PipelineState) -> Map<String, Value>;

    /// Static description of the steps.
    fn stages(&self) -> Vec<StageInfo>;
}

/// Progress for a wire label: -1 for the error label, the table value for
/// known labels, 0 otherwise.
pub fn progress_of<L: StageLabel>(label: &str) -> i32 {
    if label == ERROR_STAGE {
        return ERROR_PROGRESS;
    }
    L::parse(label).map_or(0, L::progress)
}

/// Description for a wire label, or [`UNKNOWN_STAGE_DESCRIPTION`].
pub fn description_of<L: StageLabel>(label: &str) -> &'static str {
    L::parse(label).map_or(UNKNOWN_STAGE_DESCRIPTION, L::description)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Label {
        Starting,
        Done,
        Error,
    }

    impl StageLabel for Label {
        fn parse(label: &str) -> Option<Self> {
            match label {
                "starting" => Some(Self::Starting),
                "done" => Some(Self::Done),
                "error" => Some(Self::Error),
                _ => None,
            }
        }

        fn as_str(self) -> &'static str {
            match self {
                Self::Starting => "starting",
                Self::Done => "done",
                Self::Error => "error",
            }
        }

        fn progress(self) -> i32 {
            match self {
                Self::Starting => 0,
                Self::Done => 100,
                Self::Error => -1,
            }
        }

        fn description(self) -> &'static str {
            match self {
                Self::Starting => "Starting up",
                Self::Done => "All done",
                Self::Error => "Something broke",
            }
        }
    }

    #[test]
    fn test_progress_lookup() {
        assert_eq!(progress_of::<Label>("starting"), 0);
        assert_eq!(progress_of::<Label>("done"), 100);
        assert_eq!(progress_of::<Label>("error"), -1);
        assert_eq!(progress_of::<Label>("halfway"), 0);
    }

    #[test]
    fn test_description_lookup() {
        assert_eq!(description_of::<Label>("done"), "All done");
        assert_eq!(description_of::<Label>("halfway"), UNKNOWN_STAGE_DESCRIPTION);
    }

    #[test]
    fn test_stage_info_serializes() {
        let info = StageInfo::new("analyze", "Analyze the request", &["analysis"]);
        let value = serde_json::to_value(&info).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"stage": "analyze", "description": "Analyze the request", "outputs": ["analysis"]})
        );
    }
}
