//! Drives a [`Workflow`] over an accumulating [`PipelineState`].

use futures::FutureExt;
use serde_json::json;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::stream::ProgressStream;
use super::workflow::{
    description_of, progress_of, StageLabel, Transition, Workflow, WorkflowStep,
};
use crate::cancellation::CancellationToken;
use crate::core::{PipelineState, ProgressEvent, ERROR_STAGE};
use crate::errors::InputRejected;
use crate::events::{EventSink, Lifecycle, LoggingEventSink};
use crate::observability::SpanTimer;

/// Default cap on stage executions per run.
pub const DEFAULT_MAX_TRANSITIONS: usize = 20;

/// Runs workflows and streams their progress.
///
/// Cheap to clone; every run gets its own task and state, and runs share
/// nothing mutable.
pub struct Orchestrator<W: Workflow> {
    workflow: Arc<W>,
    sink: Arc<dyn EventSink>,
    max_transitions: usize,
}

impl<W: Workflow> Clone for Orchestrator<W> {
    fn clone(&self) -> Self {
        Self {
            workflow: Arc::clone(&self.workflow),
            sink: Arc::clone(&self.sink),
            max_transitions: self.max_transitions,
        }
    }
}

impl<W: Workflow> std::fmt::Debug for Orchestrator<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("workflow", &self.workflow.name())
            .field("max_transitions", &self.max_transitions)
            .finish_non_exhaustive()
    }
}

impl<W: Workflow> Orchestrator<W> {
    /// Creates an orchestrator that logs lifecycle events through `tracing`.
    pub fn new(workflow: W) -> Self {
        Self {
            workflow: Arc::new(workflow),
            sink: Arc::new(LoggingEventSink::default()),
            max_transitions: DEFAULT_MAX_TRANSITIONS,
        }
    }

    /// Replaces the lifecycle event sink.
    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Caps the number of stage executions per run.
    #[must_use]
    pub fn with_max_transitions(mut self, max_transitions: usize) -> Self {
        self.max_transitions = max_transitions;
        self
    }

    /// The workflow being driven.
    pub fn workflow(&self) -> &W {
        &self.workflow
    }

    /// Starts a run from user input.
    ///
    /// Empty or whitespace-only input is rejected before anything is
    /// spawned; otherwise the input is trimmed. Must be called from within
    /// a tokio runtime.
    pub fn run(&self, input: &str) -> Result<ProgressStream, InputRejected> {
        let input = input.trim();
        if input.is_empty() {
            return Err(InputRejected::empty(self.workflow.input_field()));
        }
        Ok(self.run_from(PipelineState::new(input)))
    }

    /// Starts a run from an arbitrary state.
    ///
    /// A state whose label is terminal or unknown yields exactly one
    /// snapshot event.
    pub fn run_from(&self, state: PipelineState) -> ProgressStream {
        let (tx, rx) = mpsc::channel(1);
        let token = CancellationToken::new();
        let driver = Driver {
            workflow: Arc::clone(&self.workflow),
            sink: Arc::clone(&self.sink),
            max_transitions: self.max_transitions,
            token: token.clone(),
            tx,
        };
        tokio::spawn(driver.drive(state));
        ProgressStream::new(rx, token)
    }

    /// Runs to the end and returns only the terminal event.
    pub async fn run_to_completion(&self, input: &str) -> Result<ProgressEvent, InputRejected> {
        let stream = self.run(input)?;
        Ok(stream.final_event().await.unwrap_or_else(|| {
            error!(pipeline = self.workflow.name(), "Pipeline ended without emitting an event");
            ProgressEvent::new(
                ERROR_STAGE,
                progress_of::<W::Label>(ERROR_STAGE),
                description_of::<W::Label>(ERROR_STAGE),
            )
            .with_error(Some("Pipeline ended without a result".to_string()))
        }))
    }
}

/// Producer half of one run.
struct Driver<W: Workflow> {
    workflow: Arc<W>,
    sink: Arc<dyn EventSink>,
    max_transitions: usize,
    token: CancellationToken,
    tx: mpsc::Sender<ProgressEvent>,
}

enum Flow {
    Continue,
    Stop,
}

impl<W: Workflow> Driver<W> {
    async fn drive(self, mut state: PipelineState) {
        let pipeline = self.workflow.name();
        let run_timer = SpanTimer::start(pipeline);
        self.sink
            .emit(
                Lifecycle::PipelineStarted,
                json!({"pipeline": pipeline, "stage": state.stage()}),
            )
            .await;

        let mut transitions = 0usize;
        let mut emitted = false;
        while let Some(step) = self.next_step(&state) {
            if self.token.is_cancelled() {
                self.cancelled(&state).await;
                return;
            }

            if transitions >= self.max_transitions {
                let cause = format!("exceeded {} stage transitions", self.max_transitions);
                state = self.fail(step, state, &cause, 0).await;
            } else {
                transitions += 1;
                state = self.step(step, state).await;
            }

            if let Flow::Stop = self.send(&state).await {
                self.cancelled(&state).await;
                return;
            }
            emitted = true;
        }

        if !emitted {
            debug!(pipeline, stage = state.stage(), "Nothing to run, emitting snapshot");
            if let Flow::Stop = self.send(&state).await {
                self.cancelled(&state).await;
                return;
            }
        }

        self.sink
            .emit(
                Lifecycle::PipelineCompleted,
                json!({
                    "pipeline": pipeline,
                    "stage": state.stage(),
                    "transitions": transitions,
                    "duration_ms": run_timer.finish(),
                }),
            )
            .await;
    }

    /// The step to run for the current label, or `None` when the label is
    /// terminal, the error label or unknown.
    fn next_step(&self, state: &PipelineState) -> Option<W::Step> {
        if state.is_error() {
            return None;
        }
        match W::Label::parse(state.stage()).map(|label| self.workflow.transition(label)) {
            Some(Transition::Run(step)) => Some(step),
            Some(Transition::Finish) => None,
            None => {
                debug!(
                    pipeline = self.workflow.name(),
                    stage = state.stage(),
                    "Unknown stage label treated as terminal"
                );
                None
            }
        }
    }

    async fn step(&self, step: W::Step, state: PipelineState) -> PipelineState {
        let pipeline = self.workflow.name();
        self.sink
            .emit(
                Lifecycle::StageStarted,
                json!({"pipeline": pipeline, "stage": step.name()}),
            )
            .await;

        let timer = SpanTimer::start(step.name());
        let outcome = AssertUnwindSafe(self.workflow.execute(step, &state))
            .catch_unwind()
            .await;
        let duration_ms = timer.finish();

        let result = match outcome {
            Ok(Ok(next)) if next.extends(&state) => Ok(next),
            Ok(Ok(_)) => Err("stage dropped keys written by earlier stages".to_string()),
            Ok(Err(err)) => Err(err.to_string()),
            Err(panic) => Err(format!("stage panicked: {}", panic_message(panic.as_ref()))),
        };

        match result {
            Ok(next) => {
                let label = self.workflow.completes(step).as_str();
                info!(pipeline, stage = step.name(), duration_ms, "Stage completed");
                self.sink
                    .emit(
                        Lifecycle::StageCompleted,
                        json!({
                            "pipeline": pipeline,
                            "stage": step.name(),
                            "label": label,
                            "duration_ms": duration_ms,
                        }),
                    )
                    .await;
                next.advance(label)
            }
            Err(cause) => self.fail(step, state, &cause, duration_ms).await,
        }
    }

    async fn fail(
        &self,
        step: W::Step,
        state: PipelineState,
        cause: &str,
        duration_ms: u64,
    ) -> PipelineState {
        let pipeline = self.workflow.name();
        let message = format!("{}: {cause}", step.failure_context());
        error!(pipeline, stage = step.name(), error = %message, "Stage failed");
        self.sink
            .emit(
                Lifecycle::StageFailed,
                json!({
                    "pipeline": pipeline,
                    "stage": step.name(),
                    "error": message,
                    "duration_ms": duration_ms,
                }),
            )
            .await;
        state.fail(message)
    }

    fn event_for(&self, state: &PipelineState) -> ProgressEvent {
        ProgressEvent::new(
            state.stage(),
            progress_of::<W::Label>(state.stage()),
            description_of::<W::Label>(state.stage()),
        )
        .with_error(state.error().map(str::to_string))
        .with_payload(self.workflow.payload(state))
    }

    async fn send(&self, state: &PipelineState) -> Flow {
        if self.tx.send(self.event_for(state)).await.is_ok() {
            Flow::Continue
        } else {
            self.token.cancel("progress consumer disconnected");
            Flow::Stop
        }
    }

    async fn cancelled(&self, state: &PipelineState) {
        let reason = self.token.reason().unwrap_or_default();
        warn!(
            pipeline = self.workflow.name(),
            stage = state.stage(),
            %reason,
            "Pipeline cancelled"
        );
        self.sink
            .emit(
                Lifecycle::PipelineCancelled,
                json!({
                    "pipeline": self.workflow.name(),
                    "stage": state.stage(),
                    "reason": reason,
                }),
            )
            .await;
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
