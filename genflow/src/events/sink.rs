//! Lifecycle event sinks.

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use std::fmt;
use tracing::{debug, error, info, warn, Level};

/// Lifecycle points of a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lifecycle {
    /// The run task started.
    PipelineStarted,
    /// A stage is about to execute.
    StageStarted,
    /// A stage returned successfully.
    StageCompleted,
    /// A stage failed, panicked or broke an invariant.
    StageFailed,
    /// The run reached a terminal label.
    PipelineCompleted,
    /// The consumer went away before the run finished.
    PipelineCancelled,
}

impl Lifecycle {
    /// Dotted event name, e.g. `stage.completed`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PipelineStarted => "pipeline.started",
            Self::StageStarted => "stage.started",
            Self::StageCompleted => "stage.completed",
            Self::StageFailed => "stage.failed",
            Self::PipelineCompleted => "pipeline.completed",
            Self::PipelineCancelled => "pipeline.cancelled",
        }
    }
}

impl fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Receiver of lifecycle events.
///
/// Sinks observe; they cannot influence the run. Implementations must not
/// panic.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Records one lifecycle event with its structured data.
    async fn emit(&self, event: Lifecycle, data: Value);
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpEventSink;

#[async_trait]
impl EventSink for NoOpEventSink {
    async fn emit(&self, _event: Lifecycle, _data: Value) {}
}

/// Writes lifecycle events to `tracing`.
///
/// Failures are always logged at error level and cancellations at warn;
/// everything else at the configured level.
#[derive(Debug, Clone)]
pub struct LoggingEventSink {
    level: Level,
}

impl Default for LoggingEventSink {
    fn default() -> Self {
        Self { level: Level::INFO }
    }
}

impl LoggingEventSink {
    /// Creates a sink that logs routine events at `level`.
    #[must_use]
    pub fn new(level: Level) -> Self {
        Self { level }
    }

    /// Routine events at debug level.
    #[must_use]
    pub fn debug() -> Self {
        Self::new(Level::DEBUG)
    }
}

#[async_trait]
impl EventSink for LoggingEventSink {
    async fn emit(&self, event: Lifecycle, data: Value) {
        let event_type = event.as_str();
        match event {
            Lifecycle::StageFailed => error!(event_type, event_data = %data, "Pipeline event"),
            Lifecycle::PipelineCancelled => warn!(event_type, event_data = %data, "Pipeline event"),
            _ if self.level == Level::DEBUG => {
                debug!(event_type, event_data = %data, "Pipeline event");
            }
            _ => info!(event_type, event_data = %data, "Pipeline event"),
        }
    }
}

/// Keeps every event in memory; meant for tests.
#[derive(Debug, Default)]
pub struct CollectingEventSink {
    events: RwLock<Vec<(Lifecycle, Value)>>,
}

impl CollectingEventSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All events so far, in arrival order.
    #[must_use]
    pub fn events(&self) -> Vec<(Lifecycle, Value)> {
        self.events.read().clone()
    }

    /// Just the event kinds, in arrival order.
    #[must_use]
    pub fn kinds(&self) -> Vec<Lifecycle> {
        self.events.read().iter().map(|(kind, _)| *kind).collect()
    }

    /// Data of every event of one kind.
    #[must_use]
    pub fn of_kind(&self, kind: Lifecycle) -> Vec<Value> {
        self.events
            .read()
            .iter()
            .filter(|(k, _)| *k == kind)
            .map(|(_, data)| data.clone())
            .collect()
    }

    /// Number of events recorded.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    /// Returns true if nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }
}

#[async_trait]
impl EventSink for CollectingEventSink {
    async fn emit(&self, event: Lifecycle, data: Value) {
        self.events.write().push((event, data));
    }
}
