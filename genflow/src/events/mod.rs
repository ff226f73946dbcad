//! Event plumbing: lifecycle sinks for observability and wire framing for
//! progress streams.

pub mod framing;
mod sink;

pub use framing::{to_ndjson_line, to_sse_frame};
pub use sink::{CollectingEventSink, EventSink, Lifecycle, LoggingEventSink, NoOpEventSink};
