//! Assertions over progress event sequences.

use futures::StreamExt;

use crate::core::{ProgressEvent, ProgressStatus, ERROR_STAGE};
use crate::pipeline::ProgressStream;

/// Drains a run into a vector.
pub async fn collect_events(stream: ProgressStream) -> Vec<ProgressEvent> {
    stream.collect().await
}

/// Asserts the run ended in `complete` and returns the final event.
pub fn assert_terminal_complete(events: &[ProgressEvent]) -> &ProgressEvent {
    assert!(!events.is_empty(), "Expected at least one event");
    let last = &events[events.len() - 1];
    assert_eq!(
        last.status,
        ProgressStatus::Complete,
        "Expected complete terminal event, got {:?} at stage '{}' (error: {:?})",
        last.status,
        last.stage,
        last.error
    );
    assert_eq!(last.progress, 100);
    last
}

/// Asserts the run ended in exactly one error event and returns it.
pub fn assert_terminal_error(events: &[ProgressEvent]) -> &ProgressEvent {
    assert!(!events.is_empty(), "Expected at least one event");
    let last = &events[events.len() - 1];
    assert_eq!(
        last.stage, ERROR_STAGE,
        "Expected error terminal event, got stage '{}'",
        last.stage
    );
    assert_eq!(last.status, ProgressStatus::Error);
    assert_eq!(last.progress, -1);
    assert!(last.error.is_some(), "Error event carries no message");

    let errors = events.iter().filter(|e| e.stage == ERROR_STAGE).count();
    assert_eq!(errors, 1, "Expected exactly one error event, got {errors}");
    last
}

/// Asserts progress never goes backwards and no stage label repeats.
///
/// A terminal error event at -1 is allowed to follow any progress.
pub fn assert_progress_monotonic(events: &[ProgressEvent]) {
    let mut seen: Vec<&str> = Vec::new();
    let mut previous = i32::MIN;
    for (i, event) in events.iter().enumerate() {
        if event.stage == ERROR_STAGE {
            assert_eq!(i, events.len() - 1, "Error event must be the last event");
            continue;
        }
        assert!(
            event.progress >= previous,
            "Progress went backwards at event {i}: {previous} -> {}",
            event.progress
        );
        assert!(
            !seen.contains(&event.stage.as_str()),
            "Stage '{}' reported twice",
            event.stage
        );
        seen.push(&event.stage);
        previous = event.progress;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(stage: &str, progress: i32) -> ProgressEvent {
        ProgressEvent::new(stage, progress, "d")
    }

    #[test]
    fn test_monotonic_accepts_trailing_error() {
        let events = vec![
            event("a", 25),
            event("b", 50),
            event("error", -1).with_error(Some("boom".into())),
        ];
        assert_progress_monotonic(&events);
        let last = assert_terminal_error(&events);
        assert_eq!(last.error.as_deref(), Some("boom"));
    }

    #[test]
    #[should_panic(expected = "Progress went backwards")]
    fn test_monotonic_rejects_regression() {
        assert_progress_monotonic(&[event("a", 50), event("b", 25)]);
    }

    #[test]
    #[should_panic(expected = "reported twice")]
    fn test_monotonic_rejects_repeated_stage() {
        assert_progress_monotonic(&[event("a", 50), event("a", 50)]);
    }

    #[test]
    fn test_terminal_complete() {
        let events = vec![event("a", 50), event("done", 100)];
        assert_eq!(assert_terminal_complete(&events).stage, "done");
    }
}
