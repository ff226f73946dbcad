//! The consumer side of a pipeline run.

use futures::{Stream, StreamExt};
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;

use crate::cancellation::CancellationToken;
use crate::core::ProgressEvent;

/// Reason recorded when the consumer drops the stream.
pub const STREAM_DROPPED: &str = "progress stream dropped";

/// Progress events of one run, in stage order.
///
/// Consumable once. Dropping the stream cancels the run: the producer
/// finishes the stage in flight and then stops.
#[derive(Debug)]
pub struct ProgressStream {
    rx: mpsc::Receiver<ProgressEvent>,
    token: CancellationToken,
}

impl ProgressStream {
    pub(crate) fn new(rx: mpsc::Receiver<ProgressEvent>, token: CancellationToken) -> Self {
        Self { rx, token }
    }

    /// Drains the stream and returns the last event.
    ///
    /// `None` only if the producer died without emitting anything.
    pub async fn final_event(mut self) -> Option<ProgressEvent> {
        let mut last = None;
        while let Some(event) = self.next().await {
            last = Some(event);
        }
        last
    }

    /// Cancels the run without dropping the stream. Events already sent
    /// can still be read.
    pub fn cancel(&self) {
        self.token.cancel("cancelled by consumer");
    }

    /// Returns true once the run was cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl Stream for ProgressStream {
    type Item = ProgressEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

impl Drop for ProgressStream {
    fn drop(&mut self) {
        self.token.cancel(STREAM_DROPPED);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_final_event_returns_last() {
        let (tx, rx) = mpsc::channel(4);
        let stream = ProgressStream::new(rx, CancellationToken::new());
        tx.send(ProgressEvent::new("a", 50, "half")).await.unwrap();
        tx.send(ProgressEvent::new("b", 100, "done")).await.unwrap();
        drop(tx);

        let last = stream.final_event().await.unwrap();
        assert_eq!(last.stage, "b");
    }

    #[tokio::test]
    async fn test_drop_cancels_token() {
        let (_tx, rx) = mpsc::channel(1);
        let token = CancellationToken::new();
        let stream = ProgressStream::new(rx, token.clone());
        assert!(!token.is_cancelled());
        drop(stream);
        assert!(token.is_cancelled());
        assert_eq!(token.reason().as_deref(), Some(STREAM_DROPPED));
    }

    #[tokio::test]
    async fn test_empty_stream_has_no_final_event() {
        let (tx, rx) = mpsc::channel::<ProgressEvent>(1);
        drop(tx);
        let stream = ProgressStream::new(rx, CancellationToken::new());
        assert!(stream.final_event().await.is_none());
    }
}
