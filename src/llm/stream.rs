//! Lazy fragment sequence for chat completions.
//!
//! A `CompletionStream` is the caller-facing half of a completion: a worker
//! task parses the provider response and pushes text fragments into a bounded
//! channel, and this handle pulls them out one at a time. Dropping the handle
//! aborts the worker, which drops the in-flight HTTP response and releases
//! the connection.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures::{Stream, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::error::ClientError;

/// What the worker task feeds into the channel.
#[derive(Debug)]
pub(crate) enum StreamEvent {
    /// One text fragment, never empty.
    Delta(String),
    /// Terminal failure; the channel closes right after this.
    Failed(ClientError),
}

/// A finite, non-restartable sequence of text fragments from one completion
/// request.
///
/// Implements [`futures::Stream`] with `Item = String`. The sequence ends
/// early on failure, keeping whatever fragments were already yielded; the
/// reason is available from [`failure`](CompletionStream::failure) once
/// iteration has ended.
pub struct CompletionStream {
    rx: mpsc::Receiver<StreamEvent>,
    worker: Option<JoinHandle<()>>,
    failure: Option<ClientError>,
}

impl CompletionStream {
    pub(crate) fn new(rx: mpsc::Receiver<StreamEvent>, worker: JoinHandle<()>) -> Self {
        CompletionStream {
            rx,
            worker: Some(worker),
            failure: None,
        }
    }

    /// A stream that yields nothing and reports `failure` immediately.
    pub(crate) fn failed(failure: ClientError) -> Self {
        // Channel with no sender: polling returns None right away.
        let (_, rx) = mpsc::channel(1);
        CompletionStream {
            rx,
            worker: None,
            failure: Some(failure),
        }
    }

    /// The failure that ended the sequence early, if any.
    ///
    /// Populated once the stream has been driven past the point of failure;
    /// `None` means the sequence completed normally (so far).
    pub fn failure(&self) -> Option<&ClientError> {
        self.failure.as_ref()
    }

    /// Drains the remaining fragments and concatenates them.
    pub async fn collect_text(mut self) -> String {
        let mut text = String::new();
        while let Some(fragment) = self.next().await {
            text.push_str(&fragment);
        }
        text
    }
}

impl Stream for CompletionStream {
    type Item = String;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<String>> {
        let this = self.get_mut();
        loop {
            match this.rx.poll_recv(cx) {
                Poll::Ready(Some(StreamEvent::Delta(text))) => return Poll::Ready(Some(text)),
                Poll::Ready(Some(StreamEvent::Failed(failure))) => {
                    // The sender closes after a failure; keep polling so the
                    // caller observes end-of-stream on this same call.
                    this.failure.get_or_insert(failure);
                }
                Poll::Ready(None) => return Poll::Ready(None),
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

impl Drop for CompletionStream {
    fn drop(&mut self) {
        if let Some(worker) = self.worker.take() {
            worker.abort();
        }
    }
}
