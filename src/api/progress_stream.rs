use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::task::{Context, Poll};
use bytes::Bytes;
use futures::Stream;
use pin_project_lite::pin_project;
use crate::progress::TransferSample;

pub type TransferCallback = Arc<dyn Fn(TransferSample) + Send + Sync>;

/// Shared byte counter for every part of one request body
#[derive(Clone)]
pub struct TransferCounter {
    sent: Arc<AtomicU64>,
    total: u64,
    callback: TransferCallback,
}

impl TransferCounter {
    pub fn new(total: u64, callback: TransferCallback) -> Self {
        Self {
            sent: Arc::new(AtomicU64::new(0)),
            total,
            callback,
        }
    }

    pub fn record(&self, bytes: u64) {
        let sent = self.sent.fetch_add(bytes, Ordering::Relaxed) + bytes;
        (self.callback)(TransferSample::new(sent, self.total));
    }

    pub fn sent(&self) -> u64 {
        self.sent.load(Ordering::Relaxed)
    }
}

pin_project! {
    /// Reports every chunk that leaves the wrapped stream.
    pub struct ProgressStream<S> {
        #[pin]
        inner: S,
        counter: TransferCounter,
    }
}

impl<S> ProgressStream<S> {
    pub fn new(inner: S, counter: TransferCounter) -> Self {
        Self { inner, counter }
    }
}

impl<S> Stream for ProgressStream<S>
where
    S: Stream<Item = std::io::Result<Bytes>>,
{
    type Item = std::io::Result<Bytes>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.project();

        match this.inner.poll_next(cx) {
            Poll::Ready(Some(Ok(chunk))) => {
                if !chunk.is_empty() {
                    this.counter.record(chunk.len() as u64);
                }

                Poll::Ready(Some(Ok(chunk)))
            }
            other => other,
        }
    }
}
