//! Trailing-edge debouncer over a channel.

use std::future::Future;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Duration, timeout};
use tracing::trace;

/// Coalesces bursts of items into one flush.
///
/// Each received item re-arms the window; the flush callback runs once the
/// channel stays quiet for a full window, receiving every item of the burst
/// in arrival order. Dropping the debouncer aborts the receiving task, so
/// items still pending at drop are discarded; callers that need a final
/// flush trigger one explicitly before dropping.
#[derive(Debug)]
pub struct Debouncer<T> {
    tx: mpsc::Sender<T>,
    task: JoinHandle<()>,
}

impl<T: Send + 'static> Debouncer<T> {
    pub fn spawn<F, Fut>(window: Duration, mut flush: F) -> Self
    where
        F: FnMut(Vec<T>) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send,
    {
        let (tx, mut rx) = mpsc::channel::<T>(64);
        let task = tokio::spawn(async move {
            let mut pending: Vec<T> = Vec::new();

            loop {
                let msg = if pending.is_empty() {
                    rx.recv().await
                } else {
                    match timeout(window, rx.recv()).await {
                        Ok(msg) => msg,
                        Err(_) => {
                            flush(std::mem::take(&mut pending)).await;
                            continue;
                        }
                    }
                };

                let Some(msg) = msg else {
                    if !pending.is_empty() {
                        flush(std::mem::take(&mut pending)).await;
                    }
                    break;
                };

                pending.push(msg);
            }
        });

        Self { tx, task }
    }

    /// Queues an item for the current burst. Returns false once the
    /// debouncer is shut down or the channel is saturated; the item is
    /// dropped in either case.
    pub fn push(&self, item: T) -> bool {
        match self.tx.try_send(item) {
            Ok(()) => true,
            Err(err) => {
                trace!("debouncer rejected item: {err}");
                false
            }
        }
    }
}

impl<T> Drop for Debouncer<T> {
    fn drop(&mut self) {
        self.task.abort();
    }
}
