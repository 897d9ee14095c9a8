//! Per-accelerator command streams (§5): "each stream is a FIFO of
//! commands executed in order by a dedicated worker." The worker is a
//! `tokio` task reading an `mpsc` queue -- one queue per [`Stream`], one
//! task per `Stream`, dispatching device commands in the order they were
//! submitted.

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::error::RuntimeError;

/// One unit of work submitted to a stream's worker. `respond` carries the
/// outcome back to whoever submitted it; the worker runs `work` and then
/// sends on `respond`, preserving FIFO order within the stream (§5
/// "Ordering guarantees").
struct Command {
    work: Box<dyn FnOnce() -> Result<(), RuntimeError> + Send + 'static>,
    respond: oneshot::Sender<Result<(), RuntimeError>>,
}

/// A FIFO command queue for one accelerator stream, backed by a dedicated
/// worker task. Dropping the last `Stream` handle closes the queue, which
/// ends the worker once any in-flight command completes.
pub struct Stream {
    sender: mpsc::UnboundedSender<Command>,
    worker: JoinHandle<()>,
}

impl Stream {
    /// Spawn a new stream's worker task. `capacity_hint` is unused beyond
    /// documentation -- the queue is unbounded because a stream backs up
    /// only as fast as its own submitter, and a bounded queue would let one
    /// slow stream apply backpressure to an unrelated one sharing the same
    /// accelerator, which §5 says must not happen ("commands submitted to
    /// different streams are unordered unless an explicit cross-stream sync
    /// is issued").
    pub fn new() -> Self {
        let (sender, mut receiver) = mpsc::unbounded_channel::<Command>();
        let worker = tokio::spawn(async move {
            while let Some(command) = receiver.recv().await {
                let outcome = (command.work)();
                let _ = command.respond.send(outcome);
            }
        });
        Stream { sender, worker }
    }

    /// Submit `work` to this stream's FIFO, awaiting its completion. Later
    /// calls on the same `Stream` only begin after this one's `work` has
    /// run, preserving submission order.
    pub async fn submit<F>(&self, work: F) -> Result<(), RuntimeError>
    where
        F: FnOnce() -> Result<(), RuntimeError> + Send + 'static,
    {
        let (respond, outcome) = oneshot::channel();
        let command = Command { work: Box::new(work), respond };
        self.sender
            .send(command)
            .map_err(|_| RuntimeError::DeviceUnavailable { reason: "stream worker has shut down".to_string() })?;
        outcome
            .await
            .map_err(|_| RuntimeError::DeviceUnavailable { reason: "stream worker dropped the command without responding".to_string() })?
    }

    /// Synchronize: block until every command submitted so far has
    /// completed. Implemented as a no-op command appended to the queue --
    /// since the queue is FIFO, its completion implies every earlier
    /// command's completion too.
    pub async fn synchronize(&self) -> Result<(), RuntimeError> {
        self.submit(|| Ok(())).await
    }
}

impl Default for Stream {
    fn default() -> Self {
        Stream::new()
    }
}

impl Drop for Stream {
    fn drop(&mut self) {
        self.worker.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn commands_complete_in_submission_order() {
        let stream = Stream::new();
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));

        for i in 0..5 {
            let order = Arc::clone(&order);
            stream
                .submit(move || {
                    order.lock().unwrap().push(i);
                    Ok(())
                })
                .await
                .unwrap();
        }

        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn synchronize_observes_every_prior_command() {
        let stream = Stream::new();
        let counter = Arc::new(AtomicUsize::new(0));
        for _ in 0..10 {
            let counter = Arc::clone(&counter);
            stream.submit(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }).await.unwrap();
        }
        stream.synchronize().await.unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 10);
    }
}
