//! Deferred attachment removal.
//!
//! Handlers never delete files inline. Once the row change that orphaned a file
//! has committed, the handler enqueues the file name and returns; a single
//! background task drains the queue. Failures are logged and counted, and the
//! request that caused them has already succeeded.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use autoloan_core::AttachmentStorage;

use crate::metrics::track_cleanup_failure;

#[derive(Debug)]
enum CleanupJob {
    Remove(String),
    Barrier(oneshot::Sender<()>),
}

/// Handle to the removal worker. Cheap to clone.
#[derive(Clone, Debug)]
pub struct CleanupQueue {
    sender: mpsc::UnboundedSender<CleanupJob>,
}

impl CleanupQueue {
    /// Spawns the worker on the current runtime.
    pub fn spawn(storage: Arc<dyn AttachmentStorage>) -> Self {
        let (sender, mut receiver) = mpsc::unbounded_channel::<CleanupJob>();

        tokio::spawn(async move {
            while let Some(job) = receiver.recv().await {
                match job {
                    CleanupJob::Remove(name) => match storage.remove(&name).await {
                        Ok(()) => debug!(file = %name, "Attachment removed"),
                        Err(e) => {
                            warn!(file = %name, error = %e, "Failed to remove attachment");
                            track_cleanup_failure();
                        }
                    },
                    CleanupJob::Barrier(done) => {
                        let _ = done.send(());
                    }
                }
            }
        });

        Self { sender }
    }

    pub fn enqueue(&self, name: impl Into<String>) {
        let name = name.into();
        if self.sender.send(CleanupJob::Remove(name.clone())).is_err() {
            warn!(file = %name, "Cleanup worker is gone; attachment left in place");
            track_cleanup_failure();
        }
    }

    /// Resolves once every removal enqueued before the call has been attempted.
    pub async fn flush(&self) {
        let (done, wait) = oneshot::channel();
        if self.sender.send(CleanupJob::Barrier(done)).is_ok() {
            let _ = wait.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use autoloan_core::LocalAttachmentStorage;

    fn temp_storage() -> Arc<LocalAttachmentStorage> {
        let dir = std::env::temp_dir().join(format!("autoloan-cleanup-{}", uuid::Uuid::new_v4()));
        Arc::new(LocalAttachmentStorage::new(dir))
    }

    #[tokio::test]
    async fn test_enqueued_file_is_gone_after_flush() {
        let storage = temp_storage();
        storage.prepare().await.unwrap();
        storage.stage("proof-123.pdf", b"%PDF-1.4").await.unwrap();
        storage.promote("proof-123.pdf").await.unwrap();

        let queue = CleanupQueue::spawn(storage.clone());
        queue.enqueue("proof-123.pdf");
        queue.flush().await;

        assert!(!storage.exists("proof-123.pdf").await.unwrap());
    }

    #[tokio::test]
    async fn test_missing_file_does_not_stop_the_worker() {
        let storage = temp_storage();
        storage.prepare().await.unwrap();
        storage.stage("b.pdf", b"x").await.unwrap();
        storage.promote("b.pdf").await.unwrap();

        let queue = CleanupQueue::spawn(storage.clone());
        queue.enqueue("a.pdf");
        queue.enqueue("../escape.pdf");
        queue.enqueue("b.pdf");
        queue.flush().await;

        assert!(!storage.exists("b.pdf").await.unwrap());
    }
}
