//! Caller-initiated cancellation
//!
//! A cloneable flag backed by a `tokio::sync::watch` channel. The pipeline
//! checks it at every stage boundary and races in-flight collaborator calls
//! against it.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

#[derive(Debug, Clone)]
pub struct CancellationToken {
    sender: Arc<watch::Sender<bool>>,
    receiver: watch::Receiver<bool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        let (sender, receiver) = watch::channel(false);
        Self {
            sender: Arc::new(sender),
            receiver,
        }
    }

    /// Signals cancellation to every clone of this token
    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Completes once the token is cancelled
    pub async fn cancelled(&self) {
        let mut receiver = self.receiver.clone();
        // The sender lives as long as any clone, so this only ends on cancel
        let _ = receiver.wait_for(|cancelled| *cancelled).await;
    }

    /// Cancels the token after `timeout`, for caller-side deadlines
    pub fn cancel_after(&self, timeout: Duration) -> tokio::task::JoinHandle<()> {
        let token = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            token.cancel();
        })
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}
