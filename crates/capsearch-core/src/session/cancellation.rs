//! Cancellation support for feed sessions
//!
//! Cancelling releases the transport stream and silences the session.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

/// Wrapper around CancellationToken for session cancellation
#[derive(Clone, Debug, Default)]
pub struct SessionCancellation {
    token: CancellationToken,
    /// Claimed by the first `cancel` call
    claimed: Arc<AtomicBool>,
}

impl SessionCancellation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel the session. Returns false if it was already cancelled.
    pub fn cancel(&self) -> bool {
        if self.claimed.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.token.cancel();
        true
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once the session is cancelled
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_cancel_is_idempotent() {
        let cancellation = SessionCancellation::new();
        let observer = cancellation.clone();
        assert!(!observer.is_cancelled());

        assert!(cancellation.cancel());
        assert!(!cancellation.cancel());
        assert!(observer.is_cancelled());
        // Completes immediately once cancelled
        observer.cancelled().await;
    }

    #[tokio::test]
    async fn test_concurrent_cancel_reports_one_winner() {
        let cancellation = SessionCancellation::new();
        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let c = cancellation.clone();
                tokio::spawn(async move { c.cancel() })
            })
            .collect();

        let mut winners = 0;
        for task in tasks {
            if task.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
        assert!(cancellation.is_cancelled());
    }
}
