//! Scope-level cancellation signal

use std::sync::Arc;

use tokio::sync::watch;

/// Cancellation signal shared by a request scope and everything it spawns
///
/// Cloning yields another handle to the same signal. The first reason passed
/// to [`CancellationSignal::cancel`] wins; later calls are ignored.
#[derive(Debug, Clone)]
pub struct CancellationSignal {
    sender: Arc<watch::Sender<Option<String>>>,
}

impl CancellationSignal {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(None);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Cancels the signal; returns false if it was already cancelled
    pub fn cancel(&self, reason: impl Into<String>) -> bool {
        let reason = reason.into();

        self.sender.send_if_modified(|current| {
            if current.is_some() {
                return false;
            }

            *current = Some(reason);
            true
        })
    }

    pub fn is_cancelled(&self) -> bool {
        self.sender.borrow().is_some()
    }

    /// Reason given to the first successful `cancel` call
    pub fn reason(&self) -> Option<String> {
        self.sender.borrow().clone()
    }

    /// Resolves with the cancellation reason once the signal is cancelled
    pub async fn cancelled(&self) -> String {
        let mut receiver = self.sender.subscribe();

        match receiver.wait_for(Option::is_some).await {
            Ok(reason) => reason.clone().unwrap_or_default(),
            // Unreachable while `self` holds the sender.
            Err(_) => "cancellation signal closed".to_string(),
        }
    }
}

impl Default for CancellationSignal {
    fn default() -> Self {
        Self::new()
    }
}
