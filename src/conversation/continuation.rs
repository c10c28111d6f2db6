//! Delayed continuations tied to a cancellation token per conversation epoch.
//!
//! Each stage advance that waits for the user to read something is spawned
//! as a task racing a sleep against the current token. Resetting the
//! conversation cancels the token and installs a fresh one, so nothing
//! scheduled before the reset can fire after it.

use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Scheduler for fire-after-delay stage continuations.
pub struct Continuations {
    token: Mutex<CancellationToken>,
}

impl Continuations {
    pub fn new() -> Self {
        Self {
            token: Mutex::new(CancellationToken::new()),
        }
    }

    fn current(&self) -> CancellationToken {
        self.token
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Run `task` after `delay` unless the current epoch is cancelled first.
    pub fn schedule<F>(&self, label: &'static str, delay: Duration, task: F) -> JoinHandle<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let token = self.current();
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {
                    debug!(continuation = label, "Continuation cancelled");
                }
                _ = tokio::time::sleep(delay) => {
                    if token.is_cancelled() {
                        debug!(continuation = label, "Continuation cancelled");
                        return;
                    }
                    task.await;
                }
            }
        })
    }

    /// Cancel everything scheduled so far and start a fresh epoch.
    pub fn cancel_all(&self) {
        let mut token = self
            .token
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        token.cancel();
        *token = CancellationToken::new();
    }
}

impl Default for Continuations {
    fn default() -> Self {
        Self::new()
    }
}
