//! Run-wide deadline.
//!
//! A [`Deadline`] owns a [`CancellationToken`] that is cancelled exactly once,
//! when the configured timeout elapses. Every blocking wait in the pipeline
//! races its primary event against [`CancellationToken::cancelled`]. The token
//! is monotonic: once fired it stays fired for the rest of the run.
//!
//! Dropping the [`Deadline`] also fires the token, so a run that is abandoned
//! midway (its future dropped) still stops every task it spawned.

use core::time::Duration;
use tokio::{task::JoinHandle, time::Instant};
use tokio_util::sync::CancellationToken;

/// Fallback horizon for timeouts too large to add to the current instant.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

pub struct Deadline {
    token: CancellationToken,
    timeout: Duration,
    timer: JoinHandle<()>,
}

impl Deadline {
    /// Starts the countdown. Must be called from within a Tokio runtime.
    pub fn start(timeout: Duration) -> Self {
        let token = CancellationToken::new();
        let now = Instant::now();
        let expires_at = now.checked_add(timeout).unwrap_or(now + FAR_FUTURE);

        let timer = tokio::spawn({
            let token = token.clone();
            async move {
                tokio::select! {
                    () = tokio::time::sleep_until(expires_at) => {
                        tracing::warn!("Deadline of {timeout:?} reached, cancelling run");
                        token.cancel();
                    }
                    () = token.cancelled() => {}
                }
            }
        });

        Self {
            token,
            timeout,
            timer,
        }
    }

    /// A handle that can be cloned into tasks. Read-only by convention: only
    /// the timer and [`Drop`] cancel it.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn is_expired(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once the deadline has fired.
    pub async fn expired(&self) {
        self.token.cancelled().await;
    }
}

impl Drop for Deadline {
    fn drop(&mut self) {
        self.token.cancel();
        self.timer.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fires_after_timeout() {
        let deadline = Deadline::start(Duration::from_millis(20));
        assert!(!deadline.is_expired());
        tokio::time::timeout(Duration::from_secs(5), deadline.expired())
            .await
            .unwrap();
        assert!(deadline.is_expired());
    }

    #[tokio::test]
    async fn stays_pending_before_timeout() {
        let deadline = Deadline::start(Duration::from_secs(60));
        let fired = tokio::time::timeout(Duration::from_millis(20), deadline.expired()).await;
        assert!(fired.is_err());
        assert!(!deadline.is_expired());
    }

    #[tokio::test]
    async fn dropping_cancels_the_token() {
        let deadline = Deadline::start(Duration::from_secs(60));
        let token = deadline.token();
        assert!(!token.is_cancelled());
        drop(deadline);
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn huge_timeout_does_not_overflow() {
        let deadline = Deadline::start(Duration::MAX);
        let fired = tokio::time::timeout(Duration::from_millis(20), deadline.expired()).await;
        assert!(fired.is_err());
        assert!(!deadline.is_expired());
    }
}
