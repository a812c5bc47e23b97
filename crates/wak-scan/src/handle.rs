//! Cancellable scan task.
//!
//! # Design
//!
//! A scan stream is driven by a spawned tokio task that forwards every item
//! into a bounded channel. The handle owns both the receiver and the task:
//!
//! - Messages are observed only through the receiver, so dropping it in
//!   [`ScanHandle::cancel`] makes cancellation take effect before `cancel`
//!   returns, even if the task has already buffered more messages.
//! - The subscription is released exactly once. A second `cancel`, or a
//!   `cancel` after the terminal message was delivered, returns `false`.
//!
//! ```text
//!   stream ──► forward task ──► mpsc ──► ScanHandle::next ──► consumer
//!                  ▲                          │
//!                  └──────── abort ◄──── cancel()
//! ```

use futures_util::StreamExt;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinHandle;
use tracing::debug;
use wak_schemas::{Account, ScanError};

use crate::AccountStream;

/// Channel capacity used when the caller has no configured value.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// One message delivered by a running scan.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ScanMessage {
    /// An account was discovered on the device.
    Discovered(Account),
    /// The scan finished normally. **Terminal.**
    Completed,
    /// The scan failed. **Terminal.**
    Failed(ScanError),
}

impl ScanMessage {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ScanMessage::Completed | ScanMessage::Failed(_))
    }
}

/// Result of a non-blocking poll on a [`ScanHandle`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TryNext {
    /// A message was ready.
    Ready(ScanMessage),
    /// The scan is still running but nothing is buffered right now.
    Empty,
    /// The subscription is released (cancelled, terminated, or the task died).
    Closed,
}

/// Owned handle to a running scan.
#[derive(Debug)]
pub struct ScanHandle {
    rx: Option<mpsc::Receiver<ScanMessage>>,
    task: Option<JoinHandle<()>>,
}

impl ScanHandle {
    /// Spawn a task driving `stream` onto the current tokio runtime.
    ///
    /// `capacity` is clamped to `1..=Semaphore::MAX_PERMITS`.
    ///
    /// # Panics
    /// Panics if called outside a tokio runtime (same as `tokio::spawn`).
    pub fn spawn(stream: AccountStream, capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity.clamp(1, Semaphore::MAX_PERMITS));
        let task = tokio::spawn(forward(stream, tx));
        Self {
            rx: Some(rx),
            task: Some(task),
        }
    }

    /// `true` until the subscription has been released.
    pub fn is_active(&self) -> bool {
        self.rx.is_some()
    }

    /// Wait for the next message.
    ///
    /// Returns `None` once the subscription is released. Delivering a terminal
    /// message releases the subscription.
    pub async fn next(&mut self) -> Option<ScanMessage> {
        let rx = self.rx.as_mut()?;
        let msg = rx.recv().await;
        self.after_receive(msg.as_ref());
        msg
    }

    /// Poll for a message without waiting.
    pub fn try_next(&mut self) -> TryNext {
        let Some(rx) = self.rx.as_mut() else {
            return TryNext::Closed;
        };
        match rx.try_recv() {
            Ok(msg) => {
                self.after_receive(Some(&msg));
                TryNext::Ready(msg)
            }
            Err(mpsc::error::TryRecvError::Empty) => TryNext::Empty,
            Err(mpsc::error::TryRecvError::Disconnected) => {
                self.release();
                TryNext::Closed
            }
        }
    }

    /// Cancel the scan.
    ///
    /// Returns `true` only for the call that actually released the
    /// subscription; later calls are no-ops.
    pub fn cancel(&mut self) -> bool {
        if !self.is_active() {
            return false;
        }
        if let Some(task) = self.task.as_ref() {
            task.abort();
        }
        self.release();
        debug!("scan subscription cancelled");
        true
    }

    fn after_receive(&mut self, msg: Option<&ScanMessage>) {
        match msg {
            Some(m) if !m.is_terminal() => {}
            _ => self.release(),
        }
    }

    fn release(&mut self) {
        self.rx = None;
        self.task = None;
    }
}

impl Drop for ScanHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

async fn forward(mut stream: AccountStream, tx: mpsc::Sender<ScanMessage>) {
    while let Some(item) = stream.next().await {
        match item {
            Ok(account) => {
                if tx.send(ScanMessage::Discovered(account)).await.is_err() {
                    // receiver dropped: scan was cancelled
                    return;
                }
            }
            Err(err) => {
                let _ = tx.send(ScanMessage::Failed(err)).await;
                return;
            }
        }
    }
    let _ = tx.send(ScanMessage::Completed).await;
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;
    use wak_schemas::CurrencyId;

    fn acc(id: &str) -> Account {
        Account::new(id, id.to_uppercase(), CurrencyId::new("bitcoin"))
    }

    fn items(ids: &[&str]) -> Vec<Result<Account, ScanError>> {
        ids.iter().map(|id| Ok(acc(id))).collect()
    }

    #[tokio::test]
    async fn delivers_accounts_then_completed() {
        let mut h = ScanHandle::spawn(stream::iter(items(&["a", "b"])).boxed(), 4);

        assert_eq!(h.next().await, Some(ScanMessage::Discovered(acc("a"))));
        assert_eq!(h.next().await, Some(ScanMessage::Discovered(acc("b"))));
        assert_eq!(h.next().await, Some(ScanMessage::Completed));
        assert!(!h.is_active(), "terminal message releases the subscription");
        assert_eq!(h.next().await, None);
    }

    #[tokio::test]
    async fn error_is_terminal() {
        let mut v = items(&["x"]);
        v.push(Err(ScanError::Disconnected));
        v.push(Ok(acc("never")));
        let mut h = ScanHandle::spawn(stream::iter(v).boxed(), 4);

        assert_eq!(h.next().await, Some(ScanMessage::Discovered(acc("x"))));
        assert_eq!(
            h.next().await,
            Some(ScanMessage::Failed(ScanError::Disconnected))
        );
        assert_eq!(h.next().await, None);
    }

    #[tokio::test]
    async fn cancel_is_effective_immediately_and_only_once() {
        let mut h = ScanHandle::spawn(stream::iter(items(&["a", "b", "c"])).boxed(), 8);
        assert_eq!(h.next().await, Some(ScanMessage::Discovered(acc("a"))));

        assert!(h.cancel(), "first cancel releases");
        assert!(!h.cancel(), "second cancel is a no-op");
        assert!(!h.is_active());
        assert_eq!(h.next().await, None);
        assert_eq!(h.try_next(), TryNext::Closed);
    }

    #[tokio::test]
    async fn cancel_after_completion_is_noop() {
        let mut h = ScanHandle::spawn(stream::iter(items(&[])).boxed(), 1);
        assert_eq!(h.next().await, Some(ScanMessage::Completed));
        assert!(!h.cancel());
    }

    #[tokio::test]
    async fn zero_capacity_is_clamped() {
        let mut h = ScanHandle::spawn(stream::iter(items(&["a"])).boxed(), 0);
        assert_eq!(h.next().await, Some(ScanMessage::Discovered(acc("a"))));
    }

    #[tokio::test]
    async fn oversized_capacity_is_clamped() {
        let mut h = ScanHandle::spawn(stream::iter(items(&["a"])).boxed(), usize::MAX);
        assert_eq!(h.next().await, Some(ScanMessage::Discovered(acc("a"))));
        assert_eq!(h.next().await, Some(ScanMessage::Completed));
    }

    #[test]
    fn terminal_classification() {
        assert!(ScanMessage::Completed.is_terminal());
        assert!(ScanMessage::Failed(ScanError::Aborted).is_terminal());
        assert!(!ScanMessage::Discovered(acc("a")).is_terminal());
    }
}
