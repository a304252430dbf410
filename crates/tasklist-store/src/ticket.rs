//! Observable outcomes of fire-and-forget writes.

use tokio::sync::oneshot;
use tokio::sync::oneshot::error::TryRecvError;

use crate::error::StorageError;

/// Result of a single storage write.
#[derive(Debug)]
pub enum WriteOutcome {
    /// The backend accepted the write.
    Persisted,
    /// Nothing needed to be written.
    Skipped,
    /// The write failed; local state may diverge until the next sync.
    Failed(StorageError),
}

impl WriteOutcome {
    /// Returns true when the backend accepted the write.
    #[must_use]
    pub const fn is_persisted(&self) -> bool {
        matches!(self, Self::Persisted)
    }

    /// Returns true when the write failed.
    #[must_use]
    pub const fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    /// Error of a failed write.
    #[must_use]
    pub const fn error(&self) -> Option<&StorageError> {
        match self {
            Self::Failed(err) => Some(err),
            Self::Persisted | Self::Skipped => None,
        }
    }
}

impl From<Result<(), StorageError>> for WriteOutcome {
    fn from(result: Result<(), StorageError>) -> Self {
        match result {
            Ok(()) => Self::Persisted,
            Err(err) => Self::Failed(err),
        }
    }
}

/// Handle to the eventual outcome of a write.
///
/// Dropping the ticket does not cancel the write; it only discards the outcome.
#[derive(Debug)]
#[must_use = "drop the ticket explicitly to ignore the write outcome"]
pub struct WriteTicket {
    rx: oneshot::Receiver<WriteOutcome>,
}

/// Sending half of a [`WriteTicket`], held by whoever performs the write.
#[derive(Debug)]
pub struct WriteReporter {
    tx: oneshot::Sender<WriteOutcome>,
}

impl WriteReporter {
    /// Report the outcome. Ignored when the ticket was dropped.
    pub fn report(self, outcome: WriteOutcome) {
        let _ = self.tx.send(outcome);
    }
}

impl WriteTicket {
    /// Create a ticket whose outcome will be reported later.
    pub fn pending() -> (WriteReporter, Self) {
        let (tx, rx) = oneshot::channel();
        (WriteReporter { tx }, Self { rx })
    }

    /// Create a ticket that is already resolved.
    pub fn ready(outcome: WriteOutcome) -> Self {
        let (reporter, ticket) = Self::pending();
        reporter.report(outcome);
        ticket
    }

    /// Ticket for a write that had nothing to do.
    pub fn skipped() -> Self {
        Self::ready(WriteOutcome::Skipped)
    }

    /// Wait for the outcome of the write.
    pub async fn outcome(self) -> WriteOutcome {
        self.rx
            .await
            .unwrap_or(WriteOutcome::Failed(StorageError::Cancelled))
    }

    /// Check for an outcome without waiting.
    pub fn try_outcome(&mut self) -> Option<WriteOutcome> {
        match self.rx.try_recv() {
            Ok(outcome) => Some(outcome),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Closed) => Some(WriteOutcome::Failed(StorageError::Cancelled)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ready_ticket_resolves_immediately() {
        let mut ticket = WriteTicket::ready(WriteOutcome::Persisted);
        assert!(ticket.try_outcome().is_some_and(|outcome| outcome.is_persisted()));
    }

    #[test]
    fn pending_ticket_waits_for_reporter() {
        let (reporter, mut ticket) = WriteTicket::pending();
        assert!(ticket.try_outcome().is_none());
        reporter.report(WriteOutcome::Skipped);
        assert!(matches!(ticket.try_outcome(), Some(WriteOutcome::Skipped)));
    }

    #[test]
    fn dropped_reporter_cancels_ticket() {
        let (reporter, mut ticket) = WriteTicket::pending();
        drop(reporter);
        assert!(matches!(
            ticket.try_outcome(),
            Some(WriteOutcome::Failed(StorageError::Cancelled))
        ));
    }

    #[tokio::test]
    async fn outcome_awaits_report() {
        let (reporter, ticket) = WriteTicket::pending();
        tokio::spawn(async move {
            reporter.report(WriteOutcome::Failed(StorageError::Unavailable("offline".into())));
        });
        let outcome = ticket.outcome().await;
        assert!(outcome.is_failed());
        assert!(matches!(outcome.error(), Some(StorageError::Unavailable(_))));
    }
}
