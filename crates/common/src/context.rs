//! Per-operation cancellation and deadlines.
//!
//! The lifecycle manager calls [`Context::check`] before every forward store
//! call. Inverse actions run during an unwind never check it: a cancelled
//! operation still has to put the stores back the way it found them.

use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;

use crate::error::VaultError;

#[derive(Debug, Clone, Default)]
pub struct Context {
    deadline: Option<Instant>,
    cancel: Option<watch::Receiver<bool>>,
    signal: Option<watch::Receiver<()>>,
}

/// Trips every [`Context`] derived from it.
#[derive(Debug)]
pub struct CancelHandle(watch::Sender<bool>);

impl CancelHandle {
    pub fn cancel(&self) {
        let _ = self.0.send(true);
    }
}

impl Context {
    /// A context that never expires and cannot be cancelled.
    pub fn background() -> Self {
        Self::default()
    }

    pub fn cancellable() -> (Self, CancelHandle) {
        let (tx, rx) = watch::channel(false);
        (
            Self {
                cancel: Some(rx),
                ..Self::default()
            },
            CancelHandle(tx),
        )
    }

    /// Any send on `signal` after this point, or the sender being dropped,
    /// counts as cancellation.
    pub fn with_signal(mut self, signal: watch::Receiver<()>) -> Self {
        self.signal = Some(signal);
        self
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(existing) => existing.min(deadline),
            None => deadline,
        });
        self
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_cancelled(&self) -> bool {
        let cancelled = self.cancel.as_ref().is_some_and(|rx| *rx.borrow());
        let signalled = self
            .signal
            .as_ref()
            .is_some_and(|rx| rx.has_changed().unwrap_or(true));
        cancelled || signalled
    }

    /// Fails with [`VaultError::Cancelled`] once cancelled or past the deadline.
    pub fn check(&self) -> Result<(), VaultError> {
        if self.is_cancelled() {
            return Err(VaultError::Cancelled("operation cancelled".into()));
        }
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                return Err(VaultError::Cancelled("deadline exceeded".into()));
            }
        }
        Ok(())
    }
}
