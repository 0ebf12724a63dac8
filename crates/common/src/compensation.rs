//! Compensating actions for mutations spanning both stores.
//!
//! The metadata store and the ciphertext store share no transaction, so a
//! multi-step mutation is made reversible by hand: before each step runs, the
//! action that undoes it is registered with a [`Compensator`]. On failure the
//! registered actions run newest-first. This approximates a rollback; it is
//! not atomic; a concurrent reader may observe intermediate state.
//!
//! If an inverse action itself fails the stores may disagree. That surfaces as
//! [`VaultError::CompensationFailed`] and needs an operator.

use std::future::Future;

use futures::future::BoxFuture;
use futures::FutureExt;

use crate::error::{InverseFailures, Result, VaultError};

type Inverse = Box<dyn FnOnce() -> BoxFuture<'static, Result<()>> + Send>;

/// One operation's list of inverse actions.
pub struct Compensator {
    op: &'static str,
    inverses: Vec<(String, Inverse)>,
}

impl std::fmt::Debug for Compensator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Compensator")
            .field("op", &self.op)
            .field(
                "inverses",
                &self.inverses.iter().map(|(l, _)| l).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl Compensator {
    pub fn new(op: &'static str) -> Self {
        Self {
            op,
            inverses: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.inverses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inverses.is_empty()
    }

    /// Register the action undoing a mutation that is about to run.
    pub fn add<F, Fut>(&mut self, label: impl Into<String>, inverse: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let label = label.into();
        tracing::debug!("{}: registered inverse '{}'", self.op, label);
        self.inverses.push((label, Box::new(move || inverse().boxed())));
    }

    /// Register `inverse`, then run `mutation`.
    ///
    /// When the mutation fails in a way that is known to have changed nothing
    /// (see [`VaultError::is_definite_no_op`]) its inverse is dropped again, so
    /// an unwind cannot undo somebody else's record. Any other failure keeps
    /// the inverse, since the mutation may have partially applied.
    pub async fn step<T, F, Fut, M>(
        &mut self,
        label: impl Into<String>,
        inverse: F,
        mutation: M,
    ) -> Result<T>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
        M: Future<Output = Result<T>>,
    {
        self.add(label, inverse);
        match mutation.await {
            Ok(value) => Ok(value),
            Err(err) => {
                if err.is_definite_no_op() {
                    self.inverses.pop();
                }
                Err(err)
            }
        }
    }

    /// Run every inverse newest-first, then return `cause`, wrapped in
    /// [`VaultError::CompensationFailed`] if any inverse failed.
    ///
    /// Every inverse runs even after one of them fails.
    pub async fn unwind(self, cause: VaultError) -> VaultError {
        if self.inverses.is_empty() {
            return cause;
        }

        tracing::warn!(
            "{} failed, unwinding {} step(s): {}",
            self.op,
            self.inverses.len(),
            cause
        );

        let mut failures = Vec::new();
        for (label, inverse) in self.inverses.into_iter().rev() {
            match inverse().await {
                Ok(()) => tracing::debug!("{}: inverse '{}' applied", self.op, label),
                Err(err) => {
                    tracing::error!("{}: inverse '{}' failed: {}", self.op, label, err);
                    failures.push((label, err));
                }
            }
        }

        if failures.is_empty() {
            return cause;
        }

        let err = VaultError::CompensationFailed {
            cause: Box::new(cause),
            failures: InverseFailures(failures),
        };
        tracing::error!("{}: stores may be inconsistent: {}", self.op, err);
        err
    }

    /// Keep the mutations on success, unwind on failure.
    pub async fn finish<T>(self, result: Result<T>) -> Result<T> {
        match result {
            Ok(value) => {
                tracing::debug!("{} committed after {} step(s)", self.op, self.len());
                Ok(value)
            }
            Err(err) => Err(self.unwind(err).await),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use parking_lot::Mutex;

    use super::*;

    fn record(
        log: &Arc<Mutex<Vec<&'static str>>>,
        entry: &'static str,
    ) -> impl FnOnce() -> BoxFuture<'static, Result<()>> {
        let log = log.clone();
        move || {
            async move {
                log.lock().push(entry);
                Ok(())
            }
            .boxed()
        }
    }

    #[tokio::test]
    async fn test_unwind_runs_in_reverse() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut scope = Compensator::new("test");
        scope.add("one", record(&log, "one"));
        scope.add("two", record(&log, "two"));
        scope.add("three", record(&log, "three"));

        let err = scope.unwind(VaultError::NotFound("x".into())).await;
        assert!(matches!(err, VaultError::NotFound(_)));
        assert_eq!(*log.lock(), vec!["three", "two", "one"]);
    }

    #[tokio::test]
    async fn test_failed_inverse_does_not_stop_the_rest() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut scope = Compensator::new("test");
        scope.add("one", record(&log, "one"));
        scope.add("broken", || async {
            Err(VaultError::Forbidden("store unreachable".into()))
        });
        scope.add("three", record(&log, "three"));

        let err = scope
            .unwind(VaultError::Cancelled("deadline exceeded".into()))
            .await;
        assert_eq!(*log.lock(), vec!["three", "one"]);

        match err {
            VaultError::CompensationFailed { cause, failures } => {
                assert!(matches!(*cause, VaultError::Cancelled(_)));
                assert_eq!(failures.labels().collect::<Vec<_>>(), vec!["broken"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_step_drops_inverse_of_a_no_op() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut scope = Compensator::new("test");

        scope
            .step("first", record(&log, "first"), async { Ok(()) })
            .await
            .unwrap();
        let err = scope
            .step("taken", record(&log, "taken"), async {
                Err::<(), _>(VaultError::AlreadyExists("key".into()))
            })
            .await
            .unwrap_err();
        assert_eq!(scope.len(), 1);

        scope.unwind(err).await;
        assert_eq!(*log.lock(), vec!["first"]);
    }

    #[tokio::test]
    async fn test_step_keeps_inverse_of_a_partial_failure() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut scope = Compensator::new("test");
        let err = scope
            .step("write", record(&log, "write"), async {
                Err::<(), _>(VaultError::Unauthorized("connection reset".into()))
            })
            .await
            .unwrap_err();
        assert_eq!(scope.len(), 1);

        scope.unwind(err).await;
        assert_eq!(*log.lock(), vec!["write"]);
    }

    #[tokio::test]
    async fn test_finish_commits_on_success() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut scope = Compensator::new("test");
        scope.add("one", record(&log, "one"));

        assert_eq!(scope.finish(Ok(5)).await.unwrap(), 5);
        assert!(log.lock().is_empty());
    }
}
