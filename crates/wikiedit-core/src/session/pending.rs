use crate::error::{EditError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use strum::{Display, EnumIter};
use tokio_util::sync::CancellationToken;

/// Kinds of remote work a session can have outstanding.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter,
)]
#[strum(serialize_all = "lowercase")]
pub enum OperationKind {
    Load,
    Save,
    Diff,
    Serialize,
    Submit,
}

/// Per-kind in-flight guards.
///
/// Each kind is mutually exclusive with itself only. A second `try_begin` of
/// the same kind is rejected, never queued.
#[derive(Debug, Default)]
pub struct PendingOperations {
    in_flight: HashSet<OperationKind>,
    load_abort: Option<CancellationToken>,
}

impl PendingOperations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_begin(&mut self, kind: OperationKind) -> Result<()> {
        if self.in_flight.insert(kind) {
            Ok(())
        } else {
            Err(EditError::OperationInProgress(kind))
        }
    }

    /// Starts a load and returns the token that aborts it.
    pub fn begin_load(&mut self) -> Result<CancellationToken> {
        self.try_begin(OperationKind::Load)?;
        let token = CancellationToken::new();
        self.load_abort = Some(token.clone());
        Ok(token)
    }

    pub fn finish(&mut self, kind: OperationKind) {
        self.in_flight.remove(&kind);
        if kind == OperationKind::Load {
            self.load_abort = None;
        }
    }

    /// Ends the load started with `token`.
    ///
    /// An aborted token is a no-op: whoever aborted it already released the
    /// guard, and a newer load may hold it by now.
    pub fn finish_load(&mut self, token: &CancellationToken) {
        if !token.is_cancelled() {
            self.finish(OperationKind::Load);
        }
    }

    pub fn is_pending(&self, kind: OperationKind) -> bool {
        self.in_flight.contains(&kind)
    }

    pub fn is_idle(&self) -> bool {
        self.in_flight.is_empty()
    }

    /// Cancels the outstanding load, if any.
    pub fn abort_load(&mut self) {
        if let Some(token) = self.load_abort.take() {
            token.cancel();
        }
        self.in_flight.remove(&OperationKind::Load);
    }

    pub fn clear(&mut self) {
        self.abort_load();
        self.in_flight.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_same_kind_is_rejected() {
        let mut pending = PendingOperations::new();
        pending.try_begin(OperationKind::Save).unwrap();
        assert_eq!(
            pending.try_begin(OperationKind::Save),
            Err(EditError::OperationInProgress(OperationKind::Save))
        );
        pending.finish(OperationKind::Save);
        assert!(pending.try_begin(OperationKind::Save).is_ok());
    }

    #[test]
    fn test_different_kinds_run_together() {
        let mut pending = PendingOperations::new();
        for kind in OperationKind::iter() {
            pending.try_begin(kind).unwrap();
        }
        assert!(pending.is_pending(OperationKind::Diff));
        pending.clear();
        assert!(pending.is_idle());
    }

    #[test]
    fn test_aborted_load_leaves_newer_load_alone() {
        let mut pending = PendingOperations::new();
        let stale = pending.begin_load().unwrap();
        pending.abort_load();
        let current = pending.begin_load().unwrap();

        pending.finish_load(&stale);
        assert!(pending.is_pending(OperationKind::Load));
        assert!(!current.is_cancelled());

        pending.finish_load(&current);
        assert!(!pending.is_pending(OperationKind::Load));
    }

    #[test]
    fn test_abort_load_cancels_token() {
        let mut pending = PendingOperations::new();
        let token = pending.begin_load().unwrap();
        pending.abort_load();
        assert!(token.is_cancelled());
        assert!(!pending.is_pending(OperationKind::Load));
    }
}
