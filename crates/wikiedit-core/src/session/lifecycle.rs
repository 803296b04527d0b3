use crate::error::{EditError, Result};
use serde::{Deserialize, Serialize};
use strum::Display;

/// Authoritative lifecycle of the editor on one page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display)]
#[strum(serialize_all = "lowercase")]
pub enum Lifecycle {
    #[default]
    Inactive,
    Activating,
    Active,
    Deactivating,
}

impl Lifecycle {
    /// Whether `self -> next` is an edge of the lifecycle graph.
    ///
    /// `Active -> Activating` is the reload path used by mode switches; the
    /// session identity is kept and only the document is replaced.
    pub fn can_transition_to(self, next: Lifecycle) -> bool {
        use Lifecycle::*;
        matches!(
            (self, next),
            (Inactive, Activating)
                | (Activating, Active)
                | (Activating, Deactivating)
                | (Active, Deactivating)
                | (Active, Activating)
                | (Deactivating, Inactive)
        )
    }

    pub fn transition(self, next: Lifecycle, operation: &'static str) -> Result<Lifecycle> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(EditError::InvalidLifecycle {
                operation,
                state: self,
            })
        }
    }

    /// Active or on the way there.
    pub fn is_engaged(self) -> bool {
        matches!(self, Lifecycle::Activating | Lifecycle::Active)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_cycle_is_allowed() {
        let mut state = Lifecycle::Inactive;
        for next in [
            Lifecycle::Activating,
            Lifecycle::Active,
            Lifecycle::Deactivating,
            Lifecycle::Inactive,
        ] {
            state = state.transition(next, "cycle").unwrap();
        }
        assert_eq!(state, Lifecycle::Inactive);
    }

    #[test]
    fn test_skipping_states_is_rejected() {
        assert!(!Lifecycle::Inactive.can_transition_to(Lifecycle::Active));
        assert!(!Lifecycle::Inactive.can_transition_to(Lifecycle::Deactivating));
        assert!(!Lifecycle::Deactivating.can_transition_to(Lifecycle::Active));

        let err = Lifecycle::Deactivating
            .transition(Lifecycle::Activating, "activate")
            .unwrap_err();
        assert_eq!(err.to_string(), "Cannot activate while deactivating");
    }
}
