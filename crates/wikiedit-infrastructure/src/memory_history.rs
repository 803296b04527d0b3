use std::sync::{Mutex, MutexGuard, PoisonError};
use wikiedit_core::history::{HistoryBackend, HistoryState, PageParams};

/// History entry as stored by [`MemoryHistory`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub state: Option<HistoryState>,
    pub params: PageParams,
}

/// Session history kept in memory, with a cursor for back/forward.
#[derive(Debug)]
pub struct MemoryHistory {
    inner: Mutex<Entries>,
}

#[derive(Debug)]
struct Entries {
    entries: Vec<HistoryEntry>,
    cursor: usize,
}

impl MemoryHistory {
    /// Starts with one untagged entry for `initial`.
    pub fn new(initial: PageParams) -> Self {
        Self {
            inner: Mutex::new(Entries {
                entries: vec![HistoryEntry {
                    state: None,
                    params: initial,
                }],
                cursor: 0,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Entries> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn entries(&self) -> Vec<HistoryEntry> {
        self.lock().entries.clone()
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    /// Moves the cursor back and returns the entry a pop event would carry.
    pub fn back(&self) -> Option<HistoryEntry> {
        let mut inner = self.lock();
        inner.cursor = inner.cursor.checked_sub(1)?;
        inner.entries.get(inner.cursor).cloned()
    }

    pub fn forward(&self) -> Option<HistoryEntry> {
        let mut inner = self.lock();
        let next = inner.cursor + 1;
        let entry = inner.entries.get(next).cloned()?;
        inner.cursor = next;
        Some(entry)
    }
}

impl HistoryBackend for MemoryHistory {
    fn current(&self) -> PageParams {
        let inner = self.lock();
        inner
            .entries
            .get(inner.cursor)
            .map(|e| e.params.clone())
            .unwrap_or_default()
    }

    fn push_state(&self, state: HistoryState, params: PageParams) {
        let mut inner = self.lock();
        let keep = inner.cursor + 1;
        inner.entries.truncate(keep);
        inner.entries.push(HistoryEntry {
            state: Some(state),
            params,
        });
        inner.cursor = inner.entries.len() - 1;
    }

    fn replace_state(&self, state: HistoryState, params: PageParams) {
        let mut inner = self.lock();
        let cursor = inner.cursor;
        if let Some(entry) = inner.entries.get_mut(cursor) {
            *entry = HistoryEntry {
                state: Some(state),
                params,
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_truncates_forward_entries() {
        let history = MemoryHistory::new(PageParams::new("Test"));
        history.push_state(
            HistoryState::editor(),
            PageParams::new("Test").with("veaction", "edit"),
        );
        history.push_state(HistoryState::editor(), PageParams::new("Test"));
        assert_eq!(history.len(), 3);

        let back = history.back().unwrap();
        assert_eq!(back.params.get("veaction"), Some("edit"));

        history.push_state(
            HistoryState::editor(),
            PageParams::new("Test").with("veaction", "editsource"),
        );
        assert_eq!(history.len(), 3);
        assert!(history.forward().is_none());
    }

    #[test]
    fn test_replace_state_tags_current_entry() {
        let history = MemoryHistory::new(PageParams::new("Test"));
        history.replace_state(HistoryState::editor(), history.current());

        let entries = history.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].state, Some(HistoryState::editor()));
        assert!(history.back().is_none());
    }
}
