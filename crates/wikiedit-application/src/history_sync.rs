//! Keeps browser history in step with the editor.
//!
//! Every entry the editor creates carries [`HistoryState::editor`]. Back and
//! forward only drive editor transitions for entries with that marker.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;
use wikiedit_core::document::{EditMode, Section};
use wikiedit_core::history::{HistoryBackend, HistoryState, PageParams};
use wikiedit_core::session::Lifecycle;

/// Transition a history pop asks the controller to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationIntent {
    Activate { mode: EditMode, section: Section },
    SwitchMode(EditMode),
    Deactivate,
}

pub struct HistorySyncAdapter {
    backend: Arc<dyn HistoryBackend>,
    single_edit_tab: bool,
    /// The transition in progress replays a pop; it must not push again.
    act_from_pop: AtomicBool,
}

impl HistorySyncAdapter {
    pub fn new(backend: Arc<dyn HistoryBackend>, single_edit_tab: bool) -> Self {
        Self {
            backend,
            single_edit_tab,
            act_from_pop: AtomicBool::new(false),
        }
    }

    /// Tags the current entry so returning to it is recognised.
    pub fn install(&self) {
        self.backend
            .replace_state(HistoryState::editor(), self.backend.current());
    }

    pub fn current_params(&self) -> PageParams {
        self.backend.current()
    }

    /// Records entering `mode` on `section`.
    pub fn push_edit_state(&self, mode: EditMode, section: Section) {
        if self.act_from_pop.swap(false, Ordering::SeqCst) {
            return;
        }
        let params = self.edit_params(mode, section);
        if params == self.backend.current() {
            return;
        }
        debug!(?mode, ?section, "Pushing edit history entry");
        self.backend.push_state(HistoryState::editor(), params);
    }

    /// Records returning to read mode.
    ///
    /// `oldid` is kept while restoring an old revision; `action` is kept when
    /// the classic editor owns it.
    pub fn restore_read_state(&self, restoring: bool, has_classic_editor: bool) {
        if self.act_from_pop.swap(false, Ordering::SeqCst) {
            return;
        }
        let mut params = self.backend.current();
        params.remove("veaction");
        params.remove("section");
        if !has_classic_editor || self.single_edit_tab {
            params.remove("action");
        }
        if !restoring {
            params.remove("oldid");
        }
        self.backend.push_state(HistoryState::editor(), params);
    }

    /// Drops a replay guard the last transition did not consume.
    pub fn clear_pop_guard(&self) {
        self.act_from_pop.store(false, Ordering::SeqCst);
    }

    /// Maps a history pop to a transition.
    ///
    /// Returns `None` for foreign entries and for pops that need no change.
    pub fn on_pop(
        &self,
        state: Option<&HistoryState>,
        params: &PageParams,
        lifecycle: Lifecycle,
        current_mode: Option<EditMode>,
        source_available: bool,
    ) -> Option<NavigationIntent> {
        if !state.is_some_and(HistoryState::is_editor) {
            debug!("Ignoring foreign history entry");
            return None;
        }

        let target = self
            .mode_in(params)
            .filter(|m| *m != EditMode::Source || source_available);
        let intent = match (lifecycle, target) {
            (Lifecycle::Active, Some(mode)) if Some(mode) != current_mode => {
                Some(NavigationIntent::SwitchMode(mode))
            }
            (Lifecycle::Inactive, Some(mode)) => Some(NavigationIntent::Activate {
                mode,
                section: params.section().unwrap_or_default(),
            }),
            (Lifecycle::Active | Lifecycle::Activating, None) => {
                Some(NavigationIntent::Deactivate)
            }
            _ => None,
        };
        if intent.is_some() {
            self.act_from_pop.store(true, Ordering::SeqCst);
        }
        intent
    }

    fn mode_in(&self, params: &PageParams) -> Option<EditMode> {
        params.edit_mode().or_else(|| {
            (self.single_edit_tab && params.get("action") == Some("edit"))
                .then_some(EditMode::default())
        })
    }

    fn edit_params(&self, mode: EditMode, section: Section) -> PageParams {
        let mut params = self.backend.current();
        if self.single_edit_tab {
            params.set("action", "edit");
            params.remove("veaction");
        } else {
            params.set("veaction", mode.veaction());
            params.remove("action");
        }
        match section.as_param() {
            Some(value) => params.set("section", value),
            None => {
                params.remove("section");
            }
        }
        params
    }
}
