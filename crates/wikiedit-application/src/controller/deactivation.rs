use super::EditSessionController;
use tracing::{debug, info};
use wikiedit_core::error::Result;
use wikiedit_core::presentation::ConfirmPrompt;
use wikiedit_core::session::{Lifecycle, OperationKind};

impl EditSessionController {
    /// Leaves the editor and returns the page to read mode.
    ///
    /// # Arguments
    ///
    /// * `skip_confirmation` - Close without asking about unsaved edits
    /// * `mechanism` - How the user left, reported with the abort event
    ///
    /// # Returns
    ///
    /// `true` once the editor is torn down. `false` when it was not open,
    /// was already closing, or the user chose to keep editing.
    ///
    /// # Errors
    ///
    /// Returns an error if the lifecycle cannot move to `Deactivating`.
    pub async fn deactivate(
        &self,
        skip_confirmation: bool,
        mechanism: Option<&str>,
    ) -> Result<bool> {
        let (lifecycle, edited) = {
            let state = self.inner.state.read().await;
            (
                state.lifecycle,
                state.session.as_ref().is_some_and(|s| s.edited),
            )
        };
        if !lifecycle.is_engaged() {
            return Ok(false);
        }

        let needs_confirmation = !skip_confirmation && lifecycle == Lifecycle::Active && edited;
        if needs_confirmation
            && !self
                .inner
                .presentation
                .confirm(ConfirmPrompt::DiscardChanges)
                .await
        {
            debug!("Discard declined, staying in the editor");
            return Ok(false);
        }

        self.teardown(mechanism.unwrap_or("cancel")).await
    }

    async fn teardown(&self, mechanism: &str) -> Result<bool> {
        let (abort_type, restoring, original_double_click) = {
            let mut state = self.inner.state.write().await;
            if !state.lifecycle.is_engaged() {
                return Ok(false);
            }
            let abort_type = match (&state.lifecycle, state.session.as_ref()) {
                (Lifecycle::Activating, _) | (_, None) => "preinit",
                (_, Some(s)) if s.pending.is_pending(OperationKind::Save) => "abandonMidsave",
                (_, Some(s)) if s.edited => "abandon",
                _ => "nochange",
            };
            state.lifecycle = state
                .lifecycle
                .transition(Lifecycle::Deactivating, "deactivate")?;
            state.activation_cancel.cancel();
            if let Some(session) = state.session.as_mut() {
                session.pending.abort_load();
            }
            (
                abort_type,
                state.page.restoring,
                state.original_edit_on_double_click.take(),
            )
        };
        track!("mwedit.abort", abort_type, mechanism);

        let presentation = &self.inner.presentation;
        presentation.close_dialogs();
        presentation.exit_edit_mode().await;
        self.inner
            .history
            .restore_read_state(restoring, self.inner.host.has_classic_editor());
        self.inner.host.unbind_handlers();
        if let Some(enabled) = original_double_click {
            self.inner.host.set_edit_on_double_click(enabled);
        }
        presentation.set_unload_warning(None);
        presentation.hide_toolbar().await;
        self.inner.broker.invalidate().await;

        {
            let mut state = self.inner.state.write().await;
            if let Some(mut session) = state.session.take() {
                session.pending.clear();
            }
            state.page.initial_edit_summary = self.inner.host.preset_summary();
            state.activation = None;
            state.lifecycle = state
                .lifecycle
                .transition(Lifecycle::Inactive, "deactivate")?;
        }
        info!(abort_type, "Editor closed");
        Ok(true)
    }
}
