use serde::{Deserialize, Serialize};

/// Page facts provided by the host when the editor is constructed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMetadata {
    pub title: String,
    pub exists: bool,
    pub current_revision_id: Option<u64>,
    /// Explicit `oldid` being viewed, if any.
    pub requested_revision_id: Option<u64>,
    pub edit_token: Option<String>,
}

/// State of the page that outlives individual editing sessions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageState {
    pub page_name: String,
    pub page_exists: bool,
    pub current_revision_id: Option<u64>,
    pub requested_revision_id: Option<u64>,
    /// Revision the next save is based on.
    pub revision_id: Option<u64>,
    /// Editing an old revision. Saving is allowed even without changes.
    pub restoring: bool,
    pub edit_token: Option<String>,
    /// User continued past a page-deleted warning.
    pub recreating: bool,
    pub page_deleted_warning: bool,
    pub initial_edit_summary: Option<String>,
}

impl PageState {
    pub fn from_metadata(metadata: &PageMetadata) -> Self {
        let restoring = metadata.requested_revision_id.is_some()
            && metadata.requested_revision_id != metadata.current_revision_id;
        Self {
            page_name: metadata.title.clone(),
            page_exists: metadata.exists,
            current_revision_id: metadata.current_revision_id,
            requested_revision_id: metadata.requested_revision_id,
            revision_id: metadata
                .requested_revision_id
                .or(metadata.current_revision_id),
            restoring,
            edit_token: metadata.edit_token.clone(),
            recreating: false,
            page_deleted_warning: false,
            initial_edit_summary: None,
        }
    }

    /// Revision to ask the load endpoint for.
    pub fn load_revision(&self) -> Option<u64> {
        self.requested_revision_id
    }

    /// Records a successful save.
    pub fn record_save(&mut self, new_revision_id: Option<u64>) {
        if let Some(id) = new_revision_id {
            self.revision_id = Some(id);
            self.current_revision_id = Some(id);
            self.requested_revision_id = None;
            self.restoring = false;
        }
        self.page_exists = true;
        self.recreating = false;
        self.page_deleted_warning = false;
    }
}
