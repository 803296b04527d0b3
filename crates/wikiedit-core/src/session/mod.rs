//! Session aggregate: everything that lives for exactly one activation.

mod lifecycle;
mod page;
mod pending;

pub use lifecycle::Lifecycle;
pub use page::{PageMetadata, PageState};
pub use pending::{OperationKind, PendingOperations};

use crate::document::{Document, DocumentSnapshot, EditMode, Section, SnapshotId};
use crate::remote::{CaptchaInfo, CheckboxDef, LinkInfo, LoadResponse};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Concurrency-control tokens captured at load time.
///
/// Sent back unchanged with every save so the server can detect conflicting
/// edits. Only a load replaces them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevisionTokens {
    pub revision_id: Option<u64>,
    pub etag: Option<String>,
    pub base_timestamp: Option<String>,
    pub start_timestamp: Option<String>,
}

impl RevisionTokens {
    pub fn from_load(response: &LoadResponse) -> Self {
        Self {
            revision_id: response.revision_id,
            etag: response.etag.clone(),
            base_timestamp: response.base_timestamp.clone(),
            start_timestamp: response.start_timestamp.clone(),
        }
    }
}

/// Known link targets reported with the loaded content.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkCache {
    missing: HashSet<String>,
    known: HashSet<String>,
    assume_existence: bool,
}

impl LinkCache {
    pub fn absorb(&mut self, links: &LinkInfo) {
        self.missing.extend(links.missing.iter().cloned());
        match &links.known {
            crate::remote::KnownLinks::All => self.assume_existence = true,
            crate::remote::KnownLinks::Titles(titles) => {
                self.known.extend(titles.iter().cloned());
            }
        }
    }

    /// Stop treating unlisted titles as existing. Called once the surface is ready.
    pub fn stop_assuming_existence(&mut self) {
        self.assume_existence = false;
    }

    /// `Some(true)` for a known-missing title, `Some(false)` for a known one.
    pub fn is_missing(&self, title: &str) -> Option<bool> {
        if self.missing.contains(title) {
            Some(true)
        } else if self.assume_existence || self.known.contains(title) {
            Some(false)
        } else {
            None
        }
    }
}

/// Review output shown in the save dialog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReviewContent {
    Diff(String),
    NoChanges,
    Wikitext(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedReview {
    pub snapshot: SnapshotId,
    pub content: ReviewContent,
}

#[derive(Debug)]
pub struct Session {
    pub mode: EditMode,
    pub section: Section,
    document: Option<Document>,
    tokens: RevisionTokens,
    pub edited: bool,
    pub from_edited_state: bool,
    pub notices: Vec<String>,
    pub checkboxes: Vec<CheckboxDef>,
    pub protected_classes: Option<String>,
    pub links: LinkCache,
    pub captcha: Option<CaptchaInfo>,
    review: Option<CachedReview>,
    /// Heading typed for a new section.
    pub section_title: Option<String>,
    pub scroll_top: Option<u32>,
    pub retried_revision_mismatch: bool,
    /// Loading the alternate mode after a failed load.
    pub fallback_loading: bool,
    pub summary_warning_shown: bool,
    /// Set once both the content and the toolbar are ready.
    pub ready: bool,
    pub pending: PendingOperations,
}

impl Session {
    pub fn new(mode: EditMode, section: Section) -> Self {
        Self {
            mode,
            section,
            document: Some(Document::placeholder(mode)),
            tokens: RevisionTokens::default(),
            edited: false,
            from_edited_state: false,
            notices: Vec::new(),
            checkboxes: Vec::new(),
            protected_classes: None,
            links: LinkCache::default(),
            captcha: None,
            review: None,
            section_title: None,
            scroll_top: None,
            retried_revision_mismatch: false,
            fallback_loading: false,
            summary_warning_shown: false,
            ready: false,
            pending: PendingOperations::new(),
        }
    }

    pub fn document(&self) -> Option<&Document> {
        self.document.as_ref()
    }

    pub fn snapshot(&self) -> Option<DocumentSnapshot> {
        self.document.as_ref().map(Document::snapshot)
    }

    pub fn snapshot_id(&self) -> Option<SnapshotId> {
        self.document.as_ref().map(Document::snapshot_id)
    }

    pub fn tokens(&self) -> &RevisionTokens {
        &self.tokens
    }

    /// Installs freshly loaded content, replacing the previous document wholesale.
    pub fn install_load(&mut self, document: Document, response: &LoadResponse) {
        self.mode = document.mode();
        self.document = Some(document);
        self.tokens = RevisionTokens::from_load(response);
        self.checkboxes = response.checkboxes.clone();
        self.protected_classes = response.protected_classes.clone();
        self.links.absorb(&response.links);
        self.from_edited_state = self.from_edited_state || response.from_edited_state;
        self.review = None;
        self.ready = false;
    }

    /// Applies a user edit. Returns the superseded snapshot.
    pub fn edit_document(&mut self, content: impl Into<std::sync::Arc<str>>) -> Option<SnapshotId> {
        let document = self.document.as_mut()?;
        let previous = document.snapshot_id();
        document.replace_content(content);
        self.edited = true;
        self.review = None;
        Some(previous)
    }

    /// Drops the live document. Used on teardown and before a mode switch.
    pub fn take_document(&mut self) -> Option<Document> {
        self.review = None;
        self.document.take()
    }

    pub fn cached_review(&self) -> Option<&ReviewContent> {
        let current = self.snapshot_id()?;
        self.review
            .as_ref()
            .filter(|r| r.snapshot == current)
            .map(|r| &r.content)
    }

    pub fn cache_review(&mut self, snapshot: SnapshotId, content: ReviewContent) {
        if self.snapshot_id() == Some(snapshot) {
            self.review = Some(CachedReview { snapshot, content });
        }
    }

    pub fn clear_review(&mut self) {
        self.review = None;
    }
}
