//! The loaded content artifact and its snapshot identity.
//!
//! The document body itself is opaque to the controller: HTML in visual mode,
//! wikitext in source mode. What the controller cares about is identity. Every
//! mutation bumps `version`, and a [`SnapshotId`] of `(id, version)` is what
//! cache keys and cached diffs are bound to.

mod section;

pub use section::Section;

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, LazyLock};
use strum::{Display, EnumString};
use uuid::Uuid;

/// Maximum characters of heading text copied into a section edit summary.
pub const SECTION_SUMMARY_MAX_CHARS: usize = 244;

static ABOUT_ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)^\s*(?:<!doctype[^>]*>\s*)?<html\b[^>]*?\babout\s*=\s*"([^"]*)""#)
        .expect("about attribute pattern")
});
static REVISION_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"revision/([0-9]*)$").expect("revision pattern"));
static HTML_HEADING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<h[1-6]\b[^>]*>(.*?)</h[1-6]\s*>").expect("html heading pattern")
});
static HTML_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("html tag pattern"));
static WIKITEXT_HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*=+\s*(.*?)\s*=+\s*$").expect("wikitext heading pattern"));

/// Editing surface flavour.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum EditMode {
    #[default]
    Visual,
    Source,
}

impl EditMode {
    pub fn other(self) -> Self {
        match self {
            Self::Visual => Self::Source,
            Self::Source => Self::Visual,
        }
    }

    /// Value of the `veaction` URL parameter for this mode.
    pub fn veaction(self) -> &'static str {
        match self {
            Self::Visual => "edit",
            Self::Source => "editsource",
        }
    }

    pub fn from_veaction(value: &str) -> Option<Self> {
        match value {
            "edit" => Some(Self::Visual),
            "editsource" => Some(Self::Source),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentId(Uuid);

impl DocumentId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Identity of one version of one document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SnapshotId {
    pub document: DocumentId,
    pub version: u64,
}

/// Immutable view of a document at a given version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentSnapshot {
    pub id: SnapshotId,
    pub mode: EditMode,
    pub content: Arc<str>,
}

#[derive(Debug, Clone)]
pub struct Document {
    id: DocumentId,
    version: u64,
    mode: EditMode,
    content: Arc<str>,
}

impl Document {
    pub fn new(mode: EditMode, content: impl Into<Arc<str>>) -> Self {
        Self {
            id: DocumentId::new(),
            version: 0,
            mode,
            content: content.into(),
        }
    }

    /// Disabled stand-in shown while the real content loads.
    pub fn placeholder(mode: EditMode) -> Self {
        Self::new(mode, "")
    }

    pub fn id(&self) -> DocumentId {
        self.id
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn mode(&self) -> EditMode {
        self.mode
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn snapshot_id(&self) -> SnapshotId {
        SnapshotId {
            document: self.id,
            version: self.version,
        }
    }

    pub fn snapshot(&self) -> DocumentSnapshot {
        DocumentSnapshot {
            id: self.snapshot_id(),
            mode: self.mode,
            content: Arc::clone(&self.content),
        }
    }

    /// Replaces the content and bumps the version. Returns the new snapshot id.
    pub fn replace_content(&mut self, content: impl Into<Arc<str>>) -> SnapshotId {
        self.content = content.into();
        self.version += 1;
        self.snapshot_id()
    }

    /// Revision id embedded in the root element's `about` attribute.
    ///
    /// Only meaningful for visual-mode HTML. Looks like
    /// `http://en.wikipedia.org/wiki/Special:Redirect/revision/1234`.
    pub fn embedded_revision_id(&self) -> Option<u64> {
        if self.mode != EditMode::Visual {
            return None;
        }
        let about = ABOUT_ATTR.captures(&self.content)?.get(1)?.as_str();
        REVISION_SUFFIX
            .captures(about)?
            .get(1)?
            .as_str()
            .parse()
            .ok()
    }

    /// Text of the heading opening `section`, if any.
    ///
    /// Visual mode picks the n-th heading element of the full document (section
    /// numbering is 1-based). Source mode loads only the section, so its first
    /// line is the heading.
    pub fn section_heading(&self, section: Section) -> Option<String> {
        let Section::Index(index) = section else {
            return None;
        };
        if index == 0 {
            return None;
        }
        let text = match self.mode {
            EditMode::Visual => {
                let inner = HTML_HEADING
                    .captures_iter(&self.content)
                    .nth(index as usize - 1)?
                    .get(1)?
                    .as_str();
                HTML_TAG.replace_all(inner, "").trim().to_string()
            }
            EditMode::Source => {
                let first = self.content.lines().next()?;
                WIKITEXT_HEADING.replace(first, "$1").trim().to_string()
            }
        };
        (!text.is_empty()).then_some(text)
    }
}

/// Builds `/* heading */ ` the way section edit summaries are prefilled.
pub fn section_summary(heading: &str) -> String {
    let truncated: String = heading.chars().take(SECTION_SUMMARY_MAX_CHARS).collect();
    format!("/* {truncated} */ ")
}
