use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Portion of the page an activation edits. Fixed for one activation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Section {
    #[default]
    Whole,
    Index(u32),
    New,
}

impl Section {
    /// Value for the `section` request/URL parameter.
    pub fn as_param(&self) -> Option<String> {
        match self {
            Self::Whole => None,
            Self::Index(n) => Some(n.to_string()),
            Self::New => Some("new".to_string()),
        }
    }

    pub fn from_param(value: Option<&str>) -> Option<Self> {
        match value {
            None | Some("") => Some(Self::Whole),
            Some(v) => v.parse().ok(),
        }
    }

    pub fn is_whole(&self) -> bool {
        matches!(self, Self::Whole)
    }

    pub fn is_new(&self) -> bool {
        matches!(self, Self::New)
    }
}

impl FromStr for Section {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new" => Ok(Self::New),
            other => other
                .parse::<u32>()
                .map(Self::Index)
                .map_err(|_| format!("invalid section: {other}")),
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Whole => f.write_str("whole"),
            Self::Index(n) => write!(f, "{n}"),
            Self::New => f.write_str("new"),
        }
    }
}
