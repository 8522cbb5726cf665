//! Feed data types shared by the decoder, the state machine and renderers

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifies one checked source within a session (the feed's `classname`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemKey(String);

impl ItemKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ItemKey {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

/// One entry of the preparation record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnouncedItem {
    pub key: ItemKey,
    /// Human readable name of the source
    pub title: String,
}

/// What an archived link contains (`video`, `metadata`, `thumbnail`, ...)
///
/// Flag names are kept as sent so newer servers can add flags without a
/// client release.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentFlags(BTreeMap<String, bool>);

impl ContentFlags {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, flag: impl Into<String>, value: bool) -> Self {
        self.0.insert(flag.into(), value);
        self
    }

    /// Whether the flag is present and set
    pub fn has(&self, flag: &str) -> bool {
        self.0.get(flag).copied().unwrap_or(false)
    }

    /// Names of the flags that are set, in name order
    pub fn present(&self) -> impl Iterator<Item = &str> {
        self.0
            .iter()
            .filter(|(_, set)| **set)
            .map(|(name, _)| name.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.present().next().is_none()
    }
}

impl From<BTreeMap<String, bool>> for ContentFlags {
    fn from(flags: BTreeMap<String, bool>) -> Self {
        Self(flags)
    }
}

/// A link to archived material for one source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkEntry {
    pub url: String,
    pub title: String,
    pub note: Option<String>,
    pub contains: ContentFlags,
}

/// Outcome reported for one source
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub archived: bool,
    /// Only metadata (title, description, ...) was archived
    pub metaonly: bool,
    /// Comments were archived as well
    pub comments: bool,
    pub note: String,
    pub error: Option<String>,
    /// Single link sent by older feeds that predate link records
    pub available: Option<String>,
    pub links: Vec<LinkEntry>,
    /// Invented by the client because the feed never delivered a result
    pub synthetic: bool,
}

impl ResultRecord {
    /// Result for a source the feed never answered
    pub fn synthetic_error(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            synthetic: true,
            ..Self::default()
        }
    }

    /// Whether this result still counts toward "found"
    pub fn is_affirmative(&self) -> bool {
        self.archived && self.error.is_none()
    }
}

/// Final classification of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum Verdict {
    /// At least one source reported the target as archived
    Found { affirmative: usize },
    /// No source found it. This only reflects what the session could detect.
    NotFound,
}

impl Verdict {
    pub fn from_count(affirmative: usize) -> Self {
        if affirmative == 0 {
            Verdict::NotFound
        } else {
            Verdict::Found { affirmative }
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Found { affirmative } => write!(f, "found ({} sources)", affirmative),
            Verdict::NotFound => write!(f, "not found by this session"),
        }
    }
}
