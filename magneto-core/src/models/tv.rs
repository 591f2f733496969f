//! TV and PVR types as reported by the box.
//!
//! These are never persisted; they are fetched live on every request.

use serde::{Deserialize, Serialize};

// ============================================================================
// Channel
// ============================================================================

/// A channel from the box's TV catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    /// Stable channel identifier.
    #[serde(default)]
    pub uuid: String,

    /// Display name.
    #[serde(default)]
    pub name: String,

    /// Short name.
    #[serde(default)]
    pub short_name: Option<String>,

    /// Whether the channel can be watched with the current subscription.
    #[serde(default)]
    pub available: bool,

    /// Whether the user marked the channel as a favorite on the box.
    #[serde(default)]
    pub favorite: bool,

    /// Logo reference, relative to the box origin or absolute.
    #[serde(default)]
    pub logo_url: Option<String>,
}

impl Channel {
    /// Creates a channel with the given id and name.
    pub fn new(uuid: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            uuid: uuid.into(),
            name: name.into(),
            short_name: None,
            available: true,
            favorite: false,
            logo_url: None,
        }
    }

    /// Sets the logo reference.
    #[must_use]
    pub fn with_logo(mut self, logo_url: impl Into<String>) -> Self {
        self.logo_url = Some(logo_url.into());
        self
    }

    /// Sets the availability flag.
    #[must_use]
    pub fn with_available(mut self, available: bool) -> Self {
        self.available = available;
        self
    }
}

// ============================================================================
// Recording
// ============================================================================

/// A scheduled recording from the box's PVR.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Recording {
    /// Recording identifier.
    #[serde(default)]
    pub id: Option<i64>,

    /// Title of the recorded program.
    #[serde(default)]
    pub name: Option<String>,

    /// Name of the channel being recorded.
    #[serde(default)]
    pub channel_name: Option<String>,

    /// Identifier of the channel being recorded.
    #[serde(default)]
    pub channel_uuid: Option<String>,

    /// Start time, Unix seconds.
    #[serde(default)]
    pub start: Option<i64>,

    /// End time, Unix seconds.
    #[serde(default)]
    pub end: Option<i64>,

    /// Scheduling state as reported by the box.
    #[serde(default)]
    pub state: Option<String>,
}

// ============================================================================
// Program
// ============================================================================

/// The program currently airing on a channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Program {
    /// Program identifier.
    #[serde(default)]
    pub id: Option<String>,

    /// Title.
    #[serde(default)]
    pub title: Option<String>,

    /// Episode or subtitle.
    #[serde(default)]
    pub sub_title: Option<String>,

    /// Start time, Unix seconds.
    #[serde(default)]
    pub date: Option<i64>,

    /// Duration in seconds.
    #[serde(default)]
    pub duration: Option<i64>,

    /// Description.
    #[serde(default)]
    pub desc: Option<String>,
}
