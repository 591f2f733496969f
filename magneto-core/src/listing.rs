//! Presentation assembler.
//!
//! Turns the live channel catalog, the local selection set and the PVR
//! schedule into view-ready rows. Channels are always ordered by identifier
//! so the listing is stable across refreshes.
//!
//! Logos are rewritten to the box's plain-HTTP origin: the box serves a
//! self-signed certificate on the LAN and browsers refuse to load images
//! from it over HTTPS.

use std::collections::BTreeSet;

use chrono::{Local, TimeZone};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::models::{Channel, Recording};

/// Display format for recording times.
const TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

// ============================================================================
// View Types
// ============================================================================

/// A channel row ready for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelView {
    /// Channel identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Short name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_name: Option<String>,
    /// Normalized logo URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
    /// Favorite flag from the box.
    pub favorite: bool,
    /// Whether the channel is in the local selection.
    pub selected: bool,
}

/// A recording row ready for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordingView {
    /// Recording identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    /// Program title.
    pub title: String,
    /// Channel name.
    pub channel: String,
    /// Formatted local start time.
    pub start_time: String,
    /// Formatted local end time.
    pub end_time: String,
    /// Scheduling state from the box.
    pub status: String,
}

// ============================================================================
// Logo Normalization
// ============================================================================

/// Returns the plain-HTTP origin of the box, e.g. `http://192.168.0.254`.
pub fn box_origin(api_base_url: &str) -> Option<String> {
    let url = Url::parse(api_base_url).ok()?;
    let host = url.host_str()?;

    Some(match url.port() {
        Some(port) => format!("http://{host}:{port}"),
        None => format!("http://{host}"),
    })
}

/// Normalizes a logo reference for display.
///
/// - relative paths are prefixed with the box's plain-HTTP origin
/// - `https://` URLs are downgraded to `http://`
/// - `http://` URLs are kept as-is
pub fn normalize_logo_url(logo: Option<&str>, api_base_url: &str) -> Option<String> {
    let logo = logo.map(str::trim).filter(|l| !l.is_empty())?;

    if let Some(rest) = logo.strip_prefix("https://") {
        return Some(format!("http://{rest}"));
    }
    if logo.starts_with("http://") {
        return Some(logo.to_string());
    }

    let Some(origin) = box_origin(api_base_url) else {
        return Some(logo.to_string());
    };

    if logo.starts_with('/') {
        Some(format!("{origin}{logo}"))
    } else {
        Some(format!("{origin}/{logo}"))
    }
}

// ============================================================================
// Channel Views
// ============================================================================

fn to_view(channel: &Channel, selection: &BTreeSet<String>, api_base_url: &str) -> ChannelView {
    ChannelView {
        id: channel.uuid.clone(),
        name: channel.name.clone(),
        short_name: channel.short_name.clone(),
        logo: normalize_logo_url(channel.logo_url.as_deref(), api_base_url),
        favorite: channel.favorite,
        selected: selection.contains(&channel.uuid),
    }
}

/// Every available channel, flagged with its selection state.
pub fn catalog_view(
    channels: &[Channel],
    selection: &BTreeSet<String>,
    api_base_url: &str,
) -> Vec<ChannelView> {
    let mut views: Vec<ChannelView> = channels
        .iter()
        .filter(|c| c.available)
        .map(|c| to_view(c, selection, api_base_url))
        .collect();

    views.sort_by(|a, b| a.id.cmp(&b.id));
    views
}

/// Channels that are both available and selected.
pub fn selected_view(
    channels: &[Channel],
    selection: &BTreeSet<String>,
    api_base_url: &str,
) -> Vec<ChannelView> {
    let mut views = catalog_view(channels, selection, api_base_url);
    views.retain(|v| v.selected);
    views
}

// ============================================================================
// Recording Views
// ============================================================================

/// Formats a Unix timestamp as local time, or `Unknown` when absent.
pub fn format_timestamp(secs: Option<i64>) -> String {
    secs.filter(|s| *s != 0)
        .and_then(|s| Local.timestamp_opt(s, 0).single())
        .map_or_else(|| "Unknown".to_string(), |dt| dt.format(TIME_FORMAT).to_string())
}

/// Maps box recordings to display rows, keeping the box's order.
pub fn format_recordings(recordings: &[Recording]) -> Vec<RecordingView> {
    recordings
        .iter()
        .map(|r| RecordingView {
            id: r.id,
            title: r.name.clone().unwrap_or_else(|| "Untitled".to_string()),
            channel: r
                .channel_name
                .clone()
                .unwrap_or_else(|| "Unknown channel".to_string()),
            start_time: format_timestamp(r.start),
            end_time: format_timestamp(r.end),
            status: r.state.clone().unwrap_or_else(|| "unknown".to_string()),
        })
        .collect()
}

// ============================================================================
// Tests
// ============================================================================
