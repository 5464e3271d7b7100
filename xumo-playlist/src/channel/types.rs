use chrono::{DateTime, Utc};

use crate::error::Error;

/// A catalog entry, validated at the catalog boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Channel {
    pub id: String,
    pub name: String,
    pub logo: Option<String>,
    pub number: Option<String>,
    pub callsign: Option<String>,
    pub group: String,
    pub is_live: bool,
    pub is_drm: bool,
    /// Manifest template carried directly by the catalog, when the list provides one.
    pub inline_manifest: Option<String>,
}

/// A channel together with a fully substituted, playable URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedStream {
    pub channel_id: String,
    pub url: String,
}

/// A single EPG programme entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Programme {
    pub channel_id: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub title: String,
    pub episode_title: Option<String>,
    pub description: Option<String>,
    pub asset_id: Option<String>,
}

/// One playable channel in the output bundle.
#[derive(Debug, Clone)]
pub struct ChannelEntry {
    pub channel: Channel,
    pub stream: ResolvedStream,
    pub programmes: Vec<Programme>,
}

/// A non-fatal condition recorded during a run.
#[derive(Debug, Clone)]
pub struct Issue {
    /// `None` for conditions not tied to one channel, like a failed list-wide guide page.
    pub channel_id: Option<String>,
    pub error: Error,
}

impl Issue {
    pub fn channel(channel_id: impl Into<String>, error: Error) -> Self {
        Self {
            channel_id: Some(channel_id.into()),
            error,
        }
    }

    pub fn global(error: Error) -> Self {
        Self {
            channel_id: None,
            error,
        }
    }
}

/**
    Everything a run produced, in catalog order.

    Built fresh for every run and consumed by both emitters.
*/
#[derive(Debug, Clone)]
pub struct OutputBundle {
    pub generated_at: DateTime<Utc>,
    pub catalog_size: usize,
    pub live_count: usize,
    pub entries: Vec<ChannelEntry>,
    pub issues: Vec<Issue>,
}

impl OutputBundle {
    pub fn programme_count(&self) -> usize {
        self.entries.iter().map(|e| e.programmes.len()).sum()
    }

    pub fn issues_of_kind(&self, kind: &str) -> impl Iterator<Item = &Issue> {
        self.issues.iter().filter(move |i| i.error.kind() == kind)
    }
}
