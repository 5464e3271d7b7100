use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Run configuration, threaded explicitly through every pipeline component.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// How many hours of guide data to fetch, starting at the current hour.
    pub time_window_hours: u32,
    pub geo_id: String,
    /// Primary catalog list.
    pub list_id: String,
    /// Secondary catalog list, tried when the primary fetch fails.
    pub fallback_list_id: Option<String>,
    pub output: OutputPaths,
    /// Guide location advertised by the playlist. Falls back to the EPG file name.
    pub epg_url: Option<String>,
    /// Upper bound on channels being worked on at once.
    pub concurrency: usize,
    pub request_timeout_secs: u64,
    pub proxy: Option<String>,
    pub language: String,
    pub schedule: ScheduleConfig,
    pub playlist: PlaylistConfig,
    pub filter: ChannelFilter,
    pub endpoints: Endpoints,
    /// Static manifest placeholder values, merged over the built-in table.
    pub tokens: HashMap<String, String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            time_window_hours: 24,
            geo_id: "us".to_string(),
            list_id: "10006".to_string(),
            fallback_list_id: Some("10032".to_string()),
            output: OutputPaths::default(),
            epg_url: None,
            concurrency: 8,
            request_timeout_secs: 45,
            proxy: None,
            language: "en".to_string(),
            schedule: ScheduleConfig::default(),
            playlist: PlaylistConfig::default(),
            filter: ChannelFilter::default(),
            endpoints: Endpoints::default(),
            tokens: HashMap::new(),
        }
    }
}

impl Config {
    /// Load from a YAML file. A missing file at `path` is an error; use
    /// [`Config::default`] when no file is given.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {:?}", path))?;
        Self::from_yaml(&content).with_context(|| format!("Failed to parse config {:?}", path))
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            self.time_window_hours > 0,
            "time_window_hours must be at least 1"
        );
        anyhow::ensure!(self.concurrency > 0, "concurrency must be at least 1");
        anyhow::ensure!(
            self.request_timeout_secs > 0,
            "request_timeout_secs must be at least 1"
        );
        anyhow::ensure!(
            self.schedule.page_size > 0,
            "schedule.page_size must be at least 1"
        );
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// The guide-location directive written into the playlist header.
    pub fn guide_location(&self) -> String {
        if let Some(url) = &self.epg_url {
            return url.clone();
        }
        self.output
            .epg
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.output.epg.to_string_lossy().into_owned())
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OutputPaths {
    pub playlist: PathBuf,
    pub epg: PathBuf,
}

impl Default for OutputPaths {
    fn default() -> Self {
        Self {
            playlist: PathBuf::from("playlists/xumo_playlist.m3u"),
            epg: PathBuf::from("playlists/xumo_epg.xml.gz"),
        }
    }
}

/// How the schedule endpoint is paginated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleMode {
    /// One now-playing request per channel per hour.
    Hourly,
    /// List-wide EPG pages per date, walked by offset.
    Paged,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub mode: ScheduleMode,
    /// List whose EPG pages are walked in paged mode.
    pub list_id: String,
    pub page_size: u32,
    pub max_offset: u32,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            mode: ScheduleMode::Hourly,
            list_id: "10032".to_string(),
            page_size: 50,
            max_offset: 400,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct PlaylistConfig {
    /// Order entries by channel number, then name, instead of catalog order.
    pub sort_by_number: bool,
}

/// Allowlist applied after the liveness filter. Empty lists match everything.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ChannelFilter {
    pub name: Vec<String>,
    pub id: Vec<String>,
}

/**
    Upstream URL templates.

    Placeholders use `{name}` syntax and are filled by
    [`crate::url::endpoint::EndpointVars`].
*/
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Endpoints {
    pub catalog: String,
    pub fallback_catalog: String,
    pub broadcast: String,
    pub asset: String,
    pub epg: String,
    pub logo: String,
    pub image_host: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            catalog: "https://valencia-app-mds.xumo.com/v2/proxy/channels/list/{list_id}.json?geoId={geo_id}".to_string(),
            fallback_catalog: "https://android-tv-mds.xumo.com/v2/channels/list/{list_id}.json?f=genreId&sort=hybrid&geoId={geo_id}".to_string(),
            broadcast: "https://android-tv-mds.xumo.com/v2/channels/channel/{channel_id}/broadcast.json?hour={hour}".to_string(),
            asset: "https://android-tv-mds.xumo.com/v2/assets/asset/{asset_id}.json?f=providers".to_string(),
            epg: "https://android-tv-mds.xumo.com/v2/epg/{list_id}/{date}/0.json?limit={limit}&offset={offset}&f=asset.title&f=asset.descriptions".to_string(),
            logo: "https://image.xumo.com/v1/channels/channel/{channel_id}/168x168.png?type=color_onBlack".to_string(),
            image_host: "https://image.xumo.com".to_string(),
        }
    }
}
