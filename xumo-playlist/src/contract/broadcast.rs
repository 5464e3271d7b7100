use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::error::{Error, Result};
use crate::util::time::parse_timestamp;

use super::{Descriptions, de, parse_body};

#[derive(Debug, Deserialize)]
struct BroadcastBody {
    #[serde(default)]
    assets: Option<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
struct RawAsset {
    #[serde(default, deserialize_with = "de::lenient_string")]
    id: Option<String>,
    #[serde(default, deserialize_with = "de::lenient_string")]
    start: Option<String>,
    #[serde(default, deserialize_with = "de::lenient_string")]
    end: Option<String>,
    #[serde(default, deserialize_with = "de::lenient_string")]
    title: Option<String>,
    #[serde(default, rename = "episodeTitle", deserialize_with = "de::lenient_string")]
    episode_title: Option<String>,
    #[serde(default, deserialize_with = "de::lenient_object")]
    descriptions: Option<Descriptions>,
}

/// An asset listed by the now-playing endpoint for one hour of one channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BroadcastAsset {
    pub id: String,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub title: Option<String>,
    pub episode_title: Option<String>,
    pub description: Option<String>,
}

impl BroadcastAsset {
    pub fn covers(&self, instant: DateTime<Utc>) -> bool {
        matches!((self.start, self.end), (Some(start), Some(end)) if start <= instant && instant < end)
    }
}

/**
    Parse a now-playing response.

    The `assets` list is required; entries without an id are skipped, and
    unparseable times are treated as absent.
*/
pub fn parse_broadcast(body: &str) -> Result<Vec<BroadcastAsset>> {
    let body: BroadcastBody = parse_body("broadcast", body)?;
    let items = body
        .assets
        .ok_or_else(|| Error::schema("broadcast", "missing assets list"))?;

    let assets = items
        .into_iter()
        .filter_map(|item| {
            let raw = de::object::<RawAsset>(item);
            if raw.is_none() {
                debug!("Skipping malformed broadcast asset");
            }
            raw
        })
        .filter_map(|raw| {
            let id = raw.id?;
            Some(BroadcastAsset {
                id,
                start: raw.start.as_deref().and_then(parse_timestamp),
                end: raw.end.as_deref().and_then(parse_timestamp),
                title: raw.title,
                episode_title: raw.episode_title,
                description: raw.descriptions.and_then(Descriptions::best),
            })
        })
        .collect();

    Ok(assets)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_broadcast() {
        let body = r#"{
            "channelId": 99991234,
            "assets": [
                {"id": "XM01", "title": "Morning News", "start": "2026-02-08T05:00:00Z", "end": "2026-02-08T05:30:00+0000",
                 "descriptions": {"small": "Headlines"}},
                {"title": "No id"},
                "garbage",
                {"id": "XM02", "start": "bad", "end": "2026-02-08T06:00:00Z"}
            ]
        }"#;
        let assets = parse_broadcast(body).unwrap();
        assert_eq!(assets.len(), 2);
        assert_eq!(assets[0].id, "XM01");
        assert_eq!(assets[0].title.as_deref(), Some("Morning News"));
        assert_eq!(assets[0].description.as_deref(), Some("Headlines"));
        assert!(assets[0].end.is_some());
        assert_eq!(assets[1].id, "XM02");
        assert!(assets[1].start.is_none());

        let at = parse_timestamp("2026-02-08T05:10:00Z").unwrap();
        assert!(assets[0].covers(at));
        assert!(!assets[1].covers(at));
    }

    #[test]
    fn test_missing_assets_list() {
        assert!(matches!(
            parse_broadcast(r#"{"channelId": 1}"#),
            Err(Error::SchemaMismatch { endpoint: "broadcast", .. })
        ));
    }

    #[test]
    fn test_empty_assets_list() {
        assert!(parse_broadcast(r#"{"assets": []}"#).unwrap().is_empty());
    }
}
