use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::util::time::parse_timestamp;

use super::{Descriptions, de, parse_body};

#[derive(Debug, Deserialize)]
struct EpgBody {
    #[serde(default)]
    channels: Option<Vec<Value>>,
    #[serde(default, deserialize_with = "de::lenient")]
    assets: Option<HashMap<String, Value>>,
}

#[derive(Debug, Deserialize)]
struct RawChannelSchedule {
    #[serde(default, rename = "channelId", deserialize_with = "de::lenient_string")]
    channel_id: Option<String>,
    #[serde(default, deserialize_with = "de::lenient")]
    schedule: Option<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
struct RawSlot {
    #[serde(default, rename = "assetId", deserialize_with = "de::lenient_string")]
    asset_id: Option<String>,
    #[serde(default, deserialize_with = "de::lenient_string")]
    start: Option<String>,
    #[serde(default, deserialize_with = "de::lenient_string")]
    end: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawAssetMeta {
    #[serde(default, deserialize_with = "de::lenient_string")]
    title: Option<String>,
    #[serde(default, rename = "episodeTitle", deserialize_with = "de::lenient_string")]
    episode_title: Option<String>,
    #[serde(default, deserialize_with = "de::lenient_object")]
    descriptions: Option<Descriptions>,
}

/// A scheduled slot; the asset id joins it with the page's asset metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slot {
    pub asset_id: String,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelSlots {
    pub channel_id: String,
    pub slots: Vec<Slot>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetMeta {
    pub title: Option<String>,
    pub episode_title: Option<String>,
    pub description: Option<String>,
}

/// One page of the list-wide guide.
#[derive(Debug, Clone, Default)]
pub struct EpgPage {
    pub channels: Vec<ChannelSlots>,
    pub assets: HashMap<String, AssetMeta>,
}

/**
    Parse a guide page. The `channels` list is required (an empty one marks
    the end of a date); the `assets` map is optional.
*/
pub fn parse_epg_page(body: &str) -> Result<EpgPage> {
    let body: EpgBody = parse_body("epg", body)?;
    let channels = body
        .channels
        .ok_or_else(|| Error::schema("epg", "missing channels list"))?;

    let channels = channels
        .into_iter()
        .filter_map(de::object::<RawChannelSchedule>)
        .filter_map(|raw| {
            let channel_id = raw.channel_id?;
            let slots = raw
                .schedule
                .unwrap_or_default()
                .into_iter()
                .filter_map(de::object::<RawSlot>)
                .filter_map(|slot| {
                    Some(Slot {
                        asset_id: slot.asset_id?,
                        start: slot.start.as_deref().and_then(parse_timestamp),
                        end: slot.end.as_deref().and_then(parse_timestamp),
                    })
                })
                .collect();
            Some(ChannelSlots { channel_id, slots })
        })
        .collect();

    let assets = body
        .assets
        .unwrap_or_default()
        .into_iter()
        .filter_map(|(id, value)| {
            let raw = de::object::<RawAssetMeta>(value)?;
            Some((
                id,
                AssetMeta {
                    title: raw.title,
                    episode_title: raw.episode_title,
                    description: raw.descriptions.and_then(Descriptions::best),
                },
            ))
        })
        .collect();

    Ok(EpgPage { channels, assets })
}
