use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::channel::Channel;
use crate::config::Endpoints;
use crate::error::{Error, Result};
use crate::url::EndpointVars;

use super::asset::{Provider, select_source};
use super::{de, parse_body};

const DEFAULT_GROUP: &str = "General";

#[derive(Debug, Deserialize)]
struct CatalogBody {
    #[serde(default, deserialize_with = "de::lenient_object")]
    channel: Option<ChannelBlock>,
    #[serde(default, deserialize_with = "de::lenient")]
    items: Option<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
struct ChannelBlock {
    #[serde(default, deserialize_with = "de::lenient")]
    item: Option<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
struct RawChannel {
    #[serde(default, deserialize_with = "de::lenient_object")]
    guid: Option<Guid>,
    #[serde(default, deserialize_with = "de::lenient_string")]
    id: Option<String>,
    #[serde(default, deserialize_with = "de::lenient_string")]
    title: Option<String>,
    #[serde(default, deserialize_with = "de::lenient_string")]
    name: Option<String>,
    #[serde(default, deserialize_with = "de::lenient_string")]
    number: Option<String>,
    #[serde(default, deserialize_with = "de::lenient_string")]
    callsign: Option<String>,
    #[serde(default, deserialize_with = "de::lenient_object")]
    images: Option<Images>,
    #[serde(default, deserialize_with = "de::lenient_string")]
    logo: Option<String>,
    #[serde(default)]
    genre: Option<Value>,
    #[serde(default, deserialize_with = "de::lenient_object")]
    properties: Option<Properties>,
    #[serde(
        default,
        alias = "streams",
        alias = "playback",
        deserialize_with = "de::lenient_object"
    )]
    stream: Option<InlineStream>,
    #[serde(default, deserialize_with = "de::lenient")]
    providers: Option<Vec<Provider>>,
}

#[derive(Debug, Deserialize)]
struct Guid {
    #[serde(default, deserialize_with = "de::lenient_string")]
    value: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Images {
    #[serde(default, deserialize_with = "de::lenient_string")]
    logo: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Properties {
    #[serde(default, deserialize_with = "de::lenient_string")]
    is_live: Option<String>,
}

#[derive(Debug, Deserialize)]
struct InlineStream {
    #[serde(default, deserialize_with = "de::lenient_string")]
    hls: Option<String>,
    #[serde(default, deserialize_with = "de::lenient_string")]
    m3u8: Option<String>,
    #[serde(default, deserialize_with = "de::lenient_string")]
    live: Option<String>,
    #[serde(default, deserialize_with = "de::lenient_string")]
    url: Option<String>,
    #[serde(default, deserialize_with = "de::lenient_string")]
    uri: Option<String>,
}

impl InlineStream {
    fn template(self) -> Option<String> {
        self.hls
            .or(self.m3u8)
            .or(self.live)
            .or(self.url)
            .or(self.uri)
    }
}

/**
    Parse a catalog response into channels, in catalog order.

    Accepts both the `channel.item` and the `items` container shapes. Every
    item must carry an id and a liveness flag; a single item without either
    fails the whole catalog. Items without a display name are skipped.
*/
pub fn parse_catalog(body: &str, endpoints: &Endpoints) -> Result<Vec<Channel>> {
    let body: CatalogBody = parse_body("catalog", body)?;

    let items = body
        .channel
        .and_then(|c| c.item)
        .or(body.items)
        .ok_or_else(|| Error::schema("catalog", "no channel list under channel.item or items"))?;

    let mut channels = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        if !item.is_object() {
            warn!("Skipping non-object catalog item at index {}", index);
            continue;
        }

        let raw: RawChannel = serde_json::from_value(item)
            .map_err(|e| Error::schema("catalog", format!("item {}: {}", index, e)))?;

        if let Some(channel) = validate_channel(raw, index, endpoints)? {
            channels.push(channel);
        }
    }

    Ok(channels)
}

fn validate_channel(raw: RawChannel, index: usize, endpoints: &Endpoints) -> Result<Option<Channel>> {
    let id = raw
        .guid
        .and_then(|g| g.value)
        .or(raw.id)
        .ok_or_else(|| Error::schema("catalog", format!("item {} has no id", index)))?;

    let is_live = raw
        .properties
        .and_then(|p| p.is_live)
        .map(|flag| flag.eq_ignore_ascii_case("true"))
        .ok_or_else(|| {
            Error::schema(
                "catalog",
                format!("channel {} has no properties.is_live", id),
            )
        })?;

    let Some(name) = raw.title.or(raw.name) else {
        warn!("Skipping catalog channel {} without a display name", id);
        return Ok(None);
    };

    let is_drm = raw
        .callsign
        .as_deref()
        .is_some_and(|c| c.ends_with("-DRM") || c.ends_with("DRM-CMS"));

    let logo = raw.images.and_then(|i| i.logo).or(raw.logo);
    let logo = normalize_logo(logo, &id, endpoints);

    let inline_manifest = raw
        .stream
        .and_then(InlineStream::template)
        .or_else(|| raw.providers.as_deref().and_then(select_source));

    if inline_manifest.is_some() {
        debug!("Catalog carries a stream template for channel {}", id);
    }

    Ok(Some(Channel {
        id,
        name,
        logo,
        number: raw.number,
        callsign: raw.callsign,
        group: genre_of(raw.genre),
        is_live,
        is_drm,
        inline_manifest,
    }))
}

fn genre_of(genre: Option<Value>) -> String {
    let genre = match genre {
        Some(Value::Array(items)) => items
            .into_iter()
            .next()
            .and_then(|first| first.get("value").cloned())
            .and_then(de::scalar_string),
        Some(other) => de::scalar_string(other),
        None => None,
    };
    genre.unwrap_or_else(|| DEFAULT_GROUP.to_string())
}

/// Make a logo reference absolute, deriving one from the channel id when absent.
fn normalize_logo(logo: Option<String>, channel_id: &str, endpoints: &Endpoints) -> Option<String> {
    match logo {
        Some(logo) if logo.starts_with("//") => Some(format!("https:{}", logo)),
        Some(logo) if logo.starts_with('/') => Some(format!(
            "{}{}",
            endpoints.image_host.trim_end_matches('/'),
            logo
        )),
        Some(logo) => Some(logo),
        None => EndpointVars::new()
            .with("channel_id", channel_id)
            .interpolate(&endpoints.logo)
            .ok(),
    }
}
