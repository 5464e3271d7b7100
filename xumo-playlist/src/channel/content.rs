use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::contract::{BroadcastAsset, parse_asset};
use crate::error::{Error, Result};
use crate::upstream::{Request, Upstream, fetch_with_timeout};
use crate::url::{TokenTable, build_stream_url};

use super::metadata::fetch_broadcast;
use super::types::{Channel, ResolvedStream};

/**
    Resolve a live channel into a playable stream URL.

    A manifest template carried by the catalog is used directly. Otherwise
    the asset airing at `now` is looked up through the now-playing endpoint,
    and its details provide the template. Either way the template goes
    through placeholder substitution, so a channel never yields a URL with
    unfilled tokens.
*/
pub async fn resolve_stream<U: Upstream>(
    upstream: &U,
    channel: &Channel,
    tokens: &impl TokenTable,
    now: DateTime<Utc>,
    timeout: Duration,
) -> Result<ResolvedStream> {
    if channel.inline_manifest.is_some() {
        return resolve_with(upstream, channel, &[], tokens, now, timeout).await;
    }

    let now_playing = fetch_broadcast(upstream, &channel.id, now, timeout).await?;
    resolve_with(upstream, channel, &now_playing, tokens, now, timeout).await
}

/// Like [`resolve_stream`], with the now-playing listing for `now` already fetched.
pub async fn resolve_with<U: Upstream>(
    upstream: &U,
    channel: &Channel,
    now_playing: &[BroadcastAsset],
    tokens: &impl TokenTable,
    now: DateTime<Utc>,
    timeout: Duration,
) -> Result<ResolvedStream> {
    let template = match &channel.inline_manifest {
        Some(template) => template.clone(),
        None => lookup_template(upstream, channel, now_playing, now, timeout).await?,
    };

    let url = build_stream_url(&template, tokens)?;

    Ok(ResolvedStream {
        channel_id: channel.id.clone(),
        url,
    })
}

async fn lookup_template<U: Upstream>(
    upstream: &U,
    channel: &Channel,
    now_playing: &[BroadcastAsset],
    now: DateTime<Utc>,
    timeout: Duration,
) -> Result<String> {
    // Prefer the asset whose window covers now; the hour's first entry otherwise.
    let asset = now_playing
        .iter()
        .find(|a| a.covers(now))
        .or_else(|| now_playing.first())
        .ok_or_else(|| Error::not_airing(format!("no asset airing on channel {}", channel.id)))?;

    let request = Request::Asset {
        asset_id: asset.id.clone(),
    };
    let body = fetch_with_timeout(upstream, &request, timeout).await?;

    parse_asset(&body)?.ok_or_else(|| {
        Error::not_airing(format!(
            "asset {} on channel {} has no playable source",
            asset.id, channel.id
        ))
    })
}
