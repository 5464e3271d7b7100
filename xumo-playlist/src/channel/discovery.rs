use tracing::{error, info, warn};

use crate::config::Config;
use crate::contract::parse_catalog;
use crate::error::Result;
use crate::upstream::{CatalogEndpoint, Request, Upstream, fetch_with_timeout};

use super::types::Channel;

/**
    Fetch the channel catalog, in catalog order.

    The primary list is tried first. When it fails and a fallback list is
    configured, the fallback is tried; if that fails too, the primary's error
    is returned, since it describes the catalog of record.
*/
pub async fn fetch_catalog<U: Upstream>(upstream: &U, config: &Config) -> Result<Vec<Channel>> {
    let primary = Request::Catalog {
        endpoint: CatalogEndpoint::Primary,
        list_id: config.list_id.clone(),
    };

    let primary_err = match fetch_list(upstream, &primary, config).await {
        Ok(channels) => return Ok(channels),
        Err(e) => e,
    };

    let Some(fallback_id) = &config.fallback_list_id else {
        error!("Catalog fetch failed for list {}: {}", config.list_id, primary_err);
        return Err(primary_err);
    };

    warn!(
        "Catalog fetch failed for list {} ({}), trying fallback list {}",
        config.list_id, primary_err, fallback_id
    );

    let fallback = Request::Catalog {
        endpoint: CatalogEndpoint::Fallback,
        list_id: fallback_id.clone(),
    };

    match fetch_list(upstream, &fallback, config).await {
        Ok(channels) => Ok(channels),
        Err(e) => {
            error!("Fallback catalog list {} failed as well: {}", fallback_id, e);
            Err(primary_err)
        }
    }
}

async fn fetch_list<U: Upstream>(
    upstream: &U,
    request: &Request,
    config: &Config,
) -> Result<Vec<Channel>> {
    let body = fetch_with_timeout(upstream, request, config.request_timeout()).await?;
    let channels = parse_catalog(&body, &config.endpoints)?;
    info!("Found {} catalog channels via {}", channels.len(), request);
    Ok(channels)
}
