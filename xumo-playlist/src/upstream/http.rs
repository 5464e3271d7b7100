use anyhow::anyhow;
use reqwest::{Client, Proxy};
use tracing::debug;

use crate::config::{Config, Endpoints};
use crate::error::{Error, Result};
use crate::url::EndpointVars;

use super::{CatalogEndpoint, Request, Upstream};

const WEB_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
const ANDROID_USER_AGENT: &str = "okhttp/4.9.3";
const WEB_ORIGIN: &str = "https://play.xumo.com";

/**
    Upstream transport over HTTP.

    The web-client catalog is requested with browser headers; everything else
    is requested the way the android client does.
*/
pub struct HttpUpstream {
    client: Client,
    endpoints: Endpoints,
    geo_id: String,
    page_size: u32,
}

impl HttpUpstream {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let mut builder = Client::builder().timeout(config.request_timeout());

        if let Some(proxy_url) = &config.proxy {
            let proxy = Proxy::all(proxy_url)
                .map_err(|e| anyhow!("Invalid proxy URL '{}': {}", proxy_url, e))?;
            builder = builder.proxy(proxy);
        }

        let client = builder
            .build()
            .map_err(|e| anyhow!("Failed to create HTTP client: {}", e))?;

        let upstream = Self {
            client,
            endpoints: config.endpoints.clone(),
            geo_id: config.geo_id.clone(),
            page_size: config.schedule.page_size,
        };
        upstream.check_templates()?;

        Ok(upstream)
    }

    /// Fail at startup, not mid-run, when an endpoint template names an unknown variable.
    fn check_templates(&self) -> anyhow::Result<()> {
        let date = chrono::NaiveDate::default();
        let samples = [
            Request::Catalog {
                endpoint: CatalogEndpoint::Primary,
                list_id: String::new(),
            },
            Request::Catalog {
                endpoint: CatalogEndpoint::Fallback,
                list_id: String::new(),
            },
            Request::Broadcast {
                channel_id: String::new(),
                date,
                hour: 0,
            },
            Request::Asset {
                asset_id: String::new(),
            },
            Request::EpgPage {
                list_id: String::new(),
                date,
                offset: 0,
            },
        ];

        for sample in &samples {
            self.url_for(sample)
                .map_err(|e| anyhow!("Bad {} endpoint template: {}", sample.endpoint(), e))?;
        }
        Ok(())
    }

    pub fn url_for(&self, request: &Request) -> anyhow::Result<String> {
        let vars = EndpointVars::new().with("geo_id", &self.geo_id);

        match request {
            Request::Catalog { endpoint, list_id } => {
                let template = match endpoint {
                    CatalogEndpoint::Primary => &self.endpoints.catalog,
                    CatalogEndpoint::Fallback => &self.endpoints.fallback_catalog,
                };
                vars.with("list_id", list_id).interpolate(template)
            }
            Request::Broadcast {
                channel_id,
                date,
                hour,
            } => vars
                .with("channel_id", channel_id)
                .with("date", date.format("%Y%m%d"))
                .with("hour", hour)
                .interpolate(&self.endpoints.broadcast),
            Request::Asset { asset_id } => vars
                .with("asset_id", asset_id)
                .interpolate(&self.endpoints.asset),
            Request::EpgPage {
                list_id,
                date,
                offset,
            } => vars
                .with("list_id", list_id)
                .with("date", date.format("%Y%m%d"))
                .with("offset", offset)
                .with("limit", self.page_size)
                .interpolate(&self.endpoints.epg),
        }
    }
}

impl Upstream for HttpUpstream {
    async fn fetch(&self, request: &Request) -> Result<String> {
        let url = self
            .url_for(request)
            .map_err(|e| Error::UpstreamUnavailable(e.to_string()))?;
        debug!("Fetching {}: {}", request, url);

        let mut builder = self.client.get(&url);
        builder = match request {
            Request::Catalog {
                endpoint: CatalogEndpoint::Primary,
                ..
            } => builder
                .header("User-Agent", WEB_USER_AGENT)
                .header("Accept", "application/json, text/plain, */*")
                .header("Accept-Language", "en-US,en;q=0.9")
                .header("Origin", WEB_ORIGIN)
                .header("Referer", format!("{}/", WEB_ORIGIN)),
            _ => builder.header("User-Agent", ANDROID_USER_AGENT),
        };

        let response = builder
            .send()
            .await
            .map_err(|e| Error::UpstreamUnavailable(format!("request for '{}' failed: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::UpstreamUnavailable(format!(
                "request for '{}' failed: status {}",
                url, status
            )));
        }

        let body = response.text().await.map_err(|e| {
            Error::UpstreamUnavailable(format!("failed to read body of '{}': {}", url, e))
        })?;

        debug!("Fetched {} bytes for {}", body.len(), request);
        Ok(body)
    }
}
