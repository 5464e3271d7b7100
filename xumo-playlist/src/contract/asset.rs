use serde::Deserialize;

use crate::error::{Error, Result};

use super::{de, parse_body};

const HLS_MIME: &str = "application/x-mpegURL";

#[derive(Debug, Deserialize)]
struct AssetBody {
    #[serde(default, deserialize_with = "de::lenient")]
    providers: Option<Vec<Provider>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Provider {
    #[serde(default, deserialize_with = "de::lenient")]
    sources: Option<Vec<Source>>,
}

#[derive(Debug, Clone, Deserialize)]
struct Source {
    #[serde(default, deserialize_with = "de::lenient_string")]
    uri: Option<String>,
    #[serde(default, rename = "type", deserialize_with = "de::lenient_string")]
    kind: Option<String>,
}

impl Source {
    fn is_hls(&self) -> bool {
        if self
            .kind
            .as_deref()
            .is_some_and(|k| k.eq_ignore_ascii_case(HLS_MIME))
        {
            return true;
        }
        self.uri.as_deref().is_some_and(|uri| {
            let path = uri.split(['?', '#']).next().unwrap_or(uri);
            path.ends_with(".m3u8")
        })
    }
}

/**
    Pick the manifest template from a provider list.

    The first HLS source wins; failing that, the first source with any URI.
*/
pub fn select_source(providers: &[Provider]) -> Option<String> {
    let sources = || {
        providers
            .iter()
            .flat_map(|p| p.sources.iter().flatten())
            .filter(|s| s.uri.is_some())
    };

    sources()
        .find(|s| s.is_hls())
        .or_else(|| sources().next())
        .and_then(|s| s.uri.clone())
}

/**
    Parse an asset-details response into its manifest template.

    `Ok(None)` means the asset is well-formed but offers nothing to play.
*/
pub fn parse_asset(body: &str) -> Result<Option<String>> {
    let body: AssetBody = parse_body("asset", body)?;
    let providers = body
        .providers
        .ok_or_else(|| Error::schema("asset", "missing providers list"))?;
    Ok(select_source(&providers))
}
