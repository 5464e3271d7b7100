//! Validated data contracts for each upstream endpoint.
//!
//! Upstream responses are untrusted: every body is parsed here into a typed
//! value, tolerating unknown and oddly-typed optional fields but failing with
//! `SchemaMismatch` when a required field is absent.

pub mod asset;
pub mod broadcast;
pub mod catalog;
mod de;
pub mod epg;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::error::Category;

use crate::error::{Error, Result};

pub use asset::parse_asset;
pub use broadcast::{BroadcastAsset, parse_broadcast};
pub use catalog::parse_catalog;
pub use epg::{EpgPage, parse_epg_page};

/// Parse a body into `T`, separating unusable bodies from well-formed ones of the wrong shape.
fn parse_body<T: DeserializeOwned>(endpoint: &'static str, body: &str) -> Result<T> {
    if body.trim().is_empty() {
        return Err(Error::UpstreamUnavailable(format!(
            "empty {} response",
            endpoint
        )));
    }

    serde_json::from_str(body).map_err(|e| match e.classify() {
        Category::Data => Error::schema(endpoint, e.to_string()),
        Category::Io | Category::Syntax | Category::Eof => {
            Error::UpstreamUnavailable(format!("malformed {} response: {}", endpoint, e))
        }
    })
}

/// Programme descriptions in several lengths; the longest present one wins.
#[derive(Debug, Clone, Default, Deserialize)]
struct Descriptions {
    #[serde(default, deserialize_with = "de::lenient_string")]
    large: Option<String>,
    #[serde(default, deserialize_with = "de::lenient_string")]
    medium: Option<String>,
    #[serde(default, deserialize_with = "de::lenient_string")]
    small: Option<String>,
    #[serde(default, deserialize_with = "de::lenient_string")]
    tiny: Option<String>,
}

impl Descriptions {
    fn best(self) -> Option<String> {
        self.large.or(self.medium).or(self.small).or(self.tiny)
    }
}
