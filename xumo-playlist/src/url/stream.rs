use std::collections::HashMap;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use uuid::Uuid;

use crate::error::{Error, Result};

/// Manifest placeholders look like `[PLATFORM]` or `[timestamp]`.
static TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\[\]]+)\]").expect("token regex is valid"));

/**
    Source of values for manifest template placeholders.

    The token set is the part of the upstream contract most likely to change,
    so the builder only ever sees it through this trait.
*/
pub trait TokenTable {
    fn value(&self, token: &str) -> Option<String>;
}

impl TokenTable for HashMap<String, String> {
    fn value(&self, token: &str) -> Option<String> {
        self.get(token).cloned()
    }
}

/**
    The token table used for real runs.

    Static values come from the built-in defaults overlaid with configured
    overrides; `timestamp` is the run instant in UNIX milliseconds.
*/
#[derive(Debug, Clone)]
pub struct StreamTokens {
    values: HashMap<String, String>,
}

impl StreamTokens {
    /**
        Build the table for one run.

        Device identifiers are derived from `geo_id` so that two runs against the
        same upstream data produce the same URLs apart from `timestamp`.
    */
    pub fn for_run(now: DateTime<Utc>, geo_id: &str, overrides: &HashMap<String, String>) -> Self {
        let ifa = stable_id(geo_id, "ifa");
        let session = stable_id(geo_id, "session");
        let device = stable_id(geo_id, "device");

        let mut values: HashMap<String, String> = [
            ("PLATFORM", "web".to_string()),
            ("APP_VERSION", "1.0.0".to_string()),
            ("app_bundle", "web.xumo.com".to_string()),
            ("device_make", "xumo-playlist".to_string()),
            ("device_model", "generator".to_string()),
            ("content_language", "en".to_string()),
            ("IS_LAT", "0".to_string()),
            ("IFA", ifa.to_string()),
            ("SESSION_ID", session.to_string()),
            ("DEVICE_ID", device.simple().to_string()),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

        values.extend(overrides.iter().map(|(k, v)| (k.clone(), v.clone())));
        values.insert("timestamp".to_string(), now.timestamp_millis().to_string());

        Self { values }
    }
}

impl TokenTable for StreamTokens {
    fn value(&self, token: &str) -> Option<String> {
        self.values.get(token).cloned()
    }
}

fn stable_id(geo_id: &str, purpose: &str) -> Uuid {
    Uuid::new_v5(
        &Uuid::NAMESPACE_URL,
        format!("xumo-playlist:{}:{}", geo_id, purpose).as_bytes(),
    )
}

/**
    Substitute every placeholder in a manifest template, producing a playable URL.

    Substitution is a single textual pass; substituted values are never scanned
    for further tokens. Any token the table doesn't know fails the whole template.
*/
pub fn build_stream_url(template: &str, tokens: &impl TokenTable) -> Result<String> {
    let mut unresolved = None;

    let substituted = TOKEN_RE.replace_all(template.trim(), |cap: &regex::Captures| {
        match tokens.value(&cap[1]) {
            Some(value) => value,
            None => {
                unresolved.get_or_insert_with(|| cap[1].to_string());
                String::new()
            }
        }
    });

    if let Some(token) = unresolved {
        return Err(Error::UnresolvedPlaceholder { token });
    }

    let url = if let Some(rest) = substituted.strip_prefix("//") {
        format!("https://{}", rest)
    } else {
        substituted.into_owned()
    };

    match reqwest::Url::parse(&url) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => Ok(url),
        Ok(parsed) => Err(Error::schema(
            "asset",
            format!("manifest uri has unsupported scheme '{}'", parsed.scheme()),
        )),
        Err(e) => Err(Error::schema(
            "asset",
            format!("manifest uri is not an absolute url: {}", e),
        )),
    }
}
