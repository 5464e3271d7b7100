use std::fmt;
use std::future::Future;
use std::time::Duration;

use chrono::NaiveDate;

use crate::error::{Error, Result};

pub mod http;

#[cfg(test)]
pub mod fixture;

pub use http::HttpUpstream;

/// Which of the two catalog endpoints a catalog request targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CatalogEndpoint {
    /// The web client's proxied list, which may carry inline stream templates.
    Primary,
    /// The android client's list, which never does.
    Fallback,
}

/**
    A single upstream call.

    Every upstream interaction the pipeline makes is one of these, so the
    transport behind [`Upstream`] can be swapped for a fixture in tests.
*/
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Request {
    Catalog {
        endpoint: CatalogEndpoint,
        list_id: String,
    },
    /// Assets airing on a channel during one UTC hour.
    Broadcast {
        channel_id: String,
        date: NaiveDate,
        hour: u32,
    },
    Asset {
        asset_id: String,
    },
    /// One page of the list-wide guide for a UTC date.
    EpgPage {
        list_id: String,
        date: NaiveDate,
        offset: u32,
    },
}

impl Request {
    /// Endpoint name used in schema errors and logs.
    pub fn endpoint(&self) -> &'static str {
        match self {
            Request::Catalog { .. } => "catalog",
            Request::Broadcast { .. } => "broadcast",
            Request::Asset { .. } => "asset",
            Request::EpgPage { .. } => "epg",
        }
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Request::Catalog { endpoint, list_id } => {
                write!(f, "catalog {:?} list {}", endpoint, list_id)
            }
            Request::Broadcast {
                channel_id,
                date,
                hour,
            } => write!(f, "broadcast {} {} {:02}:00", channel_id, date, hour),
            Request::Asset { asset_id } => write!(f, "asset {}", asset_id),
            Request::EpgPage {
                list_id,
                date,
                offset,
            } => write!(f, "epg list {} {} offset {}", list_id, date, offset),
        }
    }
}

/**
    Transport for upstream requests, returning the raw response body.

    Implementations only move bytes; parsing and validation happen in
    [`crate::contract`] so that nothing unvalidated reaches the data model.
*/
pub trait Upstream {
    fn fetch(&self, request: &Request) -> impl Future<Output = Result<String>> + Send;
}

/// Fetch through any upstream, treating a call that outlives `timeout` as unavailable.
pub async fn fetch_with_timeout<U: Upstream>(
    upstream: &U,
    request: &Request,
    timeout: Duration,
) -> Result<String> {
    match tokio::time::timeout(timeout, upstream.fetch(request)).await {
        Ok(result) => result,
        Err(_) => Err(Error::UpstreamUnavailable(format!(
            "{} timed out after {}s",
            request,
            timeout.as_secs_f64()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::fixture::FixtureUpstream;
    use super::*;

    fn asset(id: &str) -> Request {
        Request::Asset {
            asset_id: id.to_string(),
        }
    }

    #[tokio::test]
    async fn test_fetch_with_timeout() {
        let upstream = FixtureUpstream::new()
            .respond(asset("A"), "{}")
            .hang(asset("B"));

        let body = fetch_with_timeout(&upstream, &asset("A"), Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(body, "{}");

        let err = fetch_with_timeout(&upstream, &asset("B"), Duration::from_millis(20))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UpstreamUnavailable(ref m) if m.contains("timed out")));

        let err = fetch_with_timeout(&upstream, &asset("C"), Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UpstreamUnavailable(_)));
        assert_eq!(upstream.calls().len(), 3);
    }

    #[test]
    fn test_request_display() {
        let request = Request::Broadcast {
            channel_id: "99991234".to_string(),
            date: NaiveDate::from_ymd_opt(2026, 2, 8).unwrap(),
            hour: 5,
        };
        assert_eq!(request.to_string(), "broadcast 99991234 2026-02-08 05:00");
        assert_eq!(request.endpoint(), "broadcast");
    }
}
