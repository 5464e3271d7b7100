use std::collections::HashSet;

use chrono::{DateTime, Utc};
use futures::{StreamExt, stream};
use tracing::{debug, info, warn};

use crate::channel::content::{resolve_stream, resolve_with};
use crate::channel::discovery::fetch_catalog;
use crate::channel::metadata::{Window, fetch_broadcast, fetch_hourly, fetch_paged};
use crate::channel::process::apply_process_phase;
use crate::channel::{Channel, ChannelEntry, Issue, OutputBundle, Programme, ResolvedStream};
use crate::config::{Config, ScheduleMode};
use crate::error::Result;
use crate::upstream::Upstream;
use crate::url::{StreamTokens, TokenTable};

/// What one channel worker produced.
struct Outcome {
    channel: Channel,
    stream: Result<ResolvedStream>,
    programmes: Vec<Programme>,
    gaps: Vec<Issue>,
}

/**
    One resolution pass: catalog, liveness filter, then stream resolution and
    schedule fetching for every live channel.

    Channel work is fanned out with at most `concurrency` channels in flight,
    and results are collected in catalog order. Only a catalog failure is
    fatal; everything scoped to one channel ends up in the bundle's issues.
*/
pub struct Pipeline<U> {
    upstream: U,
    config: Config,
}

impl<U: Upstream> Pipeline<U> {
    pub fn new(upstream: U, config: Config) -> Self {
        Self { upstream, config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run with the default token table for `now`.
    pub async fn run(&self, now: DateTime<Utc>) -> Result<OutputBundle> {
        let tokens = StreamTokens::for_run(now, &self.config.geo_id, &self.config.tokens);
        self.run_with_tokens(now, &tokens).await
    }

    pub async fn run_with_tokens(
        &self,
        now: DateTime<Utc>,
        tokens: &impl TokenTable,
    ) -> Result<OutputBundle> {
        let catalog = fetch_catalog(&self.upstream, &self.config).await?;
        let catalog_size = catalog.len();

        let live = apply_process_phase(catalog, &self.config.filter);
        let live_count = live.len();

        let window = Window::new(now, self.config.time_window_hours);
        info!(
            "Resolving {} channels, schedule window {} + {}h",
            live_count,
            window.start.format("%Y-%m-%dT%H:%MZ"),
            window.hours
        );

        let (outcomes, mut issues) = match self.config.schedule.mode {
            ScheduleMode::Hourly => self.resolve_hourly(live, tokens, now, window).await,
            ScheduleMode::Paged => self.resolve_paged(live, tokens, now, window).await,
        };

        let mut entries = Vec::with_capacity(outcomes.len());
        for outcome in outcomes {
            match outcome.stream {
                Ok(stream) => {
                    debug!("Channel {} streams from {}", stream.channel_id, stream.url);
                    issues.extend(outcome.gaps);
                    entries.push(ChannelEntry {
                        channel: outcome.channel,
                        stream,
                        programmes: outcome.programmes,
                    });
                }
                Err(e) => {
                    warn!(
                        "Dropping channel {} ({}): {}",
                        outcome.channel.id, outcome.channel.name, e
                    );
                    issues.push(Issue::channel(outcome.channel.id, e));
                }
            }
        }

        let bundle = OutputBundle {
            generated_at: now,
            catalog_size,
            live_count,
            entries,
            issues,
        };

        info!(
            "Resolved {}/{} live channels with {} programmes ({} issues)",
            bundle.entries.len(),
            live_count,
            bundle.programme_count(),
            bundle.issues.len()
        );

        Ok(bundle)
    }

    /**
        Each worker fetches its channel's now-playing listing once, resolves
        the stream from it, and only then walks the remaining hour buckets.

        Hours past the current UTC day are out of reach of the now-playing
        endpoint; they are filled from the list-wide guide, paged alongside
        the workers.
    */
    async fn resolve_hourly(
        &self,
        live: Vec<Channel>,
        tokens: &impl TokenTable,
        now: DateTime<Utc>,
        window: Window,
    ) -> (Vec<Outcome>, Vec<Issue>) {
        let timeout = self.config.request_timeout();
        let (today, later) = window.split_at_midnight();
        let ids: HashSet<String> = live.iter().map(|c| c.id.clone()).collect();

        let workers = stream::iter(live)
            .map(|channel| async move {
                let now_playing = fetch_broadcast(&self.upstream, &channel.id, now, timeout).await;

                let stream = match (&channel.inline_manifest, &now_playing) {
                    (None, Err(e)) => Err(e.clone()),
                    (_, listing) => {
                        let listing = listing.as_deref().unwrap_or(&[]);
                        resolve_with(&self.upstream, &channel, listing, tokens, now, timeout).await
                    }
                };

                let (programmes, gaps) = match &stream {
                    Ok(_) => {
                        fetch_hourly(&self.upstream, &channel.id, today, Some(now_playing), timeout)
                            .await
                    }
                    Err(_) => (Vec::new(), Vec::new()),
                };

                Outcome {
                    channel,
                    stream,
                    programmes,
                    gaps,
                }
            })
            .buffered(self.config.concurrency)
            .collect::<Vec<_>>();

        let Some(later) = later else {
            return (workers.await, Vec::new());
        };

        info!(
            "Schedule from {} onwards comes from guide list {}",
            later.start.format("%Y-%m-%dT%H:%MZ"),
            self.config.schedule.list_id
        );

        let schedule = fetch_paged(&self.upstream, &self.config.schedule, later, &ids, timeout);
        let (mut outcomes, (mut schedules, issues)) = tokio::join!(workers, schedule);

        // Entries starting before midnight belong to the hour buckets.
        for outcome in &mut outcomes {
            if let Some(programmes) = schedules.remove(&outcome.channel.id) {
                outcome
                    .programmes
                    .extend(programmes.into_iter().filter(|p| p.start >= later.start));
            }
        }

        (outcomes, issues)
    }

    /// Streams resolve per channel while the list-wide guide is paged alongside.
    async fn resolve_paged(
        &self,
        live: Vec<Channel>,
        tokens: &impl TokenTable,
        now: DateTime<Utc>,
        window: Window,
    ) -> (Vec<Outcome>, Vec<Issue>) {
        let timeout = self.config.request_timeout();
        let ids: HashSet<String> = live.iter().map(|c| c.id.clone()).collect();

        let streams = stream::iter(&live)
            .map(|channel| resolve_stream(&self.upstream, channel, tokens, now, timeout))
            .buffered(self.config.concurrency)
            .collect::<Vec<_>>();
        let schedule = fetch_paged(&self.upstream, &self.config.schedule, window, &ids, timeout);

        let (streams, (mut schedules, issues)) = tokio::join!(streams, schedule);

        let outcomes = live
            .into_iter()
            .zip(streams)
            .map(|(channel, stream)| Outcome {
                programmes: schedules.remove(&channel.id).unwrap_or_default(),
                channel,
                stream,
                gaps: Vec::new(),
            })
            .collect();

        (outcomes, issues)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use chrono::Timelike;

    use super::*;
    use crate::error::Error;
    use crate::upstream::fixture::FixtureUpstream;
    use crate::upstream::{CatalogEndpoint, Request};
    use crate::util::time::parse_timestamp;

    pub(crate) fn now() -> DateTime<Utc> {
        parse_timestamp("2026-02-08T05:10:00Z").unwrap()
    }

    pub(crate) fn test_config() -> Config {
        Config {
            time_window_hours: 1,
            fallback_list_id: None,
            ..Config::default()
        }
    }

    pub(crate) fn catalog_request() -> Request {
        Request::Catalog {
            endpoint: CatalogEndpoint::Primary,
            list_id: "10006".to_string(),
        }
    }

    fn broadcast(channel_id: &str, hour: u32) -> Request {
        Request::Broadcast {
            channel_id: channel_id.to_string(),
            date: now().date_naive(),
            hour,
        }
    }

    /// A, B and C as described by their names: only A should survive.
    pub(crate) const ABC_CATALOG: &str = r#"{"channel": {"item": [
        {"guid": {"value": "A"}, "title": "Alpha", "number": "1", "callsign": "ALPHA",
         "properties": {"is_live": "true"}},
        {"guid": {"value": "B"}, "title": "Bravo", "number": "2", "callsign": "BRAVO-DRM",
         "properties": {"is_live": "true"}},
        {"guid": {"value": "C"}, "title": "Charlie", "number": "3", "callsign": "CHARLIE",
         "properties": {"is_live": "false"}}
    ]}}"#;

    /// Fixture data under which channel A resolves and has one programme.
    pub(crate) fn abc_upstream() -> FixtureUpstream {
        FixtureUpstream::new()
            .respond(catalog_request(), ABC_CATALOG)
            .respond(
                broadcast("A", 5),
                r#"{"assets": [{"id": "EP100", "title": "Alpha News", "episodeTitle": "Morning",
                    "start": "2026-02-08T05:00:00Z", "end": "2026-02-08T06:00:00Z",
                    "descriptions": {"medium": "Headlines & weather"}}]}"#,
            )
            .respond(
                Request::Asset {
                    asset_id: "EP100".to_string(),
                },
                r#"{"providers": [{"sources": [
                    {"uri": "https://cdn.example.com/alpha.m3u8?ts=[timestamp]&dev=[DEVICE_ID]", "type": "application/x-mpegURL"}
                ]}]}"#,
            )
    }

    fn entry_ids(bundle: &OutputBundle) -> Vec<&str> {
        bundle.entries.iter().map(|e| e.channel.id.as_str()).collect()
    }

    #[tokio::test]
    async fn test_only_live_unprotected_channels() {
        let pipeline = Pipeline::new(abc_upstream(), test_config());
        let bundle = pipeline.run(now()).await.unwrap();

        assert_eq!(bundle.catalog_size, 3);
        assert_eq!(bundle.live_count, 1);
        assert_eq!(entry_ids(&bundle), ["A"]);
        assert!(bundle.issues.is_empty());

        let entry = &bundle.entries[0];
        assert!(entry.stream.url.starts_with("https://cdn.example.com/alpha.m3u8?ts=1770527400000&dev="));
        assert!(!entry.stream.url.contains('['));
        assert_eq!(entry.programmes.len(), 1);
        assert_eq!(entry.programmes[0].title, "Alpha News");

        // Neither B nor C was ever looked up.
        assert!(
            pipeline
                .upstream
                .calls()
                .iter()
                .all(|r| !matches!(r, Request::Broadcast { channel_id, .. } if channel_id != "A"))
        );
    }

    #[tokio::test]
    async fn test_unresolved_placeholder_drops_channel() {
        let catalog = r#"{"items": [
            {"id": "A", "title": "Alpha", "properties": {"is_live": "true"},
             "stream": {"hls": "https://cdn.example.com/a.m3u8?x=[BRAND_NEW_TOKEN]"}},
            {"id": "D", "title": "Delta", "properties": {"is_live": "true"},
             "stream": {"hls": "https://cdn.example.com/d.m3u8?p=[PLATFORM]"}}
        ]}"#;
        let upstream = FixtureUpstream::new()
            .respond(catalog_request(), catalog)
            .respond(broadcast("A", 5), r#"{"assets": []}"#)
            .respond(broadcast("D", 5), r#"{"assets": []}"#);

        let bundle = Pipeline::new(upstream, test_config()).run(now()).await.unwrap();

        assert_eq!(entry_ids(&bundle), ["D"]);
        assert_eq!(bundle.entries[0].stream.url, "https://cdn.example.com/d.m3u8?p=web");

        let issues: Vec<_> = bundle.issues_of_kind("unresolved_placeholder").collect();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].channel_id.as_deref(), Some("A"));
        assert_eq!(
            issues[0].error,
            Error::UnresolvedPlaceholder {
                token: "BRAND_NEW_TOKEN".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_missing_liveness_is_fatal() {
        let catalog = r#"{"channel": {"item": [{"guid": {"value": "A"}, "title": "Alpha"}]}}"#;
        let upstream = FixtureUpstream::new().respond(catalog_request(), catalog);

        let err = Pipeline::new(upstream, test_config()).run(now()).await.unwrap_err();
        assert!(matches!(err, Error::SchemaMismatch { endpoint: "catalog", .. }));
    }

    #[tokio::test]
    async fn test_schedule_gap_keeps_channel() {
        let config = Config {
            time_window_hours: 3,
            ..test_config()
        };
        let upstream = abc_upstream()
            .fail(broadcast("A", 6), Error::UpstreamUnavailable("HTTP 502".to_string()))
            .respond(
                broadcast("A", 7),
                r#"{"assets": [{"id": "EP101", "title": "Alpha Late",
                    "start": "2026-02-08T07:00:00Z", "end": "2026-02-08T08:00:00Z"}]}"#,
            );

        let bundle = Pipeline::new(upstream, config).run(now()).await.unwrap();
        assert_eq!(entry_ids(&bundle), ["A"]);

        let starts: Vec<u32> = bundle.entries[0]
            .programmes
            .iter()
            .map(|p| p.start.hour())
            .collect();
        assert_eq!(starts, [5, 7]);
        assert_eq!(bundle.issues_of_kind("schedule_gap").count(), 1);
    }

    #[tokio::test]
    async fn test_failed_resolution_is_isolated() {
        let catalog = r#"{"items": [
            {"id": "A", "title": "Alpha", "properties": {"is_live": "true"}},
            {"id": "E", "title": "Echo", "properties": {"is_live": "true"}}
        ]}"#;
        let upstream = abc_upstream()
            .respond(catalog_request(), catalog)
            .fail(broadcast("E", 5), Error::UpstreamUnavailable("HTTP 404".to_string()));

        let bundle = Pipeline::new(upstream, test_config()).run(now()).await.unwrap();
        assert_eq!(entry_ids(&bundle), ["A"]);
        assert_eq!(bundle.issues.len(), 1);
        assert_eq!(bundle.issues[0].channel_id.as_deref(), Some("E"));
    }

    #[tokio::test]
    async fn test_catalog_order_with_wide_fan_out() {
        let items: Vec<String> = (0..12)
            .map(|i| {
                format!(
                    r#"{{"id": "{i}", "title": "Channel {i}", "properties": {{"is_live": "true"}},
                        "stream": {{"url": "https://cdn.example.com/{i}.m3u8"}}}}"#
                )
            })
            .collect();
        let catalog = format!(r#"{{"items": [{}]}}"#, items.join(","));

        let mut upstream = FixtureUpstream::new().respond(catalog_request(), catalog);
        for i in 0..12 {
            upstream = upstream.respond(broadcast(&i.to_string(), 5), r#"{"assets": []}"#);
        }

        let config = Config {
            concurrency: 3,
            ..test_config()
        };
        let bundle = Pipeline::new(upstream, config).run(now()).await.unwrap();
        let expected: Vec<String> = (0..12).map(|i| i.to_string()).collect();
        assert_eq!(entry_ids(&bundle), expected);
    }

    #[tokio::test]
    async fn test_paged_mode() {
        let mut config = test_config();
        config.schedule.mode = ScheduleMode::Paged;
        config.schedule.max_offset = 50;

        let upstream = abc_upstream()
            .respond(
                Request::EpgPage {
                    list_id: "10032".to_string(),
                    date: now().date_naive(),
                    offset: 0,
                },
                r#"{"channels": [{"channelId": "A", "schedule": [
                        {"assetId": "EP7", "start": "2026-02-08T05:00:00Z", "end": "2026-02-08T05:45:00Z"}
                    ]}],
                    "assets": {"EP7": {"title": "Paged Title"}}}"#,
            )
            .respond(
                Request::EpgPage {
                    list_id: "10032".to_string(),
                    date: now().date_naive(),
                    offset: 50,
                },
                r#"{"channels": []}"#,
            );

        let bundle = Pipeline::new(upstream, config).run(now()).await.unwrap();
        assert_eq!(entry_ids(&bundle), ["A"]);
        assert_eq!(bundle.entries[0].programmes[0].title, "Paged Title");
        assert!(bundle.issues.is_empty());
    }

    fn broadcast_calls(upstream: &FixtureUpstream, channel_id: &str) -> Vec<Request> {
        upstream
            .calls()
            .into_iter()
            .filter(|r| matches!(r, Request::Broadcast { channel_id: id, .. } if id == channel_id))
            .collect()
    }

    #[tokio::test]
    async fn test_now_playing_requested_once() {
        let config = Config {
            time_window_hours: 2,
            ..test_config()
        };
        let pipeline = Pipeline::new(
            abc_upstream().respond(broadcast("A", 6), r#"{"assets": []}"#),
            config,
        );
        let bundle = pipeline.run(now()).await.unwrap();
        assert_eq!(entry_ids(&bundle), ["A"]);
        assert_eq!(bundle.entries[0].programmes.len(), 1);

        assert_eq!(
            broadcast_calls(&pipeline.upstream, "A"),
            [broadcast("A", 5), broadcast("A", 6)]
        );
    }

    #[tokio::test]
    async fn test_dropped_channel_fetches_no_schedule() {
        let catalog = r#"{"items": [{"id": "E", "title": "Echo", "properties": {"is_live": "true"}}]}"#;
        let upstream = FixtureUpstream::new()
            .respond(catalog_request(), catalog)
            .fail(broadcast("E", 5), Error::UpstreamUnavailable("HTTP 404".to_string()))
            .respond(broadcast("E", 6), r#"{"assets": []}"#)
            .respond(broadcast("E", 7), r#"{"assets": []}"#);
        let config = Config {
            time_window_hours: 3,
            ..test_config()
        };

        let pipeline = Pipeline::new(upstream, config);
        let bundle = pipeline.run(now()).await.unwrap();

        assert!(bundle.entries.is_empty());
        assert_eq!(bundle.issues.len(), 1);
        assert_eq!(broadcast_calls(&pipeline.upstream, "E"), [broadcast("E", 5)]);
    }

    #[tokio::test]
    async fn test_listed_stream_falls_back_to_lookup() {
        let catalog = r#"{"items": [
            {"id": "A", "title": "Alpha", "properties": {"is_live": "true"},
             "stream": ["https://cdn.example.com/wrong.m3u8"]}
        ]}"#;
        let upstream = abc_upstream().respond(catalog_request(), catalog);

        let bundle = Pipeline::new(upstream, test_config()).run(now()).await.unwrap();
        assert_eq!(entry_ids(&bundle), ["A"]);
        assert!(
            bundle.entries[0]
                .stream
                .url
                .starts_with("https://cdn.example.com/alpha.m3u8?ts=")
        );
    }

    #[tokio::test]
    async fn test_hourly_window_crossing_midnight() {
        let late = parse_timestamp("2026-02-08T22:10:00Z").unwrap();
        let today = late.date_naive();
        let tomorrow = today.succ_opt().unwrap();
        let hour = |hour: u32| Request::Broadcast {
            channel_id: "A".to_string(),
            date: today,
            hour,
        };

        let catalog = r#"{"items": [
            {"id": "A", "title": "Alpha", "properties": {"is_live": "true"},
             "stream": {"hls": "https://cdn.example.com/a.m3u8"}}
        ]}"#;
        let upstream = FixtureUpstream::new()
            .respond(catalog_request(), catalog)
            .respond(
                hour(22),
                r#"{"assets": [{"id": "EP1", "title": "Late News",
                    "start": "2026-02-08T22:00:00Z", "end": "2026-02-08T23:00:00Z"}]}"#,
            )
            .respond(
                hour(23),
                r#"{"assets": [{"id": "EP2", "title": "Night Film",
                    "start": "2026-02-08T23:00:00Z", "end": "2026-02-09T01:00:00Z"}]}"#,
            )
            .respond(
                Request::EpgPage {
                    list_id: "10032".to_string(),
                    date: tomorrow,
                    offset: 0,
                },
                r#"{"channels": [{"channelId": "A", "schedule": [
                        {"assetId": "EP2", "start": "2026-02-08T23:00:00Z", "end": "2026-02-09T01:00:00Z"},
                        {"assetId": "EP3", "start": "2026-02-09T01:00:00Z", "end": "2026-02-09T02:00:00Z"}
                    ]}],
                    "assets": {"EP2": {"title": "Night Film"}, "EP3": {"title": "Early Show"}}}"#,
            );

        let mut config = Config {
            time_window_hours: 4,
            ..test_config()
        };
        config.schedule.max_offset = 0;

        let pipeline = Pipeline::new(upstream, config);
        let bundle = pipeline.run(late).await.unwrap();
        assert_eq!(entry_ids(&bundle), ["A"]);

        let titles: Vec<&str> = bundle.entries[0]
            .programmes
            .iter()
            .map(|p| p.title.as_str())
            .collect();
        assert_eq!(titles, ["Late News", "Night Film", "Early Show"]);
        assert!(bundle.issues.is_empty());

        assert_eq!(broadcast_calls(&pipeline.upstream, "A"), [hour(22), hour(23)]);
        assert!(pipeline.upstream.calls().contains(&Request::EpgPage {
            list_id: "10032".to_string(),
            date: tomorrow,
            offset: 0,
        }));
    }
}
