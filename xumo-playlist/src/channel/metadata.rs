use std::collections::{HashMap, HashSet};
use std::time::Duration;

use chrono::{DateTime, Duration as ChronoDuration, NaiveDate, NaiveTime, Timelike, Utc};
use tracing::{debug, info, warn};

use crate::config::ScheduleConfig;
use crate::contract::epg::AssetMeta;
use crate::contract::{BroadcastAsset, EpgPage, parse_broadcast, parse_epg_page};
use crate::error::{Error, Result};
use crate::upstream::{Request, Upstream, fetch_with_timeout};
use crate::util::time::hour_floor;

use super::types::{Issue, Programme};

const UNKNOWN_TITLE: &str = "Unknown Program";

/// The forward schedule window, aligned to the start of the current UTC hour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub start: DateTime<Utc>,
    pub hours: u32,
}

impl Window {
    pub fn new(now: DateTime<Utc>, hours: u32) -> Self {
        Self {
            start: hour_floor(now),
            hours,
        }
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.start + ChronoDuration::hours(i64::from(self.hours))
    }

    /// Start instants of the hour buckets, in order.
    pub fn buckets(&self) -> impl Iterator<Item = DateTime<Utc>> {
        let start = self.start;
        (0..self.hours).map(move |i| start + ChronoDuration::hours(i64::from(i)))
    }

    /// UTC dates touched by the window, in order.
    pub fn dates(&self) -> Vec<NaiveDate> {
        let first = self.start.date_naive();
        let last = (self.end() - ChronoDuration::seconds(1)).date_naive();
        first.iter_days().take_while(|d| *d <= last).collect()
    }

    /**
        Split at the next UTC midnight: the part the now-playing endpoint can
        address, and the rest of the window, if any.
    */
    pub fn split_at_midnight(&self) -> (Window, Option<Window>) {
        let midnight = self
            .start
            .date_naive()
            .succ_opt()
            .map(|d| d.and_time(NaiveTime::MIN).and_utc());

        match midnight {
            Some(midnight) if midnight < self.end() => {
                let today = (midnight - self.start).num_hours() as u32;
                (
                    Window {
                        start: self.start,
                        hours: today,
                    },
                    Some(Window {
                        start: midnight,
                        hours: self.hours - today,
                    }),
                )
            }
            _ => (*self, None),
        }
    }

    fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        start < self.end() && end > self.start
    }
}

fn bucket_label(bucket: DateTime<Utc>) -> String {
    bucket.format("%Y-%m-%dT%H:%MZ").to_string()
}

fn gap(bucket: String, error: &Error) -> Error {
    Error::ScheduleGap {
        bucket,
        reason: error.to_string(),
    }
}

/**
    Fetch one channel's schedule, one now-playing request per hour bucket.

    The now-playing endpoint is addressed by hour of the current UTC day
    only, so buckets on a later date are not requested; each is recorded as a
    gap (see [`Window::split_at_midnight`] for covering them from the guide).
    A failed bucket leaves a gap and is recorded as an issue; the remaining
    buckets are still fetched. Each entry is kept by the bucket its start
    falls in, except that the first bucket also keeps the programme already
    airing when the window opens.

    `first_bucket` is the already-fetched response for the window's first
    hour, when the caller has one.
*/
pub async fn fetch_hourly<U: Upstream>(
    upstream: &U,
    channel_id: &str,
    window: Window,
    first_bucket: Option<Result<Vec<BroadcastAsset>>>,
    timeout: Duration,
) -> (Vec<Programme>, Vec<Issue>) {
    let mut programmes = Vec::new();
    let mut issues = Vec::new();
    let mut first_bucket = first_bucket;
    let today = window.start.date_naive();

    for (index, bucket) in window.buckets().enumerate() {
        if bucket.date_naive() != today {
            let label = bucket_label(bucket);
            warn!(
                "Schedule gap for channel {} at {}: hour is past the current UTC day",
                channel_id, label
            );
            issues.push(Issue::channel(
                channel_id,
                Error::ScheduleGap {
                    bucket: label,
                    reason: "now-playing endpoint only addresses the current UTC day".to_string(),
                },
            ));
            continue;
        }

        let fetched = match first_bucket.take() {
            Some(prefetched) if index == 0 => prefetched,
            _ => fetch_broadcast(upstream, channel_id, bucket, timeout).await,
        };

        let assets = match fetched {
            Ok(assets) => assets,
            Err(e) => {
                let label = bucket_label(bucket);
                warn!("Schedule gap for channel {} at {}: {}", channel_id, label, e);
                issues.push(Issue::channel(channel_id, gap(label, &e)));
                continue;
            }
        };

        let bucket_end = bucket + ChronoDuration::hours(1);
        for asset in assets {
            let (Some(start), Some(end)) = (asset.start, asset.end) else {
                continue;
            };
            if end <= start {
                continue;
            }

            let owned = if index == 0 {
                start < bucket_end && end > window.start
            } else {
                bucket <= start && start < bucket_end
            };
            if owned {
                programmes.push(programme_from_broadcast(channel_id, asset, start, end));
            }
        }
    }

    programmes.sort_by_key(|p| p.start);

    debug!(
        "Fetched {} programmes for channel {} ({} gaps)",
        programmes.len(),
        channel_id,
        issues.len()
    );

    (programmes, issues)
}

/// Assets airing on a channel during the UTC hour containing `at`.
pub async fn fetch_broadcast<U: Upstream>(
    upstream: &U,
    channel_id: &str,
    at: DateTime<Utc>,
    timeout: Duration,
) -> Result<Vec<BroadcastAsset>> {
    let request = Request::Broadcast {
        channel_id: channel_id.to_string(),
        date: at.date_naive(),
        hour: at.hour(),
    };
    let body = fetch_with_timeout(upstream, &request, timeout).await?;
    parse_broadcast(&body)
}

fn programme_from_broadcast(
    channel_id: &str,
    asset: BroadcastAsset,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Programme {
    Programme {
        channel_id: channel_id.to_string(),
        start,
        end,
        title: asset.title.unwrap_or_else(|| UNKNOWN_TITLE.to_string()),
        episode_title: asset.episode_title,
        description: asset.description,
        asset_id: Some(asset.id),
    }
}

/**
    Fetch the schedule for a set of channels from the list-wide guide.

    Each date touched by the window is paged by offset until a page comes
    back with no channels or the configured limit is reached. A failed page
    is recorded as a gap and the walk moves on to the next offset. Slots are
    kept on the date page they start on; the first date also keeps slots
    that started earlier and are still airing.
*/
pub async fn fetch_paged<U: Upstream>(
    upstream: &U,
    schedule: &ScheduleConfig,
    window: Window,
    channel_ids: &HashSet<String>,
    timeout: Duration,
) -> (HashMap<String, Vec<Programme>>, Vec<Issue>) {
    let mut programmes: HashMap<String, Vec<Programme>> = HashMap::new();
    let mut issues = Vec::new();
    let mut assets: HashMap<String, AssetMeta> = HashMap::new();

    let dates = window.dates();
    let step = schedule.page_size.max(1);

    for (date_index, date) in dates.iter().copied().enumerate() {
        for offset in (0..=schedule.max_offset).step_by(step as usize) {
            let request = Request::EpgPage {
                list_id: schedule.list_id.clone(),
                date,
                offset,
            };

            let page = match fetch_page(upstream, &request, timeout).await {
                Ok(page) => page,
                Err(e) => {
                    let label = format!("{} offset {}", date, offset);
                    warn!("Schedule gap in guide list {} at {}: {}", schedule.list_id, label, e);
                    issues.push(Issue::global(gap(label, &e)));
                    continue;
                }
            };

            if page.channels.is_empty() {
                debug!("Guide list {} has no more channels on {}", schedule.list_id, date);
                break;
            }

            assets.extend(page.assets);

            for channel in page.channels {
                if !channel_ids.contains(&channel.channel_id) {
                    continue;
                }

                for slot in channel.slots {
                    let (Some(start), Some(end)) = (slot.start, slot.end) else {
                        continue;
                    };
                    if end <= start || !window.overlaps(start, end) {
                        continue;
                    }

                    let start_date = start.date_naive();
                    let owned = start_date == date || (date_index == 0 && start_date < date);
                    if !owned {
                        continue;
                    }

                    let Some(meta) = assets.get(&slot.asset_id) else {
                        debug!("No guide metadata for asset {}", slot.asset_id);
                        continue;
                    };

                    programmes
                        .entry(channel.channel_id.clone())
                        .or_default()
                        .push(Programme {
                            channel_id: channel.channel_id.clone(),
                            start,
                            end,
                            title: meta.title.clone().unwrap_or_else(|| UNKNOWN_TITLE.to_string()),
                            episode_title: meta.episode_title.clone(),
                            description: meta.description.clone(),
                            asset_id: Some(slot.asset_id),
                        });
                }
            }
        }
    }

    for list in programmes.values_mut() {
        list.sort_by_key(|p| p.start);
    }

    info!(
        "Guide list {} provided schedules for {} channels",
        schedule.list_id,
        programmes.len()
    );

    (programmes, issues)
}

async fn fetch_page<U: Upstream>(upstream: &U, request: &Request, timeout: Duration) -> Result<EpgPage> {
    let body = fetch_with_timeout(upstream, request, timeout).await?;
    parse_epg_page(&body)
}
