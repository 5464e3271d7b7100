use tracing::info;

use crate::config::ChannelFilter;

use super::types::Channel;

/**
    Keep the channels that can appear in the output: live, not DRM-tagged,
    and allowed by the configured filter. Catalog order is preserved.
*/
pub fn apply_process_phase(channels: Vec<Channel>, filter: &ChannelFilter) -> Vec<Channel> {
    let total = channels.len();
    let live = retain_live(channels);
    info!("{} of {} catalog channels are live and unprotected", live.len(), total);

    apply_filter(live, filter)
}

/// Drop channels that are not live or that require DRM.
pub fn retain_live(channels: Vec<Channel>) -> Vec<Channel> {
    channels
        .into_iter()
        .filter(|c| c.is_live && !c.is_drm)
        .collect()
}

/// Filter channels based on name and/or id lists.
fn apply_filter(channels: Vec<Channel>, filter: &ChannelFilter) -> Vec<Channel> {
    if filter.name.is_empty() && filter.id.is_empty() {
        return channels;
    }

    let filtered: Vec<_> = channels
        .into_iter()
        .filter(|c| {
            let name_match = filter.name.is_empty() || filter.name.contains(&c.name);
            let id_match = filter.id.is_empty() || filter.id.contains(&c.id);
            name_match && id_match
        })
        .collect();

    info!("Filter applied: {} channels remaining", filtered.len());

    filtered
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel(id: &str, name: &str, is_live: bool, is_drm: bool) -> Channel {
        Channel {
            id: id.to_string(),
            name: name.to_string(),
            logo: None,
            number: None,
            callsign: None,
            group: "General".to_string(),
            is_live,
            is_drm,
            inline_manifest: None,
        }
    }

    fn ids(channels: &[Channel]) -> Vec<&str> {
        channels.iter().map(|c| c.id.as_str()).collect()
    }

    #[test]
    fn test_retain_live_excludes_drm_and_offline() {
        let channels = vec![
            channel("a", "A", true, false),
            channel("b", "B", false, false),
            channel("c", "C", true, true),
            channel("d", "D", true, false),
        ];
        assert_eq!(ids(&retain_live(channels)), ["a", "d"]);
    }

    #[test]
    fn test_filter_by_id_and_name() {
        let channels = || {
            vec![
                channel("1", "News", true, false),
                channel("2", "Movies", true, false),
                channel("3", "Sports", true, false),
            ]
        };

        let by_id = ChannelFilter {
            id: vec!["3".into(), "1".into()],
            ..ChannelFilter::default()
        };
        assert_eq!(ids(&apply_process_phase(channels(), &by_id)), ["1", "3"]);

        let both = ChannelFilter {
            name: vec!["News".into(), "Movies".into()],
            id: vec!["2".into()],
        };
        assert_eq!(ids(&apply_process_phase(channels(), &both)), ["2"]);

        assert_eq!(
            ids(&apply_process_phase(channels(), &ChannelFilter::default())),
            ["1", "2", "3"]
        );
    }
}
