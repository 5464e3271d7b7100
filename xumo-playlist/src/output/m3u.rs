use std::cmp::Ordering;

use crate::channel::{ChannelEntry, OutputBundle};
use crate::config::PlaylistConfig;

/// Generate an M3U playlist from the bundle's resolved entries.
///
/// Pure function; an empty bundle still yields the header line.
pub fn generate_m3u(bundle: &OutputBundle, guide_location: &str, options: &PlaylistConfig) -> String {
    let mut entries: Vec<&ChannelEntry> = bundle.entries.iter().collect();
    if options.sort_by_number {
        entries.sort_by(|a, b| compare_by_number(a, b));
    }

    let mut playlist = format!("#EXTM3U url-tvg=\"{}\"\n", attribute(guide_location));

    for entry in entries {
        let channel = &entry.channel;

        let logo_attr = channel
            .logo
            .as_ref()
            .map(|l| format!(" tvg-logo=\"{}\"", attribute(l)))
            .unwrap_or_default();

        let number_attr = channel
            .number
            .as_ref()
            .map(|n| format!(" tvg-chno=\"{}\"", attribute(n)))
            .unwrap_or_default();

        playlist.push_str(&format!(
            "#EXTINF:-1 tvg-id=\"{id}\" tvg-name=\"{name}\"{logo}{number} group-title=\"{group}\",{title}\n\
             {url}\n",
            id = attribute(&channel.id),
            name = attribute(&channel.name),
            logo = logo_attr,
            number = number_attr,
            group = attribute(&channel.group).replace(',', ";"),
            title = channel.name.replace(',', ";"),
            url = entry.stream.url,
        ));
    }

    playlist
}

/// Attribute values are quoted, so embedded double quotes become single quotes.
fn attribute(value: &str) -> String {
    value.replace('"', "'")
}

/// Numbered channels first, by number; then by case-insensitive name.
fn compare_by_number(a: &ChannelEntry, b: &ChannelEntry) -> Ordering {
    let number = |e: &ChannelEntry| e.channel.number.as_deref().and_then(|n| n.parse::<u32>().ok());

    match (number(a), number(b)) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
    .then_with(|| {
        a.channel
            .name
            .to_lowercase()
            .cmp(&b.channel.name.to_lowercase())
    })
}
