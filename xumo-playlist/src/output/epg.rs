use std::io::{self, Write};

use chrono::{DateTime, Utc};
use flate2::Compression;
use flate2::write::GzEncoder;

use crate::channel::{OutputBundle, Programme};

const GENERATOR: &str = "xumo-playlist";

/// Format a `DateTime<Utc>` as an XMLTV timestamp (`YYYYMMDDHHmmSS +0000`).
fn format_xmltv_time(dt: &DateTime<Utc>) -> String {
    dt.format("%Y%m%d%H%M%S %z").to_string()
}

/// Generate an XMLTV document from the bundle.
///
/// Every resolved channel gets a channel element, even with no programmes,
/// so the guide lists the same channels as the playlist.
pub fn generate_epg(bundle: &OutputBundle, language: &str) -> String {
    let lang_attr = format!(" lang=\"{}\"", escape_xml(language));

    let mut channel_elements = String::new();
    let mut programmes = String::new();

    for entry in &bundle.entries {
        let channel = &entry.channel;

        let icon_element = channel
            .logo
            .as_ref()
            .map(|l| format!("    <icon src=\"{}\"/>\n", escape_xml(l)))
            .unwrap_or_default();

        channel_elements.push_str(&format!(
            "  <channel id=\"{id}\">\n\
             \x20   <display-name{lang}>{name}</display-name>\n\
             {icon}\
             \x20 </channel>\n",
            id = escape_xml(&channel.id),
            name = escape_xml(&channel.name),
            lang = lang_attr,
            icon = icon_element,
        ));

        let category_element = format!(
            "    <category{}>{}</category>\n",
            lang_attr,
            escape_xml(&channel.group)
        );

        for programme in &entry.programmes {
            programmes.push_str(&programme_element(programme, &lang_attr, &category_element));
        }
    }

    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <!DOCTYPE tv SYSTEM \"xmltv.dtd\">\n\
         <tv generator-info-name=\"{generator}\">\n\
         {channels}\
         {programmes}\
         </tv>\n",
        generator = GENERATOR,
        channels = channel_elements,
        programmes = programmes,
    )
}

fn programme_element(programme: &Programme, lang_attr: &str, category_element: &str) -> String {
    let sub_title_element = programme
        .episode_title
        .as_ref()
        .filter(|t| **t != programme.title)
        .map(|t| format!("    <sub-title{}>{}</sub-title>\n", lang_attr, escape_xml(t)))
        .unwrap_or_default();

    let desc_element = programme
        .description
        .as_ref()
        .map(|d| format!("    <desc{}>{}</desc>\n", lang_attr, escape_xml(d)))
        .unwrap_or_default();

    let episode_element = programme
        .asset_id
        .as_ref()
        .map(|id| {
            let system = if id.starts_with("EP") { "dd_progid" } else { "dd_assetid" };
            format!(
                "    <episode-num system=\"{}\">{}</episode-num>\n",
                system,
                escape_xml(id)
            )
        })
        .unwrap_or_default();

    format!(
        "  <programme start=\"{start}\" stop=\"{stop}\" channel=\"{id}\">\n\
         \x20   <title{lang}>{title}</title>\n\
         {sub_title}\
         {desc}\
         {category}\
         {episode}\
         \x20 </programme>\n",
        start = format_xmltv_time(&programme.start),
        stop = format_xmltv_time(&programme.end),
        id = escape_xml(&programme.channel_id),
        title = escape_xml(&programme.title),
        lang = lang_attr,
        sub_title = sub_title_element,
        desc = desc_element,
        category = category_element,
        episode = episode_element,
    )
}

/// Gzip the finished document in one pass.
pub fn compress(document: &str) -> io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(document.as_bytes())?;
    encoder.finish()
}

pub fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
