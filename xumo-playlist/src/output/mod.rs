pub mod epg;
pub mod m3u;
pub mod write;

use std::io;

use crate::channel::OutputBundle;
use crate::config::Config;

pub use write::publish;

/// Both artifacts of a run, fully rendered and ready to publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifacts {
    pub playlist: String,
    /// Gzip-compressed XMLTV document.
    pub epg: Vec<u8>,
}

/// Render the playlist and the compressed guide from one bundle.
pub fn render(bundle: &OutputBundle, config: &Config) -> io::Result<Artifacts> {
    let playlist = m3u::generate_m3u(bundle, &config.guide_location(), &config.playlist);
    let document = epg::generate_epg(bundle, &config.language);
    let epg = epg::compress(&document)?;

    Ok(Artifacts { playlist, epg })
}
