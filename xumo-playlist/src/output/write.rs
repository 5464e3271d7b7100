use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tempfile::NamedTempFile;
use tracing::info;

use crate::config::OutputPaths;

use super::Artifacts;

/**
    Publish both artifacts.

    Each artifact is first written in full to a temporary file in its target
    directory, and only once both are on disk are they renamed into place.
    Any failure before the renames leaves the existing files untouched.
*/
pub fn publish(artifacts: &Artifacts, paths: &OutputPaths) -> Result<()> {
    let playlist = stage(&paths.playlist, artifacts.playlist.as_bytes())?;
    let epg = stage(&paths.epg, &artifacts.epg)?;

    playlist
        .persist(&paths.playlist)
        .with_context(|| format!("Failed to replace {}", paths.playlist.display()))?;
    epg.persist(&paths.epg)
        .with_context(|| format!("Failed to replace {}", paths.epg.display()))?;

    info!(
        "Wrote {} and {}",
        paths.playlist.display(),
        paths.epg.display()
    );

    Ok(())
}

fn stage(target: &Path, contents: &[u8]) -> Result<NamedTempFile> {
    let dir = parent_dir(target);
    fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create output directory {}", dir.display()))?;

    let mut file = NamedTempFile::new_in(&dir)
        .with_context(|| format!("Failed to create temporary file in {}", dir.display()))?;
    file.write_all(contents)
        .and_then(|_| file.as_file().sync_all())
        .with_context(|| format!("Failed to write staged output for {}", target.display()))?;

    Ok(file)
}

fn parent_dir(target: &Path) -> PathBuf {
    match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
