use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::config::{Config, ScheduleMode};

mod generate;
mod inspect;

pub use generate::GenerateCommand;
pub use inspect::InspectCommand;

#[derive(Parser, Debug)]
#[command(name = "xumo-playlist")]
#[command(about = "Generate an M3U playlist and XMLTV guide for Xumo live channels")]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the pipeline once and write both artifacts (default)
    Generate(GenerateCommand),
    /// Run the pipeline and print what it found, without writing anything
    Inspect(InspectCommand),
}

impl Args {
    pub async fn run(self) -> Result<()> {
        let command = self
            .command
            .unwrap_or(Command::Generate(GenerateCommand::default()));

        match command {
            Command::Generate(cmd) => cmd.run().await,
            Command::Inspect(cmd) => cmd.run().await,
        }
    }
}

/// Configuration file and the flags that override it.
#[derive(clap::Args, Debug, Default)]
pub struct ConfigArgs {
    /// YAML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Hours of guide data to fetch
    #[arg(long)]
    pub hours: Option<u32>,

    /// Primary catalog list id
    #[arg(long)]
    pub list_id: Option<String>,

    /// Region passed to the catalog
    #[arg(long)]
    pub geo_id: Option<String>,

    /// Playlist output path
    #[arg(long)]
    pub playlist: Option<PathBuf>,

    /// Compressed guide output path
    #[arg(long)]
    pub epg: Option<PathBuf>,

    /// Guide location advertised in the playlist header
    #[arg(long)]
    pub epg_url: Option<String>,

    /// How guide data is fetched
    #[arg(long, value_enum)]
    pub schedule_mode: Option<ScheduleMode>,

    /// Channels worked on at once
    #[arg(long)]
    pub concurrency: Option<usize>,
}

impl ConfigArgs {
    /// Load the configuration file, if any, and apply flag overrides.
    pub fn resolve(self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)?,
            None => Config::default(),
        };

        if let Some(hours) = self.hours {
            config.time_window_hours = hours;
        }
        if let Some(list_id) = self.list_id {
            config.list_id = list_id;
        }
        if let Some(geo_id) = self.geo_id {
            config.geo_id = geo_id;
        }
        if let Some(playlist) = self.playlist {
            config.output.playlist = playlist;
        }
        if let Some(epg) = self.epg {
            config.output.epg = epg;
        }
        if let Some(epg_url) = self.epg_url {
            config.epg_url = Some(epg_url);
        }
        if let Some(mode) = self.schedule_mode {
            config.schedule.mode = mode;
        }
        if let Some(concurrency) = self.concurrency {
            config.concurrency = concurrency;
        }

        config.validate().context("Invalid configuration")?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_command_is_generate() {
        let args = Args::try_parse_from(["xumo-playlist"]).unwrap();
        assert!(args.command.is_none());

        let args = Args::try_parse_from(["xumo-playlist", "inspect", "--hours", "6"]).unwrap();
        assert!(matches!(args.command, Some(Command::Inspect(_))));
    }

    #[test]
    fn test_flags_override_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "time_window_hours: 12\ngeo_id: ca\nconcurrency: 2\n").unwrap();

        let args = Args::try_parse_from([
            "xumo-playlist",
            "generate",
            "--config",
            path.to_str().unwrap(),
            "--hours",
            "48",
            "--schedule-mode",
            "paged",
            "--playlist",
            "out/list.m3u",
        ])
        .unwrap();
        let Some(Command::Generate(cmd)) = args.command else {
            panic!("expected generate");
        };

        let config = cmd.config.resolve().unwrap();
        assert_eq!(config.time_window_hours, 48);
        assert_eq!(config.geo_id, "ca");
        assert_eq!(config.concurrency, 2);
        assert_eq!(config.schedule.mode, ScheduleMode::Paged);
        assert_eq!(config.output.playlist, PathBuf::from("out/list.m3u"));
        assert_eq!(config.list_id, "10006");
    }

    #[test]
    fn test_invalid_override_rejected() {
        let args = ConfigArgs {
            concurrency: Some(0),
            ..ConfigArgs::default()
        };
        assert!(args.resolve().is_err());
    }
}
