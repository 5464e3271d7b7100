use anyhow::{Context, Result};
use clap::Parser;

use crate::channel::OutputBundle;
use crate::pipeline::Pipeline;
use crate::upstream::HttpUpstream;
use crate::util::time::now;

use super::ConfigArgs;

#[derive(Parser, Debug)]
pub struct InspectCommand {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// List every resolved channel with its stream URL
    #[arg(long)]
    pub channels: bool,
}

impl InspectCommand {
    pub async fn run(self) -> Result<()> {
        let config = self.config.resolve()?;

        println!(
            "Inspecting list {} (geo {}), {}h window, {:?} schedule",
            config.list_id, config.geo_id, config.time_window_hours, config.schedule.mode
        );
        println!();

        let upstream = HttpUpstream::new(&config)?;
        let pipeline = Pipeline::new(upstream, config);
        let bundle = pipeline
            .run(now())
            .await
            .context("Resolution pass failed")?;

        print_report(&bundle, self.channels);
        Ok(())
    }
}

fn print_report(bundle: &OutputBundle, list_channels: bool) {
    println!(
        "Run instant: {}",
        bundle.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    println!();
    println!("=== Catalog ===");
    println!("  {} channel(s) in catalog", bundle.catalog_size);
    println!("  {} live, unprotected and allowed", bundle.live_count);

    println!();
    println!("=== Streams ===");
    println!(
        "  Resolved {}/{} channel(s)",
        bundle.entries.len(),
        bundle.live_count
    );
    if list_channels {
        for (i, entry) in bundle.entries.iter().enumerate() {
            println!(
                "  {:>3}. {} (id: {}, callsign: {}, group: {})",
                i + 1,
                entry.channel.name,
                entry.channel.id,
                entry.channel.callsign.as_deref().unwrap_or("-"),
                entry.channel.group
            );
            println!("       {}", entry.stream.url);
        }
    }

    println!();
    println!("=== Schedule ===");
    let with_guide = bundle
        .entries
        .iter()
        .filter(|e| !e.programmes.is_empty())
        .count();
    println!(
        "  {} programme(s) across {} channel(s)",
        bundle.programme_count(),
        with_guide
    );
    let first = bundle.entries.iter().flat_map(|e| &e.programmes).map(|p| p.start).min();
    let last = bundle.entries.iter().flat_map(|e| &e.programmes).map(|p| p.end).max();
    if let (Some(first), Some(last)) = (first, last) {
        println!(
            "  Covers {} to {}",
            first.format("%Y-%m-%d %H:%M UTC"),
            last.format("%Y-%m-%d %H:%M UTC")
        );
    }

    println!();
    println!("=== Issues ===");
    if bundle.issues.is_empty() {
        println!("  None");
    }
    for issue in &bundle.issues {
        match &issue.channel_id {
            Some(id) => println!("  [{}] channel {}: {}", issue.error.kind(), id, issue.error),
            None => println!("  [{}] {}", issue.error.kind(), issue.error),
        }
    }
}
