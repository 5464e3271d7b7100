use std::future::Future;

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use clap::Parser;
use tokio::signal;
use tracing::{info, warn};

use crate::channel::OutputBundle;
use crate::output::{publish, render};
use crate::pipeline::Pipeline;
use crate::upstream::{HttpUpstream, Upstream};
use crate::util::time::now;

use super::ConfigArgs;

#[derive(Parser, Debug, Default)]
pub struct GenerateCommand {
    #[command(flatten)]
    pub config: ConfigArgs,
}

impl GenerateCommand {
    pub async fn run(self) -> Result<()> {
        let config = self.config.resolve()?;
        let upstream = HttpUpstream::new(&config)?;
        let pipeline = Pipeline::new(upstream, config);

        let cancel = async {
            if let Err(e) = signal::ctrl_c().await {
                warn!("Failed to listen for ctrl-c: {}", e);
                std::future::pending::<()>().await;
            }
        };

        match generate(&pipeline, now(), cancel).await? {
            Some(bundle) => {
                info!(
                    "Published {} channels and {} programmes",
                    bundle.entries.len(),
                    bundle.programme_count()
                );
                Ok(())
            }
            None => bail!("Run cancelled; existing output left untouched"),
        }
    }
}

/**
    Run one pass and publish its artifacts.

    Returns `Ok(None)` when `cancel` resolves before the pass completes; in
    that case nothing is written. Rendering and publication happen after the
    pass, outside the cancellable section, so a published pair is always
    complete.
*/
pub async fn generate<U: Upstream>(
    pipeline: &Pipeline<U>,
    now: DateTime<Utc>,
    cancel: impl Future<Output = ()>,
) -> Result<Option<OutputBundle>> {
    let bundle = tokio::select! {
        result = pipeline.run(now) => result.context("Resolution pass failed")?,
        _ = cancel => {
            warn!("Cancelled before the resolution pass completed");
            return Ok(None);
        }
    };

    let config = pipeline.config();
    let artifacts = render(&bundle, config).context("Failed to render output")?;
    publish(&artifacts, &config.output)?;

    Ok(Some(bundle))
}
