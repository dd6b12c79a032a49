use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use ngramdb_engine::EngineConfig;

/// Engine tuning options. Flags override values loaded from `--config`.
#[derive(Args, Debug, Default)]
pub struct Options {
    /// JSON file with engine settings
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Number of worker threads (defaults to the number of CPUs)
    #[arg(long)]
    pub pool_size: Option<usize>,

    /// Number of pipelines a flushed batch of queries is split into
    #[arg(long)]
    pub parallelism: Option<usize>,

    /// Number of fragments a large query document is split into
    #[arg(long)]
    pub fragment_workers: Option<usize>,

    /// Minimum document length in bytes before it is split into fragments
    #[arg(long)]
    pub split_threshold: Option<usize>,

    /// Evaluate everything on a single thread (ignores the other tuning flags)
    #[arg(long)]
    pub sequential: bool,
}

impl Options {
    pub fn engine_config(&self) -> Result<EngineConfig> {
        if self.sequential {
            return Ok(EngineConfig::sequential());
        }

        let mut config = match &self.config {
            Some(path) => EngineConfig::from_json_file(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => EngineConfig::default(),
        };
        if let Some(pool_size) = self.pool_size {
            config.pool_size = pool_size;
            // Parallelism follows the pool size unless set explicitly.
            if self.parallelism.is_none() && self.config.is_none() {
                config.parallelism = pool_size;
            }
        }
        if let Some(parallelism) = self.parallelism {
            config.parallelism = parallelism;
        }
        if let Some(fragment_workers) = self.fragment_workers {
            config.fragment_workers = fragment_workers;
        }
        if let Some(split_threshold) = self.split_threshold {
            config.split_threshold = split_threshold;
        }
        config.validate().context("invalid engine options")?;
        Ok(config)
    }
}
