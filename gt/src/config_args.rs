use std::{io, path::PathBuf};

use balanced_groups::config::Config;
use clap::Args;

/// Arguments shared by every command that reads a training directory.
#[derive(Args)]
pub struct ConfigArgs {
    /// Root directory containing train/ with one sub-directory per class.
    #[arg(short, long, default_value = ".")]
    root: PathBuf,
    /// JSON config file. Flags below override values read from it.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of feature dimensions in each sample file.
    #[arg(short, long)]
    dimensions: Option<usize>,
    /// Maximum number of samples averaged for each class.
    #[arg(long)]
    sample_size: Option<usize>,
    /// Extension of per-sample feature files (little-endian f32 values).
    #[arg(long)]
    extension: Option<String>,
    /// Seed for centroid initialization.
    #[arg(long)]
    seed: Option<u64>,
    /// Maximum number of k-means iterations.
    #[arg(long)]
    iters: Option<usize>,
}

impl ConfigArgs {
    pub fn root(&self) -> &PathBuf {
        &self.root
    }

    /// Load the config file, if any, and apply flag overrides.
    pub fn load(&self) -> io::Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::from_json_file(path)?,
            None => Config::default(),
        };
        if let Some(dimensions) = self.dimensions {
            config.dimensions = dimensions;
        }
        if let Some(sample_size) = self.sample_size {
            config.sample_size = sample_size;
        }
        if let Some(extension) = &self.extension {
            config.extension = extension.clone();
        }
        if let Some(seed) = self.seed {
            config.driver.seed = seed;
        }
        if let Some(iters) = self.iters {
            config.kmeans.iters = iters;
        }
        config.validate()?;
        Ok(config)
    }
}
