use std::io;

use balanced_groups::{
    dataset::TrainingDir,
    driver::{OnError, PartitionDriver},
    features::RawF32Extractor,
    kmeans::KMeansClusterer,
    output::GroupingsWriter,
};
use clap::Args;
use tracing::error;

use crate::{
    config_args::ConfigArgs,
    ui::{progress_bar, progress_spinner},
};

#[derive(Args)]
pub struct PartitionArgs {
    #[command(flatten)]
    config: ConfigArgs,

    /// Smallest maximum group size to try. Defaults to 2.
    #[arg(long)]
    min_size: Option<usize>,
    /// Exclusive upper bound on the maximum group sizes to try. Defaults to the class count.
    #[arg(long)]
    max_size: Option<usize>,
    /// Keep going with the next group size if one fails.
    #[arg(long, default_value_t = false)]
    continue_on_error: bool,
    /// Partition different group sizes concurrently.
    #[arg(long, default_value_t = false)]
    parallel: bool,
}

pub fn partition(args: PartitionArgs) -> io::Result<()> {
    let mut config = args.config.load()?;
    if args.min_size.is_some() {
        config.driver.sizes.min = args.min_size;
    }
    if args.max_size.is_some() {
        config.driver.sizes.max = args.max_size;
    }
    if args.continue_on_error {
        config.driver.on_error = OnError::Continue;
    }
    if args.parallel {
        config.driver.parallel = true;
    }

    // Fail before doing any work if the training directory is absent.
    let train = TrainingDir::open(args.config.root())?;

    let spinner = progress_spinner("extracting class features");
    let features = train.extract_features(&RawF32Extractor, &config.sample_options())?;
    spinner.finish_with_message(format!("extracted features for {} classes", features.len()));

    let clusterer = KMeansClusterer::new(config.kmeans.clone());
    let driver = PartitionDriver::new(config.driver.clone(), &clusterer);
    let sizes = driver.sizes(&features)?;
    let writer = GroupingsWriter::create(train.root())?;

    let progress = progress_bar(sizes.len(), "partitioning");
    let report = driver.run(&features, &writer, |n| progress.inc(n))?;
    progress.finish_using_style();

    for (size, e) in report.failed.iter() {
        error!(size, "no groupings written: {e}");
    }
    println!(
        "Wrote {} groupings to {}",
        report.written.len(),
        writer.dir().display()
    );
    if report.failed.is_empty() {
        Ok(())
    } else {
        Err(io::Error::other(format!(
            "{} group sizes failed",
            report.failed.len()
        )))
    }
}
