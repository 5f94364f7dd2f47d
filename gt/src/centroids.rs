use std::{io, num::NonZero};

use balanced_groups::{
    dataset::TrainingDir,
    features::RawF32Extractor,
    kmeans::{compute_assignments, Clusterer, KMeansClusterer},
    partition::{greedy_assign, group_count},
};
use clap::Args;
use histogram::Histogram;

use crate::{config_args::ConfigArgs, ui::progress_spinner};

#[derive(Args)]
pub struct CentroidsArgs {
    #[command(flatten)]
    config: ConfigArgs,

    /// Maximum number of classes in each group.
    #[arg(short, long)]
    max_group_size: NonZero<usize>,
}

pub fn centroids(args: CentroidsArgs) -> io::Result<()> {
    let config = args.config.load()?;
    let train = TrainingDir::open(args.config.root())?;

    let spinner = progress_spinner("extracting class features");
    let features = train.extract_features(&RawF32Extractor, &config.sample_options())?;
    spinner.finish_with_message(format!("extracted features for {} classes", features.len()));

    let k = group_count(features.len(), args.max_group_size);
    let clusterer = KMeansClusterer::new(config.kmeans.clone());
    let centroids = clusterer.cluster(features.vectors(), k, config.driver.seed)?;

    // Unconstrained k-means cluster sizes, to compare against the bounded groups.
    let assignments = compute_assignments(features.vectors(), &centroids);
    let centroid_counts = assignments.iter().fold(vec![0usize; k], |mut counts, (c, _)| {
        counts[*c] += 1;
        counts
    });
    let partition = greedy_assign(features.vectors(), &centroids, args.max_group_size.get())?;

    let mut histogram = Histogram::new(2, 20).map_err(io::Error::other)?;
    for c in centroid_counts.iter() {
        histogram.add(*c as u64, 1).map_err(io::Error::other)?;
    }
    println!("k-means cluster sizes:");
    for bucket in histogram.into_iter().filter(|b| b.count() > 0) {
        println!(
            "[{:5}..{:5}] {:4}",
            bucket.start(),
            bucket.end(),
            bucket.count()
        );
    }

    for (i, (count, group)) in centroid_counts.iter().zip(partition.iter()).enumerate() {
        let labels = group
            .iter()
            .map(|id| features.label(id))
            .collect::<Vec<_>>()
            .join(" ");
        println!("centroid {i:4} nearest {count:5} assigned {:5}: {labels}", group.len());
    }

    let total_dist = assignments.iter().map(|(_, d)| *d).sum::<f64>();
    println!(
        "centroids {:5} classes {:7} min {:5} max {:5} total dist {:8.3} avg dist {:8.6}",
        centroid_counts.len(),
        features.len(),
        centroid_counts.iter().copied().min().unwrap_or(0),
        centroid_counts.iter().copied().max().unwrap_or(0),
        total_dist,
        total_dist / features.len() as f64
    );

    Ok(())
}
