//! An implementation of k-means for estimating group centroids.

use rand::{
    distr::{weighted::WeightedIndex, Distribution},
    seq::index,
    Rng, SeedableRng,
};
use rand_xoshiro::Xoshiro256PlusPlus;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    distance::l2,
    input::{VecVectorStore, VectorStore},
    Error, Result,
};

/// Centroid initialization method for k-means partitioning.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InitializationMethod {
    /// Choose centers randomly from the data set.
    Random,
    /// Choose centers randomly from the data set weighted by distance to other centers.
    KMeansPlusPlus,
}

/// Parameters for k-means partitioning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Params {
    /// Maximum number of iterations to run before exiting, even if the centers have not converged.
    pub iters: usize,
    /// Number of times to run k-means from freshly initialized centroids. The run with the lowest
    /// inertia is kept.
    pub n_init: usize,
    /// Convergence epsilon. Computation is considered to have converged if the maximum distance
    /// any centroid moved between two iterations is less than this amount.
    pub epsilon: f64,
    /// Algorithm for computing initial centroids.
    pub initialization: InitializationMethod,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            iters: 300,
            n_init: 10,
            epsilon: 0.0001,
            initialization: InitializationMethod::KMeansPlusPlus,
        }
    }
}

/// Estimates `k` reference points for a set of vectors.
///
/// The order of the returned centroids is implementation defined and carries no meaning beyond
/// being fixed for a given call.
pub trait Clusterer: Send + Sync {
    /// Produce exactly `k` centroids for `vectors`. Implementations must be a pure function of
    /// the input and `seed`.
    fn cluster(&self, vectors: &VecVectorStore<f32>, k: usize, seed: u64)
        -> Result<VecVectorStore<f32>>;
}

/// `Clusterer` that runs Lloyd's algorithm with a seeded `Xoshiro256PlusPlus` generator.
#[derive(Debug, Clone, Default)]
pub struct KMeansClusterer {
    params: Params,
}

impl KMeansClusterer {
    pub fn new(params: Params) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &Params {
        &self.params
    }
}

impl Clusterer for KMeansClusterer {
    fn cluster(
        &self,
        vectors: &VecVectorStore<f32>,
        k: usize,
        seed: u64,
    ) -> Result<VecVectorStore<f32>> {
        if vectors.is_empty() {
            return Err(Error::input("cannot cluster an empty vector set"));
        }
        if k == 0 || k > vectors.len() {
            return Err(Error::input(format!(
                "cluster count {k} must be between 1 and the number of vectors ({})",
                vectors.len()
            )));
        }

        let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
        match kmeans(vectors, k, &self.params, &mut rng) {
            Ok(centroids) => Ok(centroids),
            Err(centroids) => {
                warn!(
                    k,
                    iters = self.params.iters,
                    "k-means failed to converge; using best centroids found"
                );
                Ok(centroids)
            }
        }
    }
}

/// Compute k-means over `dataset` using Lloyd's algorithm.
///
/// The whole procedure is repeated `params.n_init` times and the centroids with the lowest
/// inertia are kept.
///
/// Returns the computed centroids -- `Ok()` if the best run converged and `Err()` if it
/// terminated by reaching max iterations.
///
/// Panics if `k` is zero or greater than the number of vectors in `dataset`.
pub fn kmeans<V: VectorStore + Sync>(
    dataset: &V,
    k: usize,
    params: &Params,
    rng: &mut impl Rng,
) -> std::result::Result<VecVectorStore<f32>, VecVectorStore<f32>> {
    assert!(k > 0 && k <= dataset.len());

    let (centroids, inertia, converged) = (0..params.n_init.max(1))
        .map(|_| lloyd(dataset, k, params, rng))
        .reduce(|best, run| if run.1 < best.1 { run } else { best })
        .expect("at least one run");
    debug!(k, inertia, converged, "k-means finished");

    if converged {
        Ok(centroids)
    } else {
        Err(centroids)
    }
}

/// A single k-means run from freshly initialized centroids.
///
/// Returns the centroids, the inertia (sum of squared distances to the assigned centroid) and
/// whether the run converged.
fn lloyd<V: VectorStore + Sync>(
    dataset: &V,
    k: usize,
    params: &Params,
    rng: &mut impl Rng,
) -> (VecVectorStore<f32>, f64, bool) {
    let mut centroids = initialize_centroids(dataset, k, params.initialization, rng);
    let mut assignments = compute_assignments(dataset, &centroids);
    let mut converged = false;
    for _ in 0..params.iters {
        let new_centroids = compute_centroids(dataset, &assignments, &centroids);
        let centroid_distance_max = compute_centroid_distance_max(&centroids, &new_centroids);
        centroids = new_centroids;

        let new_assignments = compute_assignments(dataset, &centroids);
        let stable = new_assignments
            .iter()
            .zip(assignments.iter())
            .all(|(a, b)| a.0 == b.0);
        assignments = new_assignments;
        if stable || centroid_distance_max < params.epsilon {
            converged = true;
            break;
        }
    }

    let inertia = assignments.iter().map(|(_, d)| d * d).sum::<f64>();
    (centroids, inertia, converged)
}

fn initialize_centroids<V: VectorStore + Sync>(
    dataset: &V,
    k: usize,
    method: InitializationMethod,
    rng: &mut impl Rng,
) -> VecVectorStore<f32> {
    let mut centroids = VecVectorStore::<f32>::with_capacity(dataset.elem_stride(), k);
    match method {
        InitializationMethod::Random => {
            for i in index::sample(rng, dataset.len(), k).into_vec() {
                centroids.push(&dataset[i]);
            }
        }
        InitializationMethod::KMeansPlusPlus => {
            centroids.push(&dataset[rng.random_range(0..dataset.len())]);
            let mut assignments = compute_assignments(dataset, &centroids);
            while centroids.len() < k {
                // All remaining weight may be zero if the dataset contains duplicates; fall back
                // to a uniform choice in that case.
                let next = match WeightedIndex::new(assignments.iter().map(|a| a.1 * a.1)) {
                    Ok(weights) => weights.sample(rng),
                    Err(_) => rng.random_range(0..dataset.len()),
                };

                let centroid = centroids.len();
                centroids.push(&dataset[next]);
                let centroid_vector = &centroids[centroid];
                let distances = (0..dataset.len())
                    .into_par_iter()
                    .map(|i| l2(&dataset[i], centroid_vector))
                    .collect::<Vec<_>>();
                for ((cluster, distance), new_distance) in
                    assignments.iter_mut().zip(distances.into_iter())
                {
                    if new_distance < *distance {
                        *cluster = centroid;
                        *distance = new_distance;
                    }
                }
            }
        }
    }
    centroids
}

/// For each input vector compute the closest centroid and the distance to that centroid.
///
/// Ties are resolved in favor of the centroid with the lowest index.
pub fn compute_assignments<V: VectorStore + Sync, C: VectorStore + Sync>(
    dataset: &V,
    centroids: &C,
) -> Vec<(usize, f64)> {
    (0..dataset.len())
        .into_par_iter()
        .map(|i| {
            let v = &dataset[i];
            centroids
                .iter()
                .map(|c| l2(v, c))
                .enumerate()
                .min_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(&b.0)))
                .expect("at least one centroid")
        })
        .collect()
}

/// Recompute each centroid as the mean of its assigned vectors.
///
/// Centroids with no assigned vectors keep their previous position. Sums are accumulated
/// serially in input order so that results are reproducible for a fixed seed.
fn compute_centroids<V: VectorStore>(
    dataset: &V,
    assignments: &[(usize, f64)],
    previous: &VecVectorStore<f32>,
) -> VecVectorStore<f32> {
    let stride = dataset.elem_stride();
    let mut sums = vec![0.0f64; previous.len() * stride];
    let mut counts = vec![0usize; previous.len()];
    for (vector, (cluster, _)) in dataset.iter().zip(assignments.iter()) {
        counts[*cluster] += 1;
        for (s, d) in sums[(cluster * stride)..((cluster + 1) * stride)]
            .iter_mut()
            .zip(vector.iter())
        {
            *s += *d as f64;
        }
    }

    let mut centroids = VecVectorStore::<f32>::with_capacity(stride, previous.len());
    let mut centroid = vec![0.0f32; stride];
    for (i, count) in counts.into_iter().enumerate() {
        if count == 0 {
            centroids.push(&previous[i]);
            continue;
        }
        for (c, s) in centroid
            .iter_mut()
            .zip(sums[(i * stride)..((i + 1) * stride)].iter())
        {
            *c = (*s / count as f64) as f32;
        }
        centroids.push(&centroid);
    }
    centroids
}

/// Compute the maximum distance between new and old centroids.
fn compute_centroid_distance_max<C: VectorStore + Sync, D: VectorStore + Sync>(
    old: &C,
    new: &D,
) -> f64 {
    (0..old.len())
        .into_par_iter()
        .map(|i| l2(&old[i], &new[i]))
        .max_by(|a, b| a.total_cmp(b))
        .expect("non-zero k")
}
