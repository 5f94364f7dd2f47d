//! Balanced partitioning of a feature set into bounded groups.
//!
//! Centroids come from a `Clusterer`. Each centroid, in the order the clusterer returned them,
//! claims the `max_group_size` closest vectors that have not yet been claimed. This is a greedy
//! approximation: there is no reassignment pass afterwards, so a centroid processed late may be
//! left with vectors that are far from it.

use std::num::NonZero;

use tracing::debug;

use crate::{
    distance::l2,
    features::FeatureSet,
    input::{SubsetViewVectorStore, VectorStore},
    kmeans::Clusterer,
    Error, Result,
};

/// Identifiers claimed by a single centroid, ordered by ascending distance to that centroid.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Group(Vec<usize>);

impl Group {
    pub fn ids(&self) -> &[usize] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.0.iter().copied()
    }
}

impl From<Vec<usize>> for Group {
    fn from(value: Vec<usize>) -> Self {
        Self(value)
    }
}

/// An ordered sequence of disjoint groups that together cover every input identifier exactly
/// once. Groups appear in centroid processing order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    max_group_size: NonZero<usize>,
    groups: Vec<Group>,
}

impl Partition {
    /// The bound on group size this partition was built with.
    pub fn max_group_size(&self) -> NonZero<usize> {
        self.max_group_size
    }

    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    /// Number of groups, including any empty ones.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Group> {
        self.groups.iter()
    }

    /// Total number of identifiers across all groups.
    pub fn assigned(&self) -> usize {
        self.groups.iter().map(Group::len).sum()
    }

    /// Resolve identifiers to class labels, one `Vec` per group.
    pub fn labels<'a>(&self, features: &'a FeatureSet) -> Vec<Vec<&'a str>> {
        self.groups
            .iter()
            .map(|g| g.iter().map(|id| features.label(id)).collect())
            .collect()
    }
}

/// Number of groups needed to hold `n` items when no group exceeds `max_group_size`.
pub fn group_count(n: usize, max_group_size: NonZero<usize>) -> usize {
    n.div_ceil(max_group_size.get())
}

/// Greedily assign every vector in `dataset` to one of `centroids`.
///
/// For each centroid in order, the vectors still in the pool are sorted by Euclidean distance to
/// the centroid (ties keep input order) and the closest `max_group_size` are removed from the
/// pool to form that centroid's group. If the pool runs dry the remaining groups are empty.
///
/// Fails if `max_group_size` is zero, if there are no centroids, if the centroids cannot hold
/// every vector, or if centroid and vector dimensions disagree.
pub fn greedy_assign<V: VectorStore, C: VectorStore>(
    dataset: &V,
    centroids: &C,
    max_group_size: usize,
) -> Result<Partition> {
    let max_group_size = NonZero::new(max_group_size)
        .ok_or_else(|| Error::input("max group size must be at least 1"))?;
    if centroids.is_empty() {
        return Err(Error::input("at least one centroid is required"));
    }
    if centroids.elem_stride() != dataset.elem_stride() {
        return Err(Error::shape(
            "centroid dimensions",
            dataset.elem_stride(),
            centroids.elem_stride(),
        ));
    }
    if centroids.len().saturating_mul(max_group_size.get()) < dataset.len() {
        return Err(Error::input(format!(
            "{} centroids with max group size {} cannot hold {} vectors",
            centroids.len(),
            max_group_size,
            dataset.len()
        )));
    }

    // Unclaimed vectors, always kept in input order.
    let mut pool = SubsetViewVectorStore::new(dataset, (0..dataset.len()).collect());
    let mut groups = Vec::with_capacity(centroids.len());
    for centroid in centroids.iter() {
        let mut scored = pool
            .iter()
            .enumerate()
            .map(|(i, v)| (pool.original_index(i), l2(centroid, v)))
            .collect::<Vec<_>>();
        // Stable sort so that equidistant vectors keep pool order.
        scored.sort_by(|a, b| a.1.total_cmp(&b.1));

        let take = max_group_size.get().min(scored.len());
        let group = scored[..take].iter().map(|(i, _)| *i).collect::<Vec<_>>();
        let mut remaining = scored[take..].iter().map(|(i, _)| *i).collect::<Vec<_>>();
        remaining.sort_unstable();
        pool = SubsetViewVectorStore::new(dataset, remaining);

        debug!(group_len = group.len(), remaining = pool.len(), "claimed group");
        groups.push(Group(group));
    }

    debug_assert!(pool.is_empty());
    Ok(Partition {
        max_group_size,
        groups,
    })
}

/// Partition `features` into `ceil(N / max_group_size)` groups of at most `max_group_size`.
///
/// Centroids are estimated by `clusterer` using `seed`, then vectors are assigned with
/// `greedy_assign()`.
pub fn partition(
    features: &FeatureSet,
    max_group_size: usize,
    clusterer: &dyn Clusterer,
    seed: u64,
) -> Result<Partition> {
    let max_group_size_nz = NonZero::new(max_group_size)
        .ok_or_else(|| Error::input("max group size must be at least 1"))?;
    if features.is_empty() {
        return Err(Error::input("cannot partition an empty feature set"));
    }
    let k = group_count(features.len(), max_group_size_nz);
    let centroids = clusterer.cluster(features.vectors(), k, seed)?;
    if centroids.len() != k {
        return Err(Error::input(format!(
            "clusterer returned {} centroids, expected {k}",
            centroids.len()
        )));
    }
    greedy_assign(features.vectors(), &centroids, max_group_size)
}

#[cfg(test)]
mod test {
    use std::{collections::HashSet, num::NonZero};

    use super::{greedy_assign, group_count, partition, Group, Partition};
    use crate::{
        features::FeatureSet,
        input::VecVectorStore,
        kmeans::{Clusterer, KMeansClusterer},
        Error, Result,
    };

    /// Clusterer that ignores its input and returns a fixed set of centroids.
    struct FixedClusterer(VecVectorStore<f32>);

    impl Clusterer for FixedClusterer {
        fn cluster(
            &self,
            _vectors: &VecVectorStore<f32>,
            _k: usize,
            _seed: u64,
        ) -> Result<VecVectorStore<f32>> {
            Ok(self.0.clone())
        }
    }

    fn store(points: &[f32]) -> VecVectorStore<f32> {
        let mut store = VecVectorStore::<f32>::with_capacity(1, points.len());
        for p in points {
            store.push(&[*p]);
        }
        store
    }

    fn scenario() -> FeatureSet {
        FeatureSet::new(
            1,
            [
                ("A", vec![0.0]),
                ("B", vec![1.0]),
                ("C", vec![10.0]),
                ("D", vec![11.0]),
                ("E", vec![20.0]),
            ],
        )
        .unwrap()
    }

    /// A deterministic spread of 2d points with several loose clusters.
    fn spread(n: usize) -> FeatureSet {
        FeatureSet::new(
            2,
            (0..n).map(|i| {
                let x = (i % 7) as f32 * 3.0 + (i as f32 * 0.37).sin();
                let y = (i % 5) as f32 * 2.0 + (i as f32 * 0.11).cos();
                (format!("c{i}"), vec![x, y])
            }),
        )
        .unwrap()
    }

    fn assert_valid(p: &Partition, n: usize, max_group_size: usize) {
        assert_eq!(
            p.len(),
            group_count(n, NonZero::new(max_group_size).unwrap())
        );
        assert!(p.iter().all(|g| g.len() <= max_group_size));
        let mut seen = HashSet::new();
        for id in p.iter().flat_map(|g| g.iter()) {
            assert!(seen.insert(id), "{id} assigned twice");
        }
        assert_eq!(seen, (0..n).collect::<HashSet<_>>());
        assert_eq!(p.assigned(), n);
    }

    #[test]
    fn group_counts() {
        let nz = |n: usize| NonZero::new(n).unwrap();
        assert_eq!(group_count(5, nz(2)), 3);
        assert_eq!(group_count(4, nz(2)), 2);
        assert_eq!(group_count(1, nz(7)), 1);
        assert_eq!(group_count(7, nz(1)), 7);
    }

    #[test]
    fn scenario_near_pairs_stay_together() {
        let features = scenario();
        let clusterer = FixedClusterer(store(&[0.5, 10.5, 20.0]));
        let p = partition(&features, 2, &clusterer, 0).unwrap();
        assert_eq!(
            p.labels(&features),
            vec![vec!["A", "B"], vec!["C", "D"], vec!["E"]]
        );

        let clusterer = FixedClusterer(store(&[10.5, 0.5, 20.0]));
        let p = partition(&features, 2, &clusterer, 0).unwrap();
        assert_eq!(
            p.labels(&features),
            vec![vec!["C", "D"], vec!["A", "B"], vec!["E"]]
        );
    }

    #[test]
    fn scenario_with_kmeans() {
        let features = scenario();
        let p = partition(&features, 2, &KMeansClusterer::default(), 42).unwrap();
        assert_valid(&p, 5, 2);
        let mut sizes = p.iter().map(Group::len).collect::<Vec<_>>();
        sizes.sort();
        assert_eq!(sizes, vec![1, 2, 2]);
        // A and B are closer to each other than to anything else whichever centroid goes first.
        let group_of = |id: usize| p.iter().position(|g| g.iter().any(|i| i == id));
        assert!(group_of(0).is_some());
        assert_eq!(group_of(0), group_of(1));
    }

    #[test]
    fn ties_keep_input_order() {
        let dataset = store(&[1.0, -1.0, 1.0, 3.0]);
        let p = greedy_assign(&dataset, &store(&[0.0, 3.0]), 2).unwrap();
        assert_eq!(p.groups(), &[Group::from(vec![0, 1]), Group::from(vec![3, 2])]);
    }

    #[test]
    fn group_order_is_distance_order() {
        let dataset = store(&[5.0, 1.0, 3.0, 0.0]);
        let p = greedy_assign(&dataset, &store(&[0.0]), 4).unwrap();
        assert_eq!(p.groups(), &[Group::from(vec![3, 1, 2, 0])]);
    }

    #[test]
    fn extra_centroids_produce_empty_groups() {
        let dataset = store(&[0.0, 1.0, 2.0]);
        let p = greedy_assign(&dataset, &store(&[0.0, 1.0, 2.0]), 3).unwrap();
        assert_eq!(p.len(), 3);
        assert_eq!(p.groups()[0].ids(), &[0, 1, 2]);
        assert!(p.groups()[1].is_empty());
        assert!(p.groups()[2].is_empty());
        assert_eq!(p.assigned(), 3);
    }

    #[test]
    fn max_group_size_at_least_n() {
        let features = spread(9);
        for max_group_size in [9, 10, 100] {
            let p = partition(&features, max_group_size, &KMeansClusterer::default(), 1).unwrap();
            assert_eq!(p.len(), 1);
            assert_valid(&p, 9, max_group_size);
        }
    }

    #[test]
    fn singleton_groups() {
        let features = spread(8);
        let p = partition(&features, 1, &KMeansClusterer::default(), 1).unwrap();
        assert_eq!(p.len(), 8);
        assert!(p.iter().all(|g| g.len() == 1));
        assert_valid(&p, 8, 1);
    }

    #[test]
    fn single_vector() {
        let features = FeatureSet::new(3, [("only", vec![1.0, 2.0, 3.0])]).unwrap();
        for max_group_size in [1, 2, 50] {
            let p = partition(&features, max_group_size, &KMeansClusterer::default(), 9).unwrap();
            assert_eq!(p.groups(), &[Group::from(vec![0])]);
        }
    }

    #[test]
    fn partition_properties() {
        let features = spread(23);
        for max_group_size in 1..=24 {
            let p = partition(&features, max_group_size, &KMeansClusterer::default(), 5).unwrap();
            assert_valid(&p, 23, max_group_size);
        }
    }

    #[test]
    fn deterministic_with_seed() {
        let features = spread(30);
        let clusterer = KMeansClusterer::default();
        for max_group_size in [2, 4, 7] {
            let a = partition(&features, max_group_size, &clusterer, 1234).unwrap();
            let b = partition(&features, max_group_size, &clusterer, 1234).unwrap();
            assert_eq!(a, b);
        }
    }

    #[test]
    fn shape_mismatch() {
        let dataset = store(&[0.0, 1.0]);
        let mut centroids = VecVectorStore::<f32>::new(2);
        centroids.push(&[0.0, 0.0]);
        assert!(matches!(
            greedy_assign(&dataset, &centroids, 2),
            Err(Error::Shape {
                expected: 1,
                actual: 2,
                ..
            })
        ));
    }

    #[test]
    fn shape_mismatch_from_clusterer() {
        let features = scenario();
        let mut centroids = VecVectorStore::<f32>::new(2);
        for _ in 0..3 {
            centroids.push(&[0.0, 0.0]);
        }
        assert!(matches!(
            partition(&features, 2, &FixedClusterer(centroids), 0),
            Err(Error::Shape { .. })
        ));
    }

    #[test]
    fn invalid_parameters() {
        let dataset = store(&[0.0, 1.0, 2.0]);
        assert!(matches!(
            greedy_assign(&dataset, &store(&[0.0, 1.0]), 0),
            Err(Error::Input(_))
        ));
        assert!(matches!(
            greedy_assign(&dataset, &store(&[0.0]), 2),
            Err(Error::Input(_))
        ));
        assert!(matches!(
            greedy_assign(&dataset, &VecVectorStore::<f32>::new(1), 2),
            Err(Error::Input(_))
        ));
        assert!(matches!(
            partition(&scenario(), 0, &KMeansClusterer::default(), 0),
            Err(Error::Input(_))
        ));
        assert!(matches!(
            partition(
                &FeatureSet::new(1, Vec::<(String, Vec<f32>)>::new()).unwrap(),
                2,
                &KMeansClusterer::default(),
                0
            ),
            Err(Error::Input(_))
        ));
    }

    #[test]
    fn wrong_centroid_count() {
        let features = scenario();
        let clusterer = FixedClusterer(store(&[0.0, 10.0]));
        assert!(matches!(
            partition(&features, 2, &clusterer, 0),
            Err(Error::Input(_))
        ));
    }
}
