//! Per-class feature vectors and the extraction interface that produces them.

use std::{collections::HashSet, fs, path::Path};

use tracing::debug;

use crate::{
    input::{sanitize_nan, VecVectorStore, VectorStore},
    Error, Result,
};

/// Produces a fixed length feature vector for a single input sample, e.g. the output layer of a
/// vision model applied to one image.
pub trait FeatureExtractor: Send + Sync {
    /// Extract features for the sample at `input`.
    fn extract(&self, input: &Path) -> Result<Vec<f32>>;
}

/// Reads features that were produced ahead of time and stored as little-endian f32 values
/// written end-to-end, the same layout numpy uses for a flat `float32` array.
#[derive(Debug, Default, Clone, Copy)]
pub struct RawF32Extractor;

impl FeatureExtractor for RawF32Extractor {
    fn extract(&self, input: &Path) -> Result<Vec<f32>> {
        let bytes = fs::read(input)?;
        if bytes.len() % std::mem::size_of::<f32>() != 0 {
            return Err(Error::input(format!(
                "{} is not a whole number of f32 values ({} bytes)",
                input.display(),
                bytes.len()
            )));
        }
        Ok(bytes
            .chunks_exact(std::mem::size_of::<f32>())
            .map(|c| f32::from_le_bytes(c.try_into().expect("4 byte chunk")))
            .collect())
    }
}

/// Compute the mean feature vector over `inputs`.
///
/// Every sample is NaN sanitized and must have exactly `dimensions` components; a misshapen
/// sample aborts the whole computation.
pub fn average_features<'a, E, I>(extractor: &E, inputs: I, dimensions: usize) -> Result<Vec<f32>>
where
    E: FeatureExtractor + ?Sized,
    I: IntoIterator<Item = &'a Path>,
{
    let mut sum = vec![0.0f64; dimensions];
    let mut count = 0usize;
    for input in inputs {
        let mut features = extractor.extract(input)?;
        if features.len() != dimensions {
            return Err(Error::shape(
                format!("features for {}", input.display()),
                dimensions,
                features.len(),
            ));
        }
        let replaced = sanitize_nan(&mut features);
        if replaced > 0 {
            debug!(input = %input.display(), replaced, "replaced NaN feature values");
        }
        for (s, f) in sum.iter_mut().zip(features.iter()) {
            *s += *f as f64;
        }
        count += 1;
    }

    if count == 0 {
        return Err(Error::input("cannot average features over zero samples"));
    }
    Ok(sum.into_iter().map(|s| (s / count as f64) as f32).collect())
}

/// An immutable set of labeled feature vectors, one per class.
///
/// The identifier of each vector is its index in the set.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureSet {
    labels: Vec<String>,
    vectors: VecVectorStore<f32>,
}

impl FeatureSet {
    /// Build a feature set from `(label, vector)` pairs, preserving their order.
    ///
    /// NaN components are replaced with 0.0. Fails if any vector does not have `dimensions`
    /// components or if a label appears more than once.
    pub fn new<L, I>(dimensions: usize, entries: I) -> Result<Self>
    where
        L: Into<String>,
        I: IntoIterator<Item = (L, Vec<f32>)>,
    {
        if dimensions == 0 {
            return Err(Error::input("feature dimensions must be > 0"));
        }
        let mut labels = Vec::new();
        let mut seen = HashSet::new();
        let mut vectors = VecVectorStore::<f32>::new(dimensions);
        for (label, mut vector) in entries {
            let label = label.into();
            if vector.len() != dimensions {
                return Err(Error::shape(
                    format!("class {label}"),
                    dimensions,
                    vector.len(),
                ));
            }
            if !seen.insert(label.clone()) {
                return Err(Error::input(format!("duplicate class label {label}")));
            }
            sanitize_nan(&mut vector);
            vectors.push(&vector);
            labels.push(label);
        }
        Ok(Self { labels, vectors })
    }

    /// Number of dimensions in each vector.
    pub fn dimensions(&self) -> usize {
        self.vectors.elem_stride()
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Class labels in identifier order.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Label for the vector with identifier `id`.
    pub fn label(&self, id: usize) -> &str {
        &self.labels[id]
    }

    pub fn vectors(&self) -> &VecVectorStore<f32> {
        &self.vectors
    }
}
