//! Discovery of per-class samples under a `train/` directory and per-class feature extraction.

use std::{
    fs,
    path::{Path, PathBuf},
};

use rayon::prelude::*;
use tracing::info;

use crate::{
    features::{average_features, FeatureExtractor, FeatureSet},
    Error, Result,
};

/// Name of the directory under the root holding one sub-directory per class.
pub const TRAIN_DIR: &str = "train";

/// Options that control which samples are read for each class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleOptions {
    /// Number of feature dimensions produced for each sample.
    pub dimensions: usize,
    /// Maximum number of samples averaged for each class.
    pub sample_size: usize,
    /// File extension (without the dot) that identifies sample files.
    pub extension: String,
}

/// A training directory laid out as `<root>/train/<class>/<sample files>`.
#[derive(Debug, Clone)]
pub struct TrainingDir {
    root: PathBuf,
    train: PathBuf,
}

impl TrainingDir {
    /// Open the training directory under `root`.
    ///
    /// Fails with `Error::MissingResource` if `root/train` is not a directory.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let train = root.join(TRAIN_DIR);
        if !train.is_dir() {
            return Err(Error::MissingResource(train));
        }
        Ok(Self { root, train })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Class names, i.e. the sub-directories of `train/`, sorted by name.
    pub fn classes(&self) -> Result<Vec<String>> {
        let mut classes = Vec::new();
        for entry in fs::read_dir(&self.train)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let name = entry.file_name().into_string().map_err(|name| {
                Error::input(format!("class directory name {name:?} is not valid UTF-8"))
            })?;
            classes.push(name);
        }
        classes.sort();
        Ok(classes)
    }

    /// Sample files for `class` with the given extension, sorted by name and truncated to
    /// `sample_size` entries.
    pub fn samples(
        &self,
        class: &str,
        extension: &str,
        sample_size: usize,
    ) -> Result<Vec<PathBuf>> {
        let dir = self.train.join(class);
        if !dir.is_dir() {
            return Err(Error::MissingResource(dir));
        }
        let mut samples = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.is_file() && path.extension().is_some_and(|e| e == extension) {
                samples.push(path);
            }
        }
        samples.sort();
        samples.truncate(sample_size);
        Ok(samples)
    }

    /// Average the features of each class's samples into an immutable `FeatureSet`.
    ///
    /// Every class is processed; any failure aborts the whole extraction.
    pub fn extract_features<E: FeatureExtractor + ?Sized>(
        &self,
        extractor: &E,
        options: &SampleOptions,
    ) -> Result<FeatureSet> {
        let classes = self.classes()?;
        info!(
            classes = classes.len(),
            sample_size = options.sample_size,
            "extracting class features"
        );
        let entries = classes
            .into_par_iter()
            .map(|class| {
                let samples = self.samples(&class, &options.extension, options.sample_size)?;
                if samples.is_empty() {
                    return Err(Error::input(format!(
                        "class {class} has no .{} samples",
                        options.extension
                    )));
                }
                let features = average_features(
                    extractor,
                    samples.iter().map(PathBuf::as_path),
                    options.dimensions,
                )?;
                Ok((class, features))
            })
            .collect::<Result<Vec<_>>>()?;
        FeatureSet::new(options.dimensions, entries)
    }
}
