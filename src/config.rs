//! Run configuration, loadable from JSON.

use std::{fs::File, io::BufReader, path::Path};

use serde::{Deserialize, Serialize};

use crate::{dataset::SampleOptions, driver::DriverConfig, kmeans::Params, Error, Result};

/// Everything needed to go from a training directory to written groupings.
///
/// Missing fields take their default values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Feature dimensions produced per sample.
    pub dimensions: usize,
    /// Maximum number of samples averaged per class.
    pub sample_size: usize,
    /// Extension of per-sample feature files.
    pub extension: String,
    pub kmeans: Params,
    /// Seed, candidate sizes, failure policy and parallelism, stored at the top level.
    #[serde(flatten)]
    pub driver: DriverConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dimensions: 1000,
            sample_size: 125,
            extension: "f32".to_string(),
            kmeans: Params::default(),
            driver: DriverConfig::default(),
        }
    }
}

impl Config {
    /// Read a JSON config from `path`.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => Error::MissingResource(path.to_path_buf()),
            _ => Error::Io(e),
        })?;
        let config: Self = serde_json::from_reader(BufReader::new(file))?;
        config.validate()?;
        Ok(config)
    }

    /// Check values that cannot be represented as invalid by their types.
    pub fn validate(&self) -> Result<()> {
        if self.dimensions == 0 {
            return Err(Error::input("dimensions must be > 0"));
        }
        if self.sample_size == 0 {
            return Err(Error::input("sample_size must be > 0"));
        }
        if self.kmeans.n_init == 0 {
            return Err(Error::input("kmeans.n_init must be > 0"));
        }
        Ok(())
    }

    pub fn sample_options(&self) -> SampleOptions {
        SampleOptions {
            dimensions: self.dimensions,
            sample_size: self.sample_size,
            extension: self.extension.clone(),
        }
    }
}

#[cfg(test)]
mod test {
    use std::fs;

    use super::Config;
    use crate::{
        driver::{OnError, SizeRange},
        kmeans::InitializationMethod,
        Error,
    };

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.dimensions, 1000);
        assert_eq!(config.sample_size, 125);
        assert_eq!(config.driver.seed, 42);
        assert!(config.validate().is_ok());
        assert_eq!(config.sample_options().extension, "f32");
    }

    #[test]
    fn partial_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{
                "dimensions": 4,
                "kmeans": {"initialization": "random"},
                "seed": 3,
                "on_error": "continue",
                "parallel": true
            }"#,
        )
        .unwrap();
        let config = Config::from_json_file(&path).unwrap();
        assert_eq!(config.dimensions, 4);
        assert_eq!(config.sample_size, 125);
        assert_eq!(config.kmeans.initialization, InitializationMethod::Random);
        assert_eq!(config.kmeans.iters, 300);
        assert_eq!(config.driver.seed, 3);
        assert_eq!(config.driver.on_error, OnError::Continue);
        assert!(config.driver.parallel);
    }

    #[test]
    fn driver_fields_at_top_level() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{"seed": 7, "on_error": "continue", "parallel": true, "sizes": {"max": 4}}"#,
        )
        .unwrap();
        let config = Config::from_json_file(&path).unwrap();
        assert_eq!(config.driver.seed, 7);
        assert_eq!(config.driver.on_error, OnError::Continue);
        assert!(config.driver.parallel);
        assert_eq!(config.driver.sizes, SizeRange { min: None, max: Some(4) });

        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["seed"], 7);
        assert!(json.get("driver").is_none());
    }

    #[test]
    fn invalid_files() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            Config::from_json_file(&dir.path().join("missing.json")),
            Err(Error::MissingResource(_))
        ));

        let path = dir.path().join("bad.json");
        fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            Config::from_json_file(&path),
            Err(Error::Config(_))
        ));

        fs::write(&path, r#"{"sample_size": 0}"#).unwrap();
        assert!(matches!(
            Config::from_json_file(&path),
            Err(Error::Input(_))
        ));
    }
}
