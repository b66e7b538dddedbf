use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("batch_concurrency must be at least 1")]
    ZeroConcurrency,
}

/// CLI configuration: optional TOML file, then `COMPLEXION_*` overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Images smaller than this on either side are rejected.
    pub min_resolution: u32,
    /// Pretty-print JSON output.
    pub pretty: bool,
    /// Maximum images analyzed at once by `batch`.
    pub batch_concurrency: usize,
    /// Sidecar landmark file suffix: `photo.jpg` -> `photo.jpg.<suffix>`.
    pub landmark_suffix: String,
    /// Treat "no face detected" as a failed analysis.
    pub reject_undetected: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            min_resolution: 480,
            pretty: false,
            batch_concurrency: 4,
            landmark_suffix: "landmarks.json".to_string(),
            reject_undetected: true,
        }
    }
}

impl Config {
    /// Load from `path` (or `COMPLEXION_CONFIG`), falling back to defaults
    /// when neither is set, then apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var("COMPLEXION_CONFIG").ok().map(PathBuf::from));

        let base = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
                    path: path.clone(),
                    source,
                })?;
                let config = Self::from_toml(&raw)?;
                tracing::debug!(path = %path.display(), "config file loaded");
                config
            }
            None => Self::default(),
        };

        base.with_overrides(|key| std::env::var(key).ok()).validated()
    }

    pub fn from_toml(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    /// Apply `COMPLEXION_*` overrides looked up through `var`. Unparseable
    /// values are ignored.
    pub fn with_overrides(self, var: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            min_resolution: parse_var(&var, "COMPLEXION_MIN_RESOLUTION", self.min_resolution),
            pretty: var("COMPLEXION_PRETTY").map(|v| v != "0").unwrap_or(self.pretty),
            batch_concurrency: parse_var(&var, "COMPLEXION_BATCH_CONCURRENCY", self.batch_concurrency),
            landmark_suffix: var("COMPLEXION_LANDMARK_SUFFIX").unwrap_or(self.landmark_suffix),
            reject_undetected: var("COMPLEXION_REJECT_UNDETECTED")
                .map(|v| v != "0")
                .unwrap_or(self.reject_undetected),
        }
    }

    fn validated(self) -> Result<Self, ConfigError> {
        if self.batch_concurrency == 0 {
            return Err(ConfigError::ZeroConcurrency);
        }
        Ok(self)
    }

    /// Sidecar landmark file for an image.
    pub fn landmark_path(&self, image: &Path) -> PathBuf {
        let mut name = image.as_os_str().to_owned();
        name.push(".");
        name.push(&self.landmark_suffix);
        PathBuf::from(name)
    }
}

fn parse_var<T: FromStr>(var: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    var(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}
