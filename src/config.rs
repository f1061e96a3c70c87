use crate::dataset::{DatasetSource, MissingSourcePolicy};
use crate::report::DEFAULT_TITLE;
use anyhow::{anyhow, Context};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const CONFIG_ENV: &str = "RESULTS_CONFIG";
pub const CSV_PATH_ENV: &str = "RESULTS_CSV_PATH";
pub const MISSING_SOURCE_ENV: &str = "RESULTS_MISSING_SOURCE";
pub const REPORT_TITLE_ENV: &str = "RESULTS_REPORT_TITLE";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServiceConfig {
    pub dataset_path: PathBuf,
    pub missing_source: MissingSourcePolicy,
    pub report_title: String,
    /// Rows included in `debug.snapshot`.
    pub sample_rows: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            dataset_path: PathBuf::from("results.csv"),
            missing_source: MissingSourcePolicy::Fail,
            report_title: DEFAULT_TITLE.to_string(),
            sample_rows: 3,
        }
    }
}

impl ServiceConfig {
    /// Defaults, then the JSON file named by `RESULTS_CONFIG`, then the
    /// individual environment overrides.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = match lookup(CONFIG_ENV).filter(|v| !v.trim().is_empty()) {
            Some(path) => Self::from_file(Path::new(path.trim()))?,
            None => Self::default(),
        };

        if let Some(path) = lookup(CSV_PATH_ENV).filter(|v| !v.trim().is_empty()) {
            cfg.dataset_path = PathBuf::from(path.trim());
        }
        if let Some(raw) = lookup(MISSING_SOURCE_ENV).filter(|v| !v.trim().is_empty()) {
            cfg.missing_source = MissingSourcePolicy::parse(&raw).ok_or_else(|| {
                anyhow!("{MISSING_SOURCE_ENV} must be fail or sample, got {raw:?}")
            })?;
        }
        if let Some(title) = lookup(REPORT_TITLE_ENV).filter(|v| !v.trim().is_empty()) {
            cfg.report_title = title;
        }
        Ok(cfg)
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.to_string_lossy()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("invalid config {}", path.to_string_lossy()))
    }

    pub fn dataset_source(&self) -> DatasetSource {
        DatasetSource {
            path: self.dataset_path.clone(),
            missing: self.missing_source,
        }
    }
}
