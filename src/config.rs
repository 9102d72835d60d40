use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::FetchErrorPolicy;
use crate::error::ScraperError;
use crate::gdc::{DEFAULT_BASE_URL, DEFAULT_TIMEOUT_SECS};

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub schema_version: Option<u32>,
    #[serde(default)]
    pub gene_mapping: Option<PathBuf>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub include_others: Option<bool>,
    #[serde(default)]
    pub on_fetch_error: Option<FetchErrorPolicy>,
    #[serde(default)]
    pub deseq_script: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub schema_version: u32,
    pub gene_mapping: Option<PathBuf>,
    pub base_url: String,
    pub timeout: Duration,
    pub include_others: bool,
    pub on_fetch_error: FetchErrorPolicy,
    pub deseq_script: Option<PathBuf>,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        ConfigLoader::resolve_config(Config::default(), None)
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Read a JSON config; `None` yields the defaults.
    pub fn resolve(path: Option<&Path>) -> Result<ResolvedConfig, ScraperError> {
        let Some(path) = path else {
            return Ok(ResolvedConfig::default());
        };
        let content =
            fs::read_to_string(path).map_err(|_| ScraperError::ConfigRead(path.to_path_buf()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| ScraperError::ConfigParse(err.to_string()))?;
        Ok(Self::resolve_config(config, path.parent()))
    }

    /// Relative paths in the config are resolved against `base_dir`.
    pub fn resolve_config(config: Config, base_dir: Option<&Path>) -> ResolvedConfig {
        let anchor = |path: PathBuf| match base_dir {
            Some(dir) if path.is_relative() => dir.join(path),
            _ => path,
        };
        ResolvedConfig {
            schema_version: config.schema_version.unwrap_or(1),
            gene_mapping: config.gene_mapping.map(anchor),
            base_url: config
                .base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            timeout: Duration::from_secs(config.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS)),
            include_others: config.include_others.unwrap_or(false),
            on_fetch_error: config.on_fetch_error.unwrap_or_default(),
            deseq_script: config.deseq_script.map(anchor),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_empty() {
        let resolved = ConfigLoader::resolve_config(Config::default(), None);
        assert_eq!(resolved.schema_version, 1);
        assert_eq!(resolved.base_url, DEFAULT_BASE_URL);
        assert!(!resolved.include_others);
        assert_eq!(resolved.on_fetch_error, FetchErrorPolicy::Abort);
        assert!(resolved.gene_mapping.is_none());
    }

    #[test]
    fn relative_paths_follow_config_dir() {
        let config = Config {
            gene_mapping: Some(PathBuf::from("maps/genes.json")),
            deseq_script: Some(PathBuf::from("/opt/run_deseq.R")),
            ..Config::default()
        };
        let resolved = ConfigLoader::resolve_config(config, Some(Path::new("/etc/tcga")));
        assert_eq!(
            resolved.gene_mapping,
            Some(PathBuf::from("/etc/tcga/maps/genes.json"))
        );
        assert_eq!(resolved.deseq_script, Some(PathBuf::from("/opt/run_deseq.R")));
    }
}
