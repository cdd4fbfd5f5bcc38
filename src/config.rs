//! TOML configuration parsing and validation.
//!
//! One [`Config`] is loaded at startup and passed explicitly to the
//! services that need it. Every section except `[db]` and `[storage]` has
//! defaults.
//!
//! ```toml
//! [db]
//! path = "./data/copycheck.sqlite"
//!
//! [storage]
//! root = "./data/files"
//!
//! [detection]
//! threshold = 0.85
//! shingle_len = 3
//! scan_concurrency = 4
//!
//! [server]
//! bind = "127.0.0.1:8080"
//! max_upload_bytes = 52428800
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub detection: DetectionConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

/// Where uploaded blobs are written.
#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    pub root: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DetectionConfig {
    /// Scores strictly above this are flagged as plagiarized.
    #[serde(default = "default_threshold")]
    pub threshold: f64,
    #[serde(default = "default_shingle_len")]
    pub shingle_len: usize,
    /// Prior works compared at the same time during one submission.
    #[serde(default = "default_scan_concurrency")]
    pub scan_concurrency: usize,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            shingle_len: default_shingle_len(),
            scan_concurrency: default_scan_concurrency(),
        }
    }
}

fn default_threshold() -> f64 {
    0.85
}
fn default_shingle_len() -> usize {
    copycheck_core::similarity::DEFAULT_SHINGLE_LEN
}
fn default_scan_concurrency() -> usize {
    4
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}
fn default_max_upload_bytes() -> usize {
    50 * 1024 * 1024
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    parse_config(&content)
}

/// Parse and validate configuration text.
pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if !(0.0..=1.0).contains(&config.detection.threshold) {
        anyhow::bail!("detection.threshold must be in [0.0, 1.0]");
    }
    if config.detection.shingle_len == 0 {
        anyhow::bail!("detection.shingle_len must be > 0");
    }
    if config.detection.scan_concurrency == 0 {
        anyhow::bail!("detection.scan_concurrency must be > 0");
    }
    if config.server.max_upload_bytes == 0 {
        anyhow::bail!("server.max_upload_bytes must be > 0");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
[db]
path = "/tmp/copycheck.sqlite"

[storage]
root = "/tmp/copycheck-files"
"#;

    #[test]
    fn defaults_apply() {
        let cfg = parse_config(MINIMAL).unwrap();
        assert_eq!(cfg.detection.threshold, 0.85);
        assert_eq!(cfg.detection.shingle_len, 3);
        assert_eq!(cfg.detection.scan_concurrency, 4);
        assert_eq!(cfg.server.bind, "127.0.0.1:8080");
        assert_eq!(cfg.server.max_upload_bytes, 50 * 1024 * 1024);
    }

    #[test]
    fn overrides_are_read() {
        let cfg = parse_config(&format!(
            "{}\n[detection]\nthreshold = 0.5\nshingle_len = 2\n\n[server]\nbind = \"0.0.0.0:9090\"\n",
            MINIMAL
        ))
        .unwrap();
        assert_eq!(cfg.detection.threshold, 0.5);
        assert_eq!(cfg.detection.shingle_len, 2);
        assert_eq!(cfg.server.bind, "0.0.0.0:9090");
    }

    #[test]
    fn threshold_out_of_range_is_rejected() {
        let err = parse_config(&format!("{}\n[detection]\nthreshold = 1.5\n", MINIMAL)).unwrap_err();
        assert!(err.to_string().contains("threshold"));
    }

    #[test]
    fn zero_shingle_len_is_rejected() {
        let err = parse_config(&format!("{}\n[detection]\nshingle_len = 0\n", MINIMAL)).unwrap_err();
        assert!(err.to_string().contains("shingle_len"));
    }

    #[test]
    fn zero_concurrency_is_rejected() {
        assert!(parse_config(&format!("{}\n[detection]\nscan_concurrency = 0\n", MINIMAL)).is_err());
    }

    #[test]
    fn missing_storage_section_fails() {
        assert!(parse_config("[db]\npath = \"x.sqlite\"\n").is_err());
    }
}
