//! Protocol configuration (TOML).

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

/// Tunables of one protocol run.
///
/// Missing fields default to the values below, so a scenario may override a
/// single knob.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ProtocolConfig {
    /// Absolute slack for every value comparison.
    pub tolerance: f64,

    /// Extra rotating-cutter rounds allowed after Phase Two.
    pub settle_rounds: u32,

    /// Check the partition and envy-freeness after every committed step.
    pub verify: bool,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            tolerance: 1e-9,
            settle_rounds: 12,
            verify: true,
        }
    }
}

impl ProtocolConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.tolerance.is_finite() || self.tolerance <= 0.0 {
            return Err(anyhow!("tolerance must be a positive finite number"));
        }
        Ok(())
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `ProtocolConfig::default()`.
pub fn load_config(path: &Path) -> Result<ProtocolConfig> {
    if !path.exists() {
        let cfg = ProtocolConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: ProtocolConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &ProtocolConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    let parent = path
        .parent()
        .with_context(|| format!("config path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, buf).with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_missing_returns_default() {
        let temp = tempfile::tempdir().expect("tempdir");
        let cfg = load_config(&temp.path().join("missing.toml")).expect("load");
        assert_eq!(cfg, ProtocolConfig::default());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("config.toml");
        fs::write(&path, "settle_rounds = 3\n").expect("write");
        let cfg = load_config(&path).expect("load");
        assert_eq!(cfg.settle_rounds, 3);
        assert_eq!(cfg.tolerance, 1e-9);
        assert!(cfg.verify);
    }

    #[test]
    fn write_then_load_preserves_values() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("nested").join("config.toml");
        let cfg = ProtocolConfig {
            tolerance: 1e-6,
            settle_rounds: 4,
            verify: false,
        };
        write_config(&path, &cfg).expect("write");
        assert_eq!(load_config(&path).expect("load"), cfg);
    }

    #[test]
    fn rejects_non_positive_tolerance() {
        let cfg = ProtocolConfig {
            tolerance: 0.0,
            ..ProtocolConfig::default()
        };
        assert!(cfg.validate().is_err());
    }
}
