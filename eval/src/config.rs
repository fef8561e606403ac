//! Protocol configuration merging.
//!
//! Applies case-specific overrides to the default protocol configuration.

use anyhow::Result;
use divider::io::config::ProtocolConfig;

use crate::case::CaseConfig;

/// Apply case configuration overrides to the base protocol config.
pub fn apply_case_config(
    mut base: ProtocolConfig,
    overrides: &CaseConfig,
) -> Result<ProtocolConfig> {
    if let Some(tolerance) = overrides.tolerance {
        base.tolerance = tolerance;
    }
    if let Some(settle_rounds) = overrides.settle_rounds {
        base.settle_rounds = settle_rounds;
    }
    if let Some(verify) = overrides.verify {
        base.verify = verify;
    }
    base.validate()?;
    Ok(base)
}
