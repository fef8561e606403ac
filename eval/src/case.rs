//! Case file parsing and validation.
//!
//! Cases are TOML files naming either four fixed agents or a seeded random
//! agent generator. See `eval/cases/` for examples.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow, bail};
use divider::agents::PiecewiseConstant;
use divider::core::valuation::Valuation;
use divider::io::scenario::{AgentSpec, Scenario};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;

/// A parsed case file containing metadata, config overrides, and agents.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct CaseFile {
    pub case: CaseMeta,
    #[serde(default)]
    pub config: CaseConfig,
    #[serde(default)]
    pub agents: Vec<AgentSpec>,
    pub random: Option<RandomAgents>,
}

/// Case metadata: identifier and description.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct CaseMeta {
    /// Unique identifier (slug format: `[a-z0-9_-]+`).
    pub id: String,
    pub description: String,
}

/// Protocol configuration overrides for the case.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct CaseConfig {
    pub tolerance: Option<f64>,
    pub settle_rounds: Option<u32>,
    pub verify: Option<bool>,
}

/// Seeded generator of piecewise-constant agents.
///
/// Run `n` of a case uses seed `seed + n`, so repeated runs explore new
/// instances while every run stays reproducible.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct RandomAgents {
    pub seed: u64,
    pub segments: usize,
    /// Densities are drawn from `0..=max_density`.
    pub max_density: u32,
}

impl CaseFile {
    /// Load and validate a case file from the given path.
    pub fn load(path: &Path) -> Result<Self> {
        let contents =
            fs::read_to_string(path).with_context(|| format!("read case {}", path.display()))?;
        let case: CaseFile =
            toml::from_str(&contents).with_context(|| format!("parse case {}", path.display()))?;
        case.validate()
            .with_context(|| format!("validate case {}", path.display()))?;
        Ok(case)
    }

    #[cfg(test)]
    pub fn parse_str(contents: &str) -> Result<Self> {
        let case: CaseFile = toml::from_str(contents).context("parse case")?;
        case.validate()?;
        Ok(case)
    }

    fn validate(&self) -> Result<()> {
        validate_case_id(&self.case.id)?;
        if self.case.description.trim().is_empty() {
            bail!("case.description must be non-empty");
        }
        if let Some(tolerance) = self.config.tolerance
            && !(tolerance.is_finite() && tolerance > 0.0)
        {
            bail!("config.tolerance must be a positive finite number");
        }
        match (&self.random, self.agents.is_empty()) {
            (Some(_), false) => bail!("case must use either [[agents]] or [random], not both"),
            (None, true) => bail!("case must define [[agents]] or [random]"),
            (Some(random), true) => {
                if random.segments == 0 {
                    bail!("random.segments must be > 0");
                }
                if random.max_density == 0 {
                    bail!("random.max_density must be > 0");
                }
            }
            (None, false) => {
                Scenario {
                    agents: self.agents.clone(),
                    config: Default::default(),
                }
                .validate()
                .context("agents invalid")?;
            }
        }
        Ok(())
    }

    /// Build the agents for run number `run` (0-based).
    pub fn build_agents(&self, run: u32) -> Result<Vec<Box<dyn Valuation>>> {
        let Some(random) = &self.random else {
            return Scenario {
                agents: self.agents.clone(),
                config: Default::default(),
            }
            .build_agents();
        };
        let mut rng = StdRng::seed_from_u64(random.seed.wrapping_add(u64::from(run)));
        (0..4)
            .map(|index| -> Result<Box<dyn Valuation>> {
                let mut values: Vec<f64> = (0..random.segments)
                    .map(|_| f64::from(rng.gen_range(0..=random.max_density)))
                    .collect();
                if values.iter().all(|value| *value == 0.0) {
                    let slot = rng.gen_range(0..random.segments);
                    values[slot] = 1.0;
                }
                let agent = PiecewiseConstant::new(format!("random-{}", index + 1), values)?;
                Ok(Box::new(agent))
            })
            .collect()
    }
}

/// Discover and load all case files from a directory.
///
/// Returns cases sorted by id. Errors if duplicate ids are found.
pub fn discover_cases(dir: &Path) -> Result<Vec<CaseFile>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut cases = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("read cases dir {}", dir.display()))? {
        let entry = entry.context("read case entry")?;
        let path = entry.path();
        if path.extension().and_then(|ext| ext.to_str()) != Some("toml") {
            continue;
        }
        cases.push(CaseFile::load(&path)?);
    }
    cases.sort_by(|left, right| left.case.id.cmp(&right.case.id));
    for pair in cases.windows(2) {
        if pair[0].case.id == pair[1].case.id {
            return Err(anyhow!("duplicate case.id {}", pair[0].case.id));
        }
    }
    Ok(cases)
}

fn validate_case_id(id: &str) -> Result<()> {
    if id.trim().is_empty() {
        bail!("case.id must be non-empty");
    }
    if !id
        .chars()
        .all(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '-' || ch == '_')
    {
        bail!("case.id must use [a-z0-9_-] only");
    }
    Ok(())
}
