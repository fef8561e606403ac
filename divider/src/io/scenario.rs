//! Scenario files: four agents plus optional config overrides.
//!
//! ```toml
//! [[agents]]
//! name = "alice"
//! values = [4, 3, 2, 1]
//! normalized = true
//!
//! [config]
//! tolerance = 1e-9
//! ```

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use crate::agents::{Normalized, PiecewiseConstant};
use crate::core::types::AGENT_COUNT;
use crate::core::valuation::Valuation;
use crate::io::config::ProtocolConfig;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct AgentSpec {
    pub name: String,
    /// Density of each unit segment.
    pub values: Vec<f64>,
    /// Rescale to a unit cake worth 1.
    #[serde(default)]
    pub normalized: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    pub agents: Vec<AgentSpec>,
    #[serde(default)]
    pub config: ProtocolConfig,
}

impl Scenario {
    pub fn parse(contents: &str) -> Result<Self> {
        let scenario: Scenario = toml::from_str(contents).context("parse scenario toml")?;
        scenario.validate()?;
        Ok(scenario)
    }

    pub fn validate(&self) -> Result<()> {
        if self.agents.len() != AGENT_COUNT {
            bail!(
                "scenario must name exactly {} agents (got {})",
                AGENT_COUNT,
                self.agents.len()
            );
        }
        for (index, agent) in self.agents.iter().enumerate() {
            if agent.name.trim().is_empty() {
                bail!("agent #{} has an empty name", index + 1);
            }
            if self.agents[..index].iter().any(|other| other.name == agent.name) {
                bail!("duplicate agent name '{}'", agent.name);
            }
        }
        let normalized = self.agents.iter().filter(|agent| agent.normalized).count();
        if normalized != 0 && normalized != self.agents.len() {
            bail!("either every agent is normalized or none is");
        }
        if normalized == 0 {
            let segments = self.agents[0].values.len();
            if let Some(agent) = self.agents.iter().find(|agent| agent.values.len() != segments) {
                bail!(
                    "agent '{}' has {} segments but '{}' has {}",
                    agent.name,
                    agent.values.len(),
                    self.agents[0].name,
                    segments
                );
            }
        }
        self.config.validate()
    }

    /// Build the valuation oracles in scenario order.
    pub fn build_agents(&self) -> Result<Vec<Box<dyn Valuation>>> {
        self.agents
            .iter()
            .map(|spec| {
                let agent = PiecewiseConstant::new(spec.name.clone(), spec.values.clone())
                    .with_context(|| format!("build agent '{}'", spec.name))?;
                let boxed: Box<dyn Valuation> = if spec.normalized {
                    Box::new(Normalized::new(agent))
                } else {
                    Box::new(agent)
                };
                Ok(boxed)
            })
            .collect()
    }
}

/// Read and validate a scenario file.
pub fn load_scenario(path: &Path) -> Result<Scenario> {
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    Scenario::parse(&contents).with_context(|| format!("load scenario {}", path.display()))
}
