//! Solver run configuration (`reassign.toml`).

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::{CoreError, CoreResult};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    pub run: RunConfig,
    pub search: SearchConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub mode: RunMode,
}

/// What a run does once the problem is loaded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunMode {
    /// Invoke the strategy, validate, write the candidate.
    #[default]
    Optimize,
    /// Write the baseline unchanged without invoking the strategy.
    Passthrough,
    /// Do nothing and write nothing. Used to measure harness overhead.
    NoOutput,
}

/// Which optimizer strategy to run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyKind {
    /// Return the baseline as the candidate.
    Identity,
    /// Feasible single-move descent.
    #[default]
    LocalSearch,
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StrategyKind::Identity => write!(f, "identity"),
            StrategyKind::LocalSearch => write!(f, "local-search"),
        }
    }
}

impl std::str::FromStr for StrategyKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "identity" => Ok(StrategyKind::Identity),
            "local-search" | "local_search" => Ok(StrategyKind::LocalSearch),
            _ => Err(CoreError::Config(format!("unknown strategy: {s}"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub strategy: StrategyKind,
    /// Wall-clock budget for the strategy.
    pub time_limit_secs: u64,
    pub max_iterations: u64,
    /// Offsets the order in which processes are scanned.
    pub seed: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            strategy: StrategyKind::default(),
            time_limit_secs: 300,
            max_iterations: 1_000_000,
            seed: 0,
        }
    }
}

impl SearchConfig {
    pub fn time_limit(&self) -> Duration {
        Duration::from_secs(self.time_limit_secs)
    }
}

impl SolverConfig {
    pub fn from_file(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| CoreError::io(path, e))?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> CoreResult<Self> {
        toml::from_str(content).map_err(|e| CoreError::Config(e.to_string()))
    }

    pub fn to_toml_string(&self) -> CoreResult<String> {
        toml::to_string_pretty(self).map_err(|e| CoreError::Config(e.to_string()))
    }
}
