use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;

#[derive(Debug, Deserialize, Clone)]
pub struct BenchConfig {
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    #[serde(default)]
    pub steps: Vec<Step>,
}

fn default_timeout() -> u64 {
    60
}

#[derive(Debug, Deserialize, Clone)]
pub struct Step {
    pub name: String,

    /// Only steps with `bench = true` contribute to the report.
    #[serde(default)]
    pub bench: bool,

    #[serde(default = "default_one")]
    pub tasks: usize,

    /// Maximum number of requests in flight for this step.
    #[serde(default = "default_one")]
    pub concurrency: usize,

    pub payload: Value,
}

fn default_one() -> usize {
    1
}

impl BenchConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).with_context(|| {
            format!("Failed to read config file {}", path.as_ref().display())
        })?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse TOML config")
    }
}
