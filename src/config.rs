use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::project::Workspace;

pub const TIMEOUT_ENV: &str = "CLASSPATH_BRIDGE_TIMEOUT_MS";
pub const WORKSPACE_ENV: &str = "CLASSPATH_BRIDGE_WORKSPACE";
pub const LOG_ENV: &str = "CLASSPATH_BRIDGE_LOG";

const DEFAULT_QUERY_TIMEOUT_MS: u64 = 30_000;

/// Runtime knobs shared by the caches and the query layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Upper bound on waiting for a project's index task, in milliseconds.
    pub query_timeout_ms: u64,
    /// File extensions (without the dot) that belong to the guest language.
    pub guest_extensions: Vec<String>,
    /// Catalog classpath roots on the rayon pool.
    pub parallel_index: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            query_timeout_ms: DEFAULT_QUERY_TIMEOUT_MS,
            guest_extensions: vec!["kt".to_string(), "kts".to_string()],
            parallel_index: true,
        }
    }
}

impl BridgeConfig {
    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.query_timeout_ms)
    }

    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Defaults, then the environment, then explicit overrides.
    pub fn resolve(timeout_ms: Option<u64>) -> Result<Self> {
        let mut config = Self::default();
        if let Ok(raw) = env::var(TIMEOUT_ENV) {
            config.query_timeout_ms = parse_timeout_ms(&raw)
                .with_context(|| format!("Invalid {TIMEOUT_ENV} value: {raw:?}"))?;
        }
        if let Some(ms) = timeout_ms {
            config.query_timeout_ms = ms;
        }
        Ok(config)
    }
}

fn parse_timeout_ms(raw: &str) -> Result<u64> {
    let ms: u64 = raw.trim().parse()?;
    anyhow::ensure!(ms > 0, "timeout must be positive");
    Ok(ms)
}

pub fn resolve_workspace_path(flag: Option<&Path>) -> Result<PathBuf> {
    if let Some(p) = flag {
        return Ok(p.to_path_buf());
    }

    if let Ok(p) = env::var(WORKSPACE_ENV) {
        return Ok(PathBuf::from(p));
    }

    Ok(bridge_home()?.join("workspace.json"))
}

pub fn load_workspace(path: &Path) -> Result<Workspace> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read workspace file: {}", path.display()))?;
    Workspace::from_json(&raw)
        .with_context(|| format!("Failed to parse workspace file: {}", path.display()))
}

fn bridge_home() -> Result<PathBuf> {
    let base = dirs::config_dir()
        .or_else(dirs::home_dir)
        .ok_or_else(|| anyhow::anyhow!("Failed to resolve config directory"))?;
    Ok(base.join("classpath-bridge"))
}
