use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub vinculos: VinculosConfig,
    #[serde(default)]
    pub discovery: DiscoveryConfig,
}

/// Vinculos-specific configuration
#[derive(Debug, Clone, Deserialize)]
pub struct VinculosConfig {
    pub db_path: PathBuf,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Tuning knobs for the discovery engine
#[derive(Debug, Clone, Deserialize)]
pub struct DiscoveryConfig {
    /// Cap on how many of the seed's companies feed the co-partner lookup.
    /// Enforced before the bulk company-edge query to bound fan-out when a
    /// seed person sits on many companies.
    #[serde(default = "default_copartner_company_cap")]
    pub copartner_company_cap: usize,
    /// Row limit for the bulk edge fetch used by the network aggregator.
    #[serde(default = "default_network_edge_limit")]
    pub network_edge_limit: usize,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            copartner_company_cap: default_copartner_company_cap(),
            network_edge_limit: default_network_edge_limit(),
        }
    }
}

fn default_copartner_company_cap() -> usize {
    50
}

fn default_network_edge_limit() -> usize {
    500
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from file
    ///
    /// Loads environment variables from .env file (if present) before loading config.
    /// Looks for config file in this order:
    /// 1. Path specified in VINCULOS_CONFIG environment variable
    /// 2. ./config.toml in current directory
    pub fn load() -> Result<Self> {
        // Load .env file if it exists (ignore errors - file is optional)
        let _ = dotenv::dotenv();

        let config_path = std::env::var("VINCULOS_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config.toml"));

        let config_str = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let config: Config = toml::from_str(&config_str)
            .context("Failed to parse config.toml")?;

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values
    fn validate(&self) -> Result<()> {
        if self.discovery.copartner_company_cap == 0 {
            anyhow::bail!("discovery.copartner_company_cap must be greater than 0");
        }

        if self.discovery.network_edge_limit == 0 {
            anyhow::bail!("discovery.network_edge_limit must be greater than 0");
        }

        Ok(())
    }

    /// Get database path
    pub fn db_path(&self) -> &Path {
        &self.vinculos.db_path
    }
}
