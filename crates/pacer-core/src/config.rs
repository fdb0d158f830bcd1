use crate::error::ConfigError;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateConfig {
    pub interval_ms: u64,
    pub max_limit: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_weight: Option<u64>,
}

impl RateConfig {
    pub fn new(interval_ms: u64, max_limit: u32) -> Self {
        Self {
            interval_ms,
            max_limit,
            max_weight: None,
        }
    }

    pub fn with_max_weight(mut self, max_weight: u64) -> Self {
        self.max_weight = Some(max_weight);
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.interval_ms == 0 {
            return Err(ConfigError::Invalid("interval_ms must be positive".into()));
        }
        if self.max_limit == 0 {
            return Err(ConfigError::Invalid("max_limit must be positive".into()));
        }
        if self.max_weight == Some(0) {
            return Err(ConfigError::Invalid("max_weight must be positive".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LimitsFile {
    #[serde(default)]
    pub limiters: BTreeMap<String, RateConfig>,
}

impl LimitsFile {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("read limits file {}", path.display()))?;
        Self::parse(&raw).with_context(|| format!("parse limits file {}", path.display()))
    }

    pub fn parse(raw: &str) -> anyhow::Result<Self> {
        let parsed = toml::from_str::<LimitsFile>(raw)?;
        for (name, config) in &parsed.limiters {
            config.validate().with_context(|| format!("limiter {name}"))?;
        }
        Ok(parsed)
    }

    pub fn get(&self, name: &str) -> anyhow::Result<&RateConfig> {
        self.limiters
            .get(name)
            .with_context(|| format!("no limiter named {name}"))
    }
}
