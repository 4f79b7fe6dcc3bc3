use std::net::SocketAddr;

use thiserror::Error;

pub const ADDR_VAR: &str = "GROUNDTRACK_ADDR";
pub const LOG_VAR: &str = "GROUNDTRACK_LOG";
pub const MAX_SAMPLES_VAR: &str = "GROUNDTRACK_MAX_SAMPLES";
pub const MAX_RESONANT_OFFSET_VAR: &str = "GROUNDTRACK_MAX_RESONANT_OFFSET_DAYS";

const DEFAULT_ADDR: &str = "127.0.0.1:3000";
const DEFAULT_LOG: &str = "info";
const DEFAULT_MAX_SAMPLES: usize = 20_000;
const DEFAULT_MAX_RESONANT_OFFSET_DAYS: usize = 365;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {key}={value:?}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub addr: SocketAddr,
    pub log_filter: String,
    /// Upper bound on samples per ground-track or pass request.
    pub max_samples: usize,
    /// Furthest a scan over a resonant orbit may reach from its epoch, days.
    /// The resonance integrator restarts at epoch on every sample, so the cost
    /// of one sample grows with this distance.
    pub max_resonant_offset_days: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            log_filter: DEFAULT_LOG.to_string(),
            max_samples: DEFAULT_MAX_SAMPLES,
            max_resonant_offset_days: DEFAULT_MAX_RESONANT_OFFSET_DAYS,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key lookup; unset keys take defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let addr_raw = lookup(ADDR_VAR).unwrap_or_else(|| DEFAULT_ADDR.to_string());
        let addr = addr_raw.trim().parse().map_err(|e: std::net::AddrParseError| {
            ConfigError::Invalid {
                key: ADDR_VAR,
                value: addr_raw.clone(),
                reason: e.to_string(),
            }
        })?;

        let log_filter = lookup(LOG_VAR)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_LOG.to_string());

        let max_samples = positive(&lookup, MAX_SAMPLES_VAR, DEFAULT_MAX_SAMPLES)?;
        let max_resonant_offset_days = positive(
            &lookup,
            MAX_RESONANT_OFFSET_VAR,
            DEFAULT_MAX_RESONANT_OFFSET_DAYS,
        )?;

        Ok(Config {
            addr,
            log_filter,
            max_samples,
            max_resonant_offset_days,
        })
    }
}

fn positive<F>(lookup: &F, key: &'static str, default: usize) -> Result<usize, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key) else {
        return Ok(default);
    };
    match raw.trim().parse::<usize>() {
        Ok(0) => Err(ConfigError::Invalid {
            key,
            value: raw,
            reason: "must be at least 1".to_string(),
        }),
        Ok(n) => Ok(n),
        Err(e) => Err(ConfigError::Invalid {
            key,
            reason: e.to_string(),
            value: raw,
        }),
    }
}
