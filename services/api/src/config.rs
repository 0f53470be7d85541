//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tracing::Level;

/// The widest sketch canvas accepted from `SKETCH_WIDTH`.
pub const MAX_SKETCH_WIDTH: u32 = 4096;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub data_dir: PathBuf,
    pub log_level: Level,
    /// The generation credential. Its absence is reported per request, not at startup.
    pub openai_api_key: Option<String>,
    pub openai_api_base: Option<String>,
    pub content_model: String,
    pub tts_model: String,
    pub tts_voice_ko: String,
    pub tts_voice_en: String,
    pub request_timeout: Duration,
    /// Maximum number of stored mistake records. `None` keeps everything.
    pub mistake_retention: Option<usize>,
    pub sketch_width: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([0, 0, 0, 0], 3000)),
            data_dir: PathBuf::from("./data"),
            log_level: Level::INFO,
            openai_api_key: None,
            openai_api_base: None,
            content_model: "gpt-4o-mini".to_string(),
            tts_model: "tts-1".to_string(),
            tts_voice_ko: "nova".to_string(),
            tts_voice_en: "alloy".to_string(),
            request_timeout: Duration::from_secs(60),
            mistake_retention: Some(200),
            sketch_width: 384,
        }
    }
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();

        // --- Server and Storage Settings ---
        let bind_address = match lookup("BIND_ADDRESS") {
            Some(raw) => raw.parse::<SocketAddr>().map_err(|e| {
                ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
            })?,
            None => defaults.bind_address,
        };

        let data_dir = lookup("DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.data_dir);

        let log_level_str = lookup("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Credential (optional) ---
        let openai_api_key = lookup("OPENAI_API_KEY").filter(|key| !key.trim().is_empty());
        let openai_api_base = lookup("OPENAI_API_BASE").filter(|base| !base.trim().is_empty());

        // --- Adapter-specific Settings ---
        let content_model = lookup("CONTENT_MODEL").unwrap_or(defaults.content_model);
        let tts_model = lookup("TTS_MODEL").unwrap_or(defaults.tts_model);
        let tts_voice_ko = lookup("TTS_VOICE_KO").unwrap_or(defaults.tts_voice_ko);
        let tts_voice_en = lookup("TTS_VOICE_EN").unwrap_or(defaults.tts_voice_en);

        let request_timeout = match lookup("REQUEST_TIMEOUT_SECS") {
            Some(raw) => match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    return Err(ConfigError::InvalidValue(
                        "REQUEST_TIMEOUT_SECS".to_string(),
                        format!("'{}' is not a positive number of seconds", raw),
                    ))
                }
            },
            None => defaults.request_timeout,
        };

        let mistake_retention = match lookup("MISTAKE_RETENTION") {
            Some(raw) => match raw.parse::<usize>() {
                Ok(0) => None,
                Ok(limit) => Some(limit),
                Err(e) => {
                    return Err(ConfigError::InvalidValue(
                        "MISTAKE_RETENTION".to_string(),
                        e.to_string(),
                    ))
                }
            },
            None => defaults.mistake_retention,
        };

        let sketch_width = match lookup("SKETCH_WIDTH") {
            Some(raw) => match raw.parse::<u32>() {
                Ok(width) if (1..=MAX_SKETCH_WIDTH).contains(&width) => width,
                _ => {
                    return Err(ConfigError::InvalidValue(
                        "SKETCH_WIDTH".to_string(),
                        format!("'{}' is not a pixel width between 1 and {}", raw, MAX_SKETCH_WIDTH),
                    ))
                }
            },
            None => defaults.sketch_width,
        };

        Ok(Self {
            bind_address,
            data_dir,
            log_level,
            openai_api_key,
            openai_api_base,
            content_model,
            tts_model,
            tts_voice_ko,
            tts_voice_en,
            request_timeout,
            mistake_retention,
            sketch_width,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn empty_environment_uses_defaults() {
        let config = Config::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.bind_address.port(), 3000);
        assert!(config.openai_api_key.is_none());
        assert_eq!(config.mistake_retention, Some(200));
        assert_eq!(config.request_timeout, Duration::from_secs(60));
    }

    #[test]
    fn blank_api_key_counts_as_missing() {
        let config = Config::from_lookup(lookup_from(&[("OPENAI_API_KEY", "  ")])).unwrap();
        assert!(config.openai_api_key.is_none());
    }

    #[test]
    fn zero_retention_means_unbounded() {
        let config = Config::from_lookup(lookup_from(&[("MISTAKE_RETENTION", "0")])).unwrap();
        assert_eq!(config.mistake_retention, None);
    }

    #[test]
    fn invalid_values_are_reported() {
        let err = Config::from_lookup(lookup_from(&[("REQUEST_TIMEOUT_SECS", "soon")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(ref var, _) if var == "REQUEST_TIMEOUT_SECS"));

        let err = Config::from_lookup(lookup_from(&[("BIND_ADDRESS", "nowhere")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(ref var, _) if var == "BIND_ADDRESS"));
    }

    #[test]
    fn sketch_width_is_bounded() {
        let config = Config::from_lookup(lookup_from(&[("SKETCH_WIDTH", "4096")])).unwrap();
        assert_eq!(config.sketch_width, MAX_SKETCH_WIDTH);

        for raw in ["0", "4097", "4000000000"] {
            let err = Config::from_lookup(lookup_from(&[("SKETCH_WIDTH", raw)])).unwrap_err();
            assert!(matches!(err, ConfigError::InvalidValue(ref var, _) if var == "SKETCH_WIDTH"));
        }
    }
}
