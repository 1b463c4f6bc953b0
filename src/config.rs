//! Configuration management for the Story Annotator server

use serde::Deserialize;
use std::env;
use thiserror::Error;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub dedup: DedupConfig,
    pub markers: MarkerConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

/// Per-kind switches for insert-time deduplication.
///
/// When a kind is disabled, inserts of that kind are unconditional.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct DedupConfig {
    pub vocabulary: bool,
    pub grammar: bool,
    pub footnotes: bool,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            vocabulary: true,
            grammar: true,
            footnotes: true,
        }
    }
}

impl DedupConfig {
    /// Every kind inserted unconditionally
    pub fn disabled() -> Self {
        Self {
            vocabulary: false,
            grammar: false,
            footnotes: false,
        }
    }
}

/// Marker tokens substituted into rendered segments
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MarkerConfig {
    /// Replaces each vocabulary span in vocabulary mode
    pub blank: String,
    /// Emitted before a grammar label in grammar mode
    pub grammar_open: String,
    /// Emitted after a grammar label in grammar mode
    pub grammar_close: String,
}

impl Default for MarkerConfig {
    fn default() -> Self {
        Self {
            blank: "<BLANK>".to_string(),
            grammar_open: "%".to_string(),
            grammar_close: "&".to_string(),
        }
    }
}

/// Errors raised while reading configuration from the environment
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
            },
            database: DatabaseConfig {
                url: "sqlite:./stories.db".to_string(),
                max_connections: 5,
            },
            dedup: DedupConfig::default(),
            markers: MarkerConfig::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Config::default();
        let markers = defaults.markers;

        Ok(Config {
            server: ServerConfig {
                host: env::var("SERVER_HOST").unwrap_or(defaults.server.host),
                port: parse_var("SERVER_PORT", defaults.server.port)?,
            },
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").unwrap_or(defaults.database.url),
                max_connections: parse_var(
                    "DATABASE_MAX_CONNECTIONS",
                    defaults.database.max_connections,
                )?,
            },
            dedup: DedupConfig {
                vocabulary: flag_var("DEDUP_VOCABULARY", defaults.dedup.vocabulary)?,
                grammar: flag_var("DEDUP_GRAMMAR", defaults.dedup.grammar)?,
                footnotes: flag_var("DEDUP_FOOTNOTES", defaults.dedup.footnotes)?,
            },
            markers: MarkerConfig {
                blank: env::var("MARKER_BLANK").unwrap_or(markers.blank),
                grammar_open: env::var("MARKER_GRAMMAR_OPEN").unwrap_or(markers.grammar_open),
                grammar_close: env::var("MARKER_GRAMMAR_CLOSE").unwrap_or(markers.grammar_close),
            },
        })
    }
}

fn parse_var<T: std::str::FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { key, value }),
        Err(_) => Ok(default),
    }
}

fn flag_var(key: &'static str, default: bool) -> Result<bool, ConfigError> {
    match env::var(key) {
        Ok(value) => parse_flag(&value).ok_or(ConfigError::InvalidValue { key, value }),
        Err(_) => Ok(default),
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
