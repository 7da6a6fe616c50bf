use serde::Deserialize;
use std::env;

use crate::models::EngineKind;

fn parse_env_or<T: std::str::FromStr>(var: &str, default: T) -> T
where
    T::Err: std::fmt::Display,
{
    match env::var(var) {
        Ok(val) => match val.parse() {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!("Invalid value '{}' for {}: {}. Using default.", val, var, e);
                default
            }
        },
        Err(_) => default,
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub remote: RemoteConfig,
    pub embedded: EmbeddedConfig,
    pub limits: LimitsConfig,
    /// Backend used when a request carries no engine selector.
    pub default_engine: EngineKind,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Remote Umi-OCR-style HTTP backend.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteConfig {
    /// Recognition endpoint; the options endpoint is derived from it.
    pub endpoint: String,
    pub timeout_secs: u64,
}

/// Locally embedded Tesseract backend.
#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddedConfig {
    pub enabled: bool,
    /// ISO 639-2 language codes, `+`-separated (Tesseract convention).
    pub languages: String,
    /// Override for the engine's model data directory.
    pub datapath: Option<String>,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LimitsConfig {
    /// Ceiling on the decoded image payload, in bytes.
    pub max_image_bytes: usize,
}

pub const DEFAULT_MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: env::var("LYNX_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: parse_env_or("LYNX_PORT", 8000),
            },
            remote: RemoteConfig {
                endpoint: env::var("OCR_REMOTE_URL")
                    .unwrap_or_else(|_| "http://127.0.0.1:1224/api/ocr".to_string()),
                timeout_secs: parse_env_or("OCR_REMOTE_TIMEOUT", 60),
            },
            embedded: EmbeddedConfig {
                enabled: parse_env_or("OCR_EMBEDDED_ENABLED", true),
                languages: env::var("OCR_EMBEDDED_LANGUAGES").unwrap_or_else(|_| "eng".to_string()),
                datapath: env::var("OCR_EMBEDDED_DATAPATH").ok(),
                timeout_secs: parse_env_or("OCR_EMBEDDED_TIMEOUT", 60),
            },
            limits: LimitsConfig {
                max_image_bytes: parse_env_or("OCR_MAX_IMAGE_BYTES", DEFAULT_MAX_IMAGE_BYTES),
            },
            default_engine: env::var("OCR_DEFAULT_ENGINE")
                .ok()
                .and_then(|raw| raw.parse().ok())
                .unwrap_or_default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::default()
    }
}
