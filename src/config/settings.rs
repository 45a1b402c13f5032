use std::{env, path::PathBuf};

use chrono_tz::Tz;
use tracing::{error, info};

use crate::error::ConfigError;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8080/api";
pub const DEFAULT_POLL_LIST_SIZE: u32 = 30;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_base_url: String,
    pub poll_list_size: u32,
    /// Where the bearer token is persisted. `None` keeps it in memory.
    pub access_token_path: Option<PathBuf>,
    pub display_timezone: Tz,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            poll_list_size: DEFAULT_POLL_LIST_SIZE,
            access_token_path: None,
            display_timezone: Tz::UTC,
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the config from an arbitrary variable source; missing variables fall back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = ClientConfig::default();

        if let Some(url) = lookup("API_BASE_URL") {
            let url = url.trim().trim_end_matches('/').to_string();
            if url.is_empty() {
                error!("API_BASE_URL is set but empty");
                return Err(ConfigError::InvalidVar {
                    name: "API_BASE_URL",
                    reason: "must not be empty".to_string(),
                });
            }
            config.api_base_url = url;
        }

        if let Some(size) = lookup("POLL_LIST_SIZE") {
            config.poll_list_size = match size.trim().parse::<u32>() {
                Ok(size) if size > 0 => size,
                Ok(_) => {
                    return Err(ConfigError::InvalidVar {
                        name: "POLL_LIST_SIZE",
                        reason: "must be greater than zero".to_string(),
                    })
                }
                Err(e) => {
                    error!("POLL_LIST_SIZE is not a number: {}", e);
                    return Err(ConfigError::InvalidVar {
                        name: "POLL_LIST_SIZE",
                        reason: e.to_string(),
                    });
                }
            };
        }

        config.access_token_path = lookup("ACCESS_TOKEN_PATH")
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from);

        if let Some(zone) = lookup("DISPLAY_TIMEZONE") {
            config.display_timezone =
                zone.trim()
                    .parse::<Tz>()
                    .map_err(|e| ConfigError::InvalidVar {
                        name: "DISPLAY_TIMEZONE",
                        reason: e.to_string(),
                    })?;
        }

        info!(
            "Client configured for {} (page size {})",
            config.api_base_url, config.poll_list_size
        );
        Ok(config)
    }
}
