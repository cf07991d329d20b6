use crate::error::IdentityError;
use config::{Config, ConfigError, File};
use ethers::types::Address;
use serde::Deserialize;
use std::env;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct IdentitySettings {
    /// Profile registry contract queried for identity levels
    #[serde(default = "default_profile_registry_address")]
    pub profile_registry_address: String,
    /// Period of the background refresh sweep
    #[serde(default = "default_update_interval_ms")]
    pub update_interval_ms: u64,
    /// Upper bound for one registry round trip
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Addresses tracked from startup (cached as unknown until the first sweep)
    #[serde(default = "default_seed_addresses")]
    pub seed_addresses: Vec<String>,
}

fn default_profile_registry_address() -> String {
    "0x1D4DAf3D826683DA8b68d9f5165ae1196Cf97b52".to_string()
}
fn default_update_interval_ms() -> u64 {
    5_000
}
fn default_request_timeout_ms() -> u64 {
    500
}
fn default_seed_addresses() -> Vec<String> {
    vec![
        "0xfe9e8709d3215310075d67e3ed32a380ccf451c8".to_string(),
        "0xB6b5089844F439018635bab88B36cd4705f0d090".to_string(),
    ]
}

impl Default for IdentitySettings {
    fn default() -> Self {
        Self {
            profile_registry_address: default_profile_registry_address(),
            update_interval_ms: default_update_interval_ms(),
            request_timeout_ms: default_request_timeout_ms(),
            seed_addresses: default_seed_addresses(),
        }
    }
}

impl IdentitySettings {
    pub fn registry_address(&self) -> Result<Address, IdentityError> {
        parse_address(&self.profile_registry_address)
    }

    pub fn seed_addresses(&self) -> Result<Vec<Address>, IdentityError> {
        self.seed_addresses.iter().map(|s| parse_address(s)).collect()
    }

    pub fn update_interval(&self) -> Duration {
        Duration::from_millis(self.update_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Reject values the extension cannot run with.
    pub fn validate(&self) -> Result<(), IdentityError> {
        if self.update_interval_ms == 0 {
            return Err(IdentityError::Configuration(
                "update_interval_ms must be greater than zero".to_string(),
            ));
        }
        if self.request_timeout_ms == 0 {
            return Err(IdentityError::Configuration(
                "request_timeout_ms must be greater than zero".to_string(),
            ));
        }
        self.registry_address()?;
        self.seed_addresses()?;
        Ok(())
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct Rpc {
    #[serde(default = "default_http_url")]
    pub http_url: String,
}

fn default_http_url() -> String {
    "http://127.0.0.1:8545".to_string()
}

impl Default for Rpc {
    fn default() -> Self {
        Self {
            http_url: default_http_url(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Settings {
    #[serde(default)]
    pub identity: IdentitySettings,
    #[serde(default)]
    pub rpc: Rpc,
}

impl Settings {
    /// Load `Config.toml` (optional) and apply `SDK_*` environment overrides.
    pub fn new() -> Result<Self, ConfigError> {
        let s = Config::builder()
            .add_source(File::with_name("Config.toml").required(false))
            .build()?;

        let mut settings: Self = s.try_deserialize()?;

        if let Ok(url) = env::var("SDK_RPC_HTTP_URL") {
            if !url.trim().is_empty() {
                settings.rpc.http_url = url.trim().to_string();
            }
        }
        if let Ok(addr) = env::var("SDK_PROFILE_REGISTRY_ADDR") {
            if !addr.trim().is_empty() {
                settings.identity.profile_registry_address = addr.trim().to_string();
            }
        }
        if let Ok(raw) = env::var("SDK_IDENTITY_UPDATE_INTERVAL_MS") {
            settings.identity.update_interval_ms = parse_env_u64("SDK_IDENTITY_UPDATE_INTERVAL_MS", &raw)?;
        }
        if let Ok(raw) = env::var("SDK_IDENTITY_REQUEST_TIMEOUT_MS") {
            settings.identity.request_timeout_ms = parse_env_u64("SDK_IDENTITY_REQUEST_TIMEOUT_MS", &raw)?;
        }
        if let Ok(raw) = env::var("SDK_IDENTITY_SEED_ADDRESSES") {
            settings.identity.seed_addresses = parse_string_list(&raw);
        }

        Ok(settings)
    }
}

fn parse_address(raw: &str) -> Result<Address, IdentityError> {
    Address::from_str(raw.trim())
        .map_err(|e| IdentityError::Configuration(format!("invalid address {:?}: {}", raw, e)))
}

fn parse_env_u64(key: &str, raw: &str) -> Result<u64, ConfigError> {
    raw.trim()
        .parse()
        .map_err(|e| ConfigError::Message(format!("{} must be an integer: {}", key, e)))
}

/// Accepts a JSON array (`["0x..", "0x.."]`) or a comma separated list.
fn parse_string_list(input: &str) -> Vec<String> {
    let trimmed = input.trim();
    if trimmed.starts_with('[') {
        if let Ok(list) = serde_json::from_str::<Vec<String>>(trimmed) {
            return list;
        }
    }

    trimmed
        .trim_start_matches('[')
        .trim_end_matches(']')
        .split(',')
        .map(|s| s.trim().trim_matches('"').trim_matches('\'').to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
