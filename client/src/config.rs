use crate::blockchain::Address;
use crate::errors::{WalletError, WalletResult};
use crate::validation::InputValidator;
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

pub const KEY_LOG_LEVEL: &str = "LOG_LEVEL";
pub const KEY_RPC_ENDPOINT: &str = "RPC_ENDPOINT";
pub const KEY_CONTRACT_ADDRESS: &str = "CONTRACT_ADDRESS";
pub const KEY_REQUIRE_VERIFICATION: &str = "REQUIRE_VERIFICATION";
pub const KEY_CONFIRMATION_POLL_MS: &str = "CONFIRMATION_POLL_MS";
pub const KEY_CONFIRMATION_TIMEOUT_SECS: &str = "CONFIRMATION_TIMEOUT_SECS";

/// Address the ATM contract lands at on a fresh local hardhat node.
pub const DEFAULT_CONTRACT_ADDRESS: &str = "0x5FbDB2315678afecb367f032d93F642f64180aa3";

/// Environment types for different client configurations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Production,
    Test,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
            Environment::Test => "test",
        }
    }

    /// Lenient name lookup; anything unrecognized is development.
    pub fn from_name(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "production" | "prod" => Environment::Production,
            "test" | "testing" => Environment::Test,
            _ => Environment::Development,
        }
    }
}

/// How long to keep polling for a transaction receipt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfirmationPolicy {
    pub poll_interval: Duration,
    pub timeout: Duration,
}

impl ConfirmationPolicy {
    /// Number of receipt polls that fit in the timeout; always at least one.
    pub fn max_polls(&self) -> u64 {
        let interval = self.poll_interval.as_millis().max(1);
        let polls = self.timeout.as_millis() / interval;
        u64::try_from(polls).unwrap_or(u64::MAX).max(1)
    }
}

impl Default for ConfirmationPolicy {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(1_000),
            timeout: Duration::from_secs(120),
        }
    }
}

/// Client configuration manager
#[derive(Debug, Clone)]
pub struct ClientConfig {
    environment: Environment,
    config_map: HashMap<String, String>,
}

impl ClientConfig {
    /// Create a new configuration holding the environment defaults
    pub fn new(environment: Environment) -> Self {
        let mut config = ClientConfig {
            environment,
            config_map: HashMap::new(),
        };

        config.load_defaults();
        config
    }

    /// Load configuration from environment variables
    pub fn from_env() -> WalletResult<Self> {
        let env_str =
            std::env::var("ATM_ENVIRONMENT").unwrap_or_else(|_| "development".to_string());
        Self::from_environment(Environment::from_name(&env_str))
    }

    /// Construct a configuration for the provided environment and apply overrides.
    pub fn from_environment(environment: Environment) -> WalletResult<Self> {
        let mut config = Self::new(environment);
        config.load_from_env_vars();
        config.validate_required_configs()?;
        Ok(config)
    }

    pub fn get(&self, key: &str) -> Option<&String> {
        self.config_map.get(key)
    }

    pub fn get_required(&self, key: &str) -> WalletResult<&String> {
        self.config_map.get(key).ok_or_else(|| {
            WalletError::ValidationError(format!("Required config key '{}' not found", key))
        })
    }

    /// Retrieve a boolean flag with a default fallback when the key is absent.
    pub fn get_bool_with_default(&self, key: &str, default: bool) -> WalletResult<bool> {
        match self.config_map.get(key) {
            Some(value) => parse_bool_flag(value, key),
            None => Ok(default),
        }
    }

    /// Retrieve an unsigned 64-bit value with a default fallback.
    pub fn get_u64_with_default(&self, key: &str, default: u64) -> WalletResult<u64> {
        match self.config_map.get(key) {
            Some(value) => parse_u64_value(value, key),
            None => Ok(default),
        }
    }

    /// Set a configuration value (for testing purposes)
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.config_map.insert(key.into(), value.into());
    }

    pub fn environment(&self) -> Environment {
        self.environment
    }

    pub fn log_level(&self) -> log::LevelFilter {
        self.get(KEY_LOG_LEVEL)
            .and_then(|level| level.parse().ok())
            .unwrap_or(log::LevelFilter::Info)
    }

    pub fn rpc_endpoint(&self) -> WalletResult<&str> {
        self.get_required(KEY_RPC_ENDPOINT).map(String::as_str)
    }

    pub fn contract_address(&self) -> WalletResult<Address> {
        let raw = self.get_required(KEY_CONTRACT_ADDRESS)?;
        InputValidator::new().validate_address(raw)
    }

    /// Whether deposits and withdrawals wait for a passed captcha.
    pub fn require_verification(&self) -> WalletResult<bool> {
        self.get_bool_with_default(KEY_REQUIRE_VERIFICATION, true)
    }

    pub fn confirmation_policy(&self) -> WalletResult<ConfirmationPolicy> {
        let defaults = ConfirmationPolicy::default();
        let poll_ms = self.get_u64_with_default(
            KEY_CONFIRMATION_POLL_MS,
            defaults.poll_interval.as_millis() as u64,
        )?;
        let timeout_secs = self.get_u64_with_default(
            KEY_CONFIRMATION_TIMEOUT_SECS,
            defaults.timeout.as_secs(),
        )?;

        if poll_ms == 0 {
            return Err(WalletError::ValidationError(format!(
                "Configuration key '{}' must be positive",
                KEY_CONFIRMATION_POLL_MS
            )));
        }

        Ok(ConfirmationPolicy {
            poll_interval: Duration::from_millis(poll_ms),
            timeout: Duration::from_secs(timeout_secs),
        })
    }

    /// Validate that all required keys are present and well-formed
    pub fn validate_required_configs(&self) -> WalletResult<()> {
        for key in [KEY_LOG_LEVEL, KEY_RPC_ENDPOINT, KEY_CONTRACT_ADDRESS] {
            if !self.config_map.contains_key(key) {
                return Err(WalletError::ValidationError(format!(
                    "Required configuration key '{}' is missing for {} environment",
                    key,
                    self.environment.as_str()
                )));
            }
        }

        self.contract_address()?;
        self.require_verification()?;
        self.confirmation_policy()?;
        Ok(())
    }

    fn load_defaults(&mut self) {
        self.config_map.insert(
            KEY_CONTRACT_ADDRESS.to_string(),
            DEFAULT_CONTRACT_ADDRESS.to_string(),
        );
        self.config_map
            .insert(KEY_REQUIRE_VERIFICATION.to_string(), "true".to_string());

        match self.environment {
            Environment::Production => {
                self.config_map
                    .insert(KEY_LOG_LEVEL.to_string(), "INFO".to_string());
                self.config_map.insert(
                    KEY_RPC_ENDPOINT.to_string(),
                    "http://localhost:8545".to_string(),
                );
                self.config_map
                    .insert(KEY_CONFIRMATION_POLL_MS.to_string(), "2000".to_string());
                self.config_map
                    .insert(KEY_CONFIRMATION_TIMEOUT_SECS.to_string(), "300".to_string());
            }
            Environment::Development => {
                self.config_map
                    .insert(KEY_LOG_LEVEL.to_string(), "DEBUG".to_string());
                self.config_map.insert(
                    KEY_RPC_ENDPOINT.to_string(),
                    "http://localhost:8545".to_string(),
                );
                self.config_map
                    .insert(KEY_CONFIRMATION_POLL_MS.to_string(), "500".to_string());
                self.config_map
                    .insert(KEY_CONFIRMATION_TIMEOUT_SECS.to_string(), "60".to_string());
            }
            Environment::Test => {
                self.config_map
                    .insert(KEY_LOG_LEVEL.to_string(), "WARN".to_string());
                self.config_map.insert(
                    KEY_RPC_ENDPOINT.to_string(),
                    "http://127.0.0.1:8545".to_string(),
                );
                self.config_map
                    .insert(KEY_CONFIRMATION_POLL_MS.to_string(), "10".to_string());
                self.config_map
                    .insert(KEY_CONFIRMATION_TIMEOUT_SECS.to_string(), "5".to_string());
            }
        }
    }

    fn load_from_env_vars(&mut self) {
        let env_mappings = [
            ("ATM_LOG_LEVEL", KEY_LOG_LEVEL),
            ("ATM_RPC_ENDPOINT", KEY_RPC_ENDPOINT),
            ("ATM_CONTRACT_ADDRESS", KEY_CONTRACT_ADDRESS),
            ("ATM_REQUIRE_VERIFICATION", KEY_REQUIRE_VERIFICATION),
            ("ATM_CONFIRMATION_POLL_MS", KEY_CONFIRMATION_POLL_MS),
            ("ATM_CONFIRMATION_TIMEOUT_SECS", KEY_CONFIRMATION_TIMEOUT_SECS),
        ];

        for (env_var, config_key) in &env_mappings {
            if let Ok(value) = std::env::var(env_var) {
                if value.trim().is_empty() {
                    log::warn!("Environment variable {} is empty", env_var);
                    continue;
                }

                if value.chars().any(|c| c.is_control()) {
                    log::warn!(
                        "Environment variable {} contains control characters, ignoring",
                        env_var
                    );
                    continue;
                }

                self.config_map.insert(config_key.to_string(), value);
                log::debug!(
                    "Loaded configuration {} from environment variable {}",
                    config_key,
                    env_var
                );
            }
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(Environment::Development)
    }
}

fn parse_bool_flag(value: &str, key: &str) -> WalletResult<bool> {
    let normalized = value.trim().to_ascii_lowercase();
    match normalized.as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(WalletError::ValidationError(format!(
            "Invalid boolean value '{}' for key '{}'",
            value, key
        ))),
    }
}

fn parse_u64_value(value: &str, key: &str) -> WalletResult<u64> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(WalletError::ValidationError(format!(
            "Configuration key '{}' cannot be empty",
            key
        )));
    }

    trimmed.parse::<u64>().map_err(|_| {
        WalletError::ValidationError(format!(
            "Invalid numeric value '{}' for key '{}'",
            value, key
        ))
    })
}

static CLIENT_CONFIG: OnceCell<ClientConfig> = OnceCell::new();

/// Initialize the process-wide configuration from `ATM_*` environment variables.
pub fn init_client_config_from_env() -> WalletResult<&'static ClientConfig> {
    CLIENT_CONFIG.get_or_try_init(|| {
        let config = ClientConfig::from_env()?;
        log::info!(
            "Client configuration initialized for {:?} environment",
            config.environment
        );
        Ok(config)
    })
}
