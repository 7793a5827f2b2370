//! Configuration management for the registry backend
//!
//! Loads configuration from environment variables with sensible defaults.

use anyhow::{Context, Result};
use registry_common::KeyHash;
use registry_engine::{AuthPolicy, CoordinatorSettings, RegistrationPolicy};
use std::env;
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// API server host
    pub api_host: String,

    /// API server port
    pub api_port: u16,

    /// Whether to run against the in-memory mock ledger
    pub mock_mode: bool,

    /// Script address holding the registry UTxO
    pub registry_address: String,

    /// Key hash of the registry authority
    pub authority_key_hash: KeyHash,

    /// Blockfrost-compatible indexer base URL (when not in mock mode)
    pub blockfrost_url: String,

    /// Indexer project id / API key
    pub blockfrost_project_id: Option<String>,

    /// Signing service base URL (when not in mock mode)
    pub signer_url: Option<String>,

    /// Contention attempt bound for the submission coordinator
    pub max_submit_attempts: u32,

    /// In-place resubmissions after network failures
    pub submit_retries: u32,

    /// Per-submission wait before the outcome is treated as indeterminate
    pub confirm_timeout_secs: u64,

    /// Smallest lovelace value the replacement registry output may carry
    pub min_output_lovelace: u64,

    /// Who may register clinics
    pub registration_policy: RegistrationPolicy,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if it exists (for local development)
        dotenv::dotenv().ok();

        let config = Config {
            api_host: env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),

            api_port: env::var("API_PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .context("Invalid API_PORT")?,

            mock_mode: env::var("MOCK_MODE")
                .unwrap_or_else(|_| "true".to_string())
                .parse()
                .context("Invalid MOCK_MODE (expected true/false)")?,

            registry_address: env::var("REGISTRY_ADDRESS")
                .unwrap_or_else(|_| "addr_test1_mock_registry".to_string()),

            authority_key_hash: KeyHash::from_hex(
                &env::var("AUTHORITY_KEY_HASH").unwrap_or_else(|_| "aa".repeat(28)),
            )
            .map_err(|e| anyhow::anyhow!("Invalid AUTHORITY_KEY_HASH: {e}"))?,

            blockfrost_url: env::var("BLOCKFROST_URL")
                .unwrap_or_else(|_| "https://cardano-preprod.blockfrost.io/api/v0".to_string()),

            blockfrost_project_id: env::var("BLOCKFROST_PROJECT_ID").ok(),

            signer_url: env::var("SIGNER_URL").ok(),

            max_submit_attempts: env::var("MAX_SUBMIT_ATTEMPTS")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .context("Invalid MAX_SUBMIT_ATTEMPTS")?,

            submit_retries: env::var("SUBMIT_RETRIES")
                .unwrap_or_else(|_| "3".to_string())
                .parse()
                .context("Invalid SUBMIT_RETRIES")?,

            confirm_timeout_secs: env::var("CONFIRM_TIMEOUT_SECS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .context("Invalid CONFIRM_TIMEOUT_SECS")?,

            min_output_lovelace: env::var("MIN_OUTPUT_LOVELACE")
                .unwrap_or_else(|_| "2000000".to_string())
                .parse()
                .context("Invalid MIN_OUTPUT_LOVELACE")?,

            registration_policy: parse_registration_policy(
                &env::var("REGISTRATION_POLICY").unwrap_or_else(|_| "authority".to_string()),
            )?,
        };

        // Validate configuration
        config.validate()?;

        Ok(config)
    }

    /// Validate configuration
    fn validate(&self) -> Result<()> {
        if self.api_port == 0 {
            anyhow::bail!("API_PORT must be greater than 0");
        }

        if self.max_submit_attempts == 0 {
            anyhow::bail!("MAX_SUBMIT_ATTEMPTS must be greater than 0");
        }

        if self.confirm_timeout_secs == 0 {
            anyhow::bail!("CONFIRM_TIMEOUT_SECS must be greater than 0");
        }

        // If not in mock mode, require the chain and signing collaborators
        if !self.mock_mode {
            if self.blockfrost_project_id.is_none() {
                anyhow::bail!("BLOCKFROST_PROJECT_ID is required when MOCK_MODE=false");
            }
            if self.signer_url.is_none() {
                anyhow::bail!("SIGNER_URL is required when MOCK_MODE=false");
            }
        }

        Ok(())
    }

    /// Get the API server address
    pub fn api_address(&self) -> String {
        format!("{}:{}", self.api_host, self.api_port)
    }

    /// Coordinator settings derived from this configuration
    pub fn coordinator_settings(&self) -> CoordinatorSettings {
        CoordinatorSettings {
            registry_address: self.registry_address.clone(),
            min_output_lovelace: self.min_output_lovelace,
            policy: AuthPolicy::new(self.registration_policy),
            max_attempts: self.max_submit_attempts,
            submit_retries: self.submit_retries,
            confirm_timeout: Duration::from_secs(self.confirm_timeout_secs),
        }
    }
}

fn parse_registration_policy(value: &str) -> Result<RegistrationPolicy> {
    match value {
        "authority" => Ok(RegistrationPolicy::AuthorityOnly),
        "open" => Ok(RegistrationPolicy::Open),
        other => anyhow::bail!("Invalid REGISTRATION_POLICY '{other}' (expected authority/open)"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clear_env() {
        for key in [
            "API_HOST",
            "API_PORT",
            "MOCK_MODE",
            "REGISTRY_ADDRESS",
            "AUTHORITY_KEY_HASH",
            "BLOCKFROST_URL",
            "BLOCKFROST_PROJECT_ID",
            "SIGNER_URL",
            "MAX_SUBMIT_ATTEMPTS",
            "SUBMIT_RETRIES",
            "CONFIRM_TIMEOUT_SECS",
            "MIN_OUTPUT_LOVELACE",
            "REGISTRATION_POLICY",
        ] {
            env::remove_var(key);
        }
    }

    // Environment variables are process-global, so the env-driven cases run
    // inside a single test body instead of racing across test threads.
    #[test]
    fn test_config_from_env() {
        clear_env();

        let config = Config::from_env().expect("Failed to load config");
        assert_eq!(config.api_host, "0.0.0.0");
        assert_eq!(config.api_port, 8080);
        assert!(config.mock_mode);
        assert_eq!(config.max_submit_attempts, 5);
        assert_eq!(config.min_output_lovelace, 2_000_000);
        assert_eq!(config.registration_policy, RegistrationPolicy::AuthorityOnly);
        assert_eq!(config.authority_key_hash, KeyHash::new([0xaa; 28]));
        assert_eq!(config.api_address(), "0.0.0.0:8080");

        // coordinator settings follow overridden values
        env::set_var("MAX_SUBMIT_ATTEMPTS", "7");
        env::set_var("CONFIRM_TIMEOUT_SECS", "10");
        env::set_var("REGISTRATION_POLICY", "open");

        let config = Config::from_env().unwrap();
        let settings = config.coordinator_settings();
        assert_eq!(settings.max_attempts, 7);
        assert_eq!(settings.confirm_timeout, Duration::from_secs(10));
        assert_eq!(settings.policy.registration, RegistrationPolicy::Open);

        // leaving mock mode requires the chain and signing collaborators
        clear_env();
        env::set_var("MOCK_MODE", "false");
        assert!(Config::from_env().is_err());

        env::set_var("BLOCKFROST_PROJECT_ID", "preprod_project");
        env::set_var("SIGNER_URL", "http://localhost:9090");
        assert!(Config::from_env().is_ok());

        clear_env();
    }

    #[test]
    fn test_invalid_registration_policy_rejected() {
        assert!(parse_registration_policy("nobody").is_err());
        assert_eq!(
            parse_registration_policy("open").unwrap(),
            RegistrationPolicy::Open
        );
    }
}
