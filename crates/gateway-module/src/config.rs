//! Gateway Configuration
//!
//! Runtime values an administrator enters when activating the module.

use serde::{Deserialize, Serialize};

use crate::error::{GatewayError, Result};

/// Filename-style identifier the host knows this module by
pub const MODULE_NAME: &str = "remoteinputgateway";

/// Configured gateway credentials and switches
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// API username, also the gateway identifier in the verification hash
    pub api_username: String,

    /// API password, used as the shared hash secret
    #[serde(skip_serializing)]
    pub api_password: String,

    /// Route requests to the processor's sandbox
    #[serde(default)]
    pub test_mode: bool,

    /// Reject requests whose verification hash does not match
    #[serde(default = "default_verify_hash")]
    pub verify_hash: bool,
}

fn default_verify_hash() -> bool {
    true
}

impl GatewayConfig {
    /// Create a new config with hash verification enabled
    pub fn new(api_username: impl Into<String>, api_password: impl Into<String>) -> Self {
        Self {
            api_username: api_username.into(),
            api_password: api_password.into(),
            test_mode: false,
            verify_hash: true,
        }
    }

    /// Create from environment variables
    pub fn from_env() -> Result<Self> {
        let api_username = std::env::var("GATEWAY_API_USERNAME")
            .map_err(|_| GatewayError::Config("GATEWAY_API_USERNAME not set".into()))?;
        let api_password = std::env::var("GATEWAY_API_PASSWORD")
            .map_err(|_| GatewayError::Config("GATEWAY_API_PASSWORD not set".into()))?;

        let mut config = Self::new(api_username, api_password);
        config.test_mode = env_flag("GATEWAY_TEST_MODE", false);
        config.verify_hash = env_flag("GATEWAY_VERIFY_HASH", true);

        Ok(config)
    }

    /// Enable or disable test mode
    pub fn with_test_mode(mut self, test_mode: bool) -> Self {
        self.test_mode = test_mode;
        self
    }

    /// Enable or disable hash verification
    pub fn with_verify_hash(mut self, verify_hash: bool) -> Self {
        self.verify_hash = verify_hash;
        self
    }
}

fn env_flag(name: &str, default: bool) -> bool {
    std::env::var(name)
        .map(|v| parse_flag(&v))
        .unwrap_or(default)
}

/// Interpret the loose on/off spellings admins and query strings use
pub fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
