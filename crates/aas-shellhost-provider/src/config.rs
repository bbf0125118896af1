//! Provider configuration.

use std::time::Duration;
use url::Url;

/// Configuration of one submodel service provider.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// The provider's own endpoint address, used to build absolute
    /// callback URLs for asynchronous invocations. Relative callback
    /// URLs are produced when absent.
    pub endpoint: Option<Url>,

    /// Timeout applied when an invocation request carries none.
    pub default_timeout: Duration,

    /// How long terminal invocation results stay retrievable.
    pub result_ttl: Duration,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            default_timeout: Duration::from_millis(60_000),
            result_ttl: Duration::from_secs(600),
        }
    }
}

impl ProviderConfig {
    /// Load configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `SHELLHOST_ENDPOINT`: provider endpoint URL
    /// - `SHELLHOST_DEFAULT_TIMEOUT_MS`: default invocation timeout
    /// - `SHELLHOST_RESULT_TTL_SECS`: result cache retention
    ///
    /// # Errors
    ///
    /// Returns an error if a set variable fails to parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(endpoint) = std::env::var("SHELLHOST_ENDPOINT") {
            config.endpoint = Some(Url::parse(&endpoint).map_err(|e| ConfigError::Invalid {
                name: "SHELLHOST_ENDPOINT",
                detail: e.to_string(),
            })?);
        }

        if let Ok(millis) = std::env::var("SHELLHOST_DEFAULT_TIMEOUT_MS") {
            let millis: u64 = millis.parse().map_err(|_| ConfigError::Invalid {
                name: "SHELLHOST_DEFAULT_TIMEOUT_MS",
                detail: format!("not an integer: `{millis}`"),
            })?;
            config.default_timeout = Duration::from_millis(millis);
        }

        if let Ok(secs) = std::env::var("SHELLHOST_RESULT_TTL_SECS") {
            let secs: u64 = secs.parse().map_err(|_| ConfigError::Invalid {
                name: "SHELLHOST_RESULT_TTL_SECS",
                detail: format!("not an integer: `{secs}`"),
            })?;
            config.result_ttl = Duration::from_secs(secs);
        }

        Ok(config)
    }

    /// Set the endpoint address.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: Url) -> Self {
        self.endpoint = Some(endpoint);
        self
    }
}

/// Errors loading provider configuration.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// An environment variable failed to parse.
    #[error("invalid {name}: {detail}")]
    Invalid {
        /// The variable name
        name: &'static str,
        /// Why it failed to parse
        detail: String,
    },
}
