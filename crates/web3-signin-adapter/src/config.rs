/*
[INPUT]:  YAML configuration file and environment variables
[OUTPUT]: Validated sign-in configuration
[POS]:    Configuration layer - service endpoint, timings and statement
[UPDATE]: When adding new configuration options
*/

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::auth::{LocateOptions, StatementTemplate};
use crate::error::{Result, SigninError};
use crate::http::ClientConfig;
use crate::types::{IntegrationShape, WalletKind};

/// Environment variables checked for the service URL, in order
pub const URL_ENV_VARS: &[&str] = &["WEB3_SIGNIN_SERVICE_URL", "SUPABASE_URL"];
/// Environment variables checked for the public API key, in order
pub const KEY_ENV_VARS: &[&str] = &["WEB3_SIGNIN_API_KEY", "SUPABASE_ANON_KEY"];

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SigninConfig {
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub wallet: WalletConfig,
    #[serde(default)]
    pub statement: StatementTemplate,
    #[serde(default)]
    pub ui: UiConfig,
}

/// External auth service endpoint
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServiceConfig {
    #[serde(default)]
    pub url: Option<String>,
    /// Public (anon) API key
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            url: None,
            api_key: None,
            timeout_ms: default_timeout_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
        }
    }
}

/// Wallet detection and integration settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WalletConfig {
    #[serde(default = "default_locate_timeout_ms")]
    pub locate_timeout_ms: u64,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default)]
    pub ethereum: IntegrationShape,
    #[serde(default)]
    pub solana: IntegrationShape,
    /// Wallet kinds offered on the page
    #[serde(default = "default_kinds")]
    pub kinds: Vec<WalletKind>,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            locate_timeout_ms: default_locate_timeout_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            ethereum: IntegrationShape::default(),
            solana: IntegrationShape::default(),
            kinds: default_kinds(),
        }
    }
}

/// Timings of the UI side of the flow
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UiConfig {
    /// Delay before re-polling the session after a sign-in
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,
    /// Error banner auto-dismiss; `None` keeps errors until replaced
    #[serde(default = "default_error_dismiss_ms")]
    pub error_dismiss_ms: Option<u64>,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            settle_delay_ms: default_settle_delay_ms(),
            error_dismiss_ms: default_error_dismiss_ms(),
        }
    }
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_connect_timeout_ms() -> u64 {
    10_000
}

fn default_locate_timeout_ms() -> u64 {
    3_000
}

fn default_poll_interval_ms() -> u64 {
    100
}

fn default_kinds() -> Vec<WalletKind> {
    WalletKind::ALL.to_vec()
}

fn default_settle_delay_ms() -> u64 {
    1_500
}

fn default_error_dismiss_ms() -> Option<u64> {
    Some(5_000)
}

impl SigninConfig {
    /// Load configuration from a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            SigninError::Config(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        serde_yaml::from_str(content)
            .map_err(|e| SigninError::Config(format!("invalid configuration: {e}")))
    }

    /// Override service URL and key from the process environment
    pub fn apply_env(self) -> Self {
        self.apply_env_from(|name| std::env::var(name).ok())
    }

    /// Override service URL and key from `lookup`
    pub fn apply_env_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let first = |names: &[&str]| {
            names
                .iter()
                .find_map(|name| lookup(name).filter(|value| !value.trim().is_empty()))
        };
        if let Some(url) = first(URL_ENV_VARS) {
            self.service.url = Some(url);
        }
        if let Some(key) = first(KEY_ENV_VARS) {
            self.service.api_key = Some(key);
        }
        self
    }

    /// Fail early on a missing or malformed service URL or key
    pub fn validate(&self) -> Result<()> {
        self.service_url()?;
        self.api_key()?;
        if self.wallet.kinds.is_empty() {
            return Err(SigninError::Config(
                "wallet.kinds must name at least one wallet".to_string(),
            ));
        }
        if self.wallet.poll_interval_ms == 0 {
            return Err(SigninError::Config(
                "wallet.poll_interval_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn service_url(&self) -> Result<Url> {
        let url = self
            .service
            .url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .ok_or_else(|| SigninError::Config("auth service URL is not set".to_string()))?;
        Ok(Url::parse(url)?)
    }

    pub fn api_key(&self) -> Result<&str> {
        self.service
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or_else(|| SigninError::Config("auth service API key is not set".to_string()))
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            timeout: Duration::from_millis(self.service.timeout_ms),
            connect_timeout: Duration::from_millis(self.service.connect_timeout_ms),
        }
    }

    pub fn locate_options(&self) -> LocateOptions {
        LocateOptions {
            timeout: Duration::from_millis(self.wallet.locate_timeout_ms),
            poll_interval: Duration::from_millis(self.wallet.poll_interval_ms),
        }
    }

    pub fn integration_shape(&self, kind: WalletKind) -> IntegrationShape {
        match kind {
            WalletKind::Ethereum => self.wallet.ethereum,
            WalletKind::Solana => self.wallet.solana,
        }
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.ui.settle_delay_ms)
    }

    pub fn error_dismiss(&self) -> Option<Duration> {
        self.ui.error_dismiss_ms.map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_yaml() {
        let config = SigninConfig::from_yaml_str("{}").unwrap();
        assert_eq!(config.locate_options(), LocateOptions::default());
        assert_eq!(config.settle_delay(), Duration::from_millis(1500));
        assert_eq!(config.error_dismiss(), Some(Duration::from_secs(5)));
        assert_eq!(config.statement.statement, "I accept the Terms of Service");
        assert_eq!(
            config.integration_shape(WalletKind::Solana),
            IntegrationShape::Signed
        );
    }

    #[test]
    fn test_full_yaml() {
        let yaml = r#"
service:
  url: https://project.example.test
  api_key: anon
wallet:
  locate_timeout_ms: 5000
  solana: delegated
statement:
  domain: app.example.test
  uri: https://app.example.test
  statement: Sign in to Example
ui:
  settle_delay_ms: 2000
  error_dismiss_ms: null
"#;
        let config = SigninConfig::from_yaml_str(yaml).unwrap();
        config.validate().unwrap();
        assert_eq!(config.wallet.locate_timeout_ms, 5000);
        assert_eq!(config.wallet.poll_interval_ms, 100);
        assert_eq!(config.wallet.kinds, WalletKind::ALL.to_vec());
        assert_eq!(
            config.integration_shape(WalletKind::Solana),
            IntegrationShape::Delegated
        );
        assert_eq!(config.statement.domain, "app.example.test");
        assert_eq!(config.statement.version, "1");
        assert_eq!(config.error_dismiss(), None);
        assert_eq!(config.api_key().unwrap(), "anon");
    }

    #[test]
    fn test_missing_service_settings_are_config_errors() {
        let config = SigninConfig::default();
        assert!(matches!(config.validate(), Err(SigninError::Config(_))));

        let mut config = SigninConfig::default();
        config.service.url = Some("https://project.example.test".to_string());
        assert!(matches!(config.api_key(), Err(SigninError::Config(_))));
    }

    #[test]
    fn test_env_overrides_prefer_specific_names() {
        let config = SigninConfig::default().apply_env_from(|name| match name {
            "WEB3_SIGNIN_SERVICE_URL" => Some("https://a.example.test".to_string()),
            "SUPABASE_URL" => Some("https://b.example.test".to_string()),
            "WEB3_SIGNIN_API_KEY" => Some("  ".to_string()),
            "SUPABASE_ANON_KEY" => Some("anon".to_string()),
            _ => None,
        });
        assert_eq!(config.service.url.as_deref(), Some("https://a.example.test"));
        assert_eq!(config.service.api_key.as_deref(), Some("anon"));
    }
}
