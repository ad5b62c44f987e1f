use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

/// Contract whose transactions the activity page lists.
pub const DEFAULT_TRANSACTIONS_CONTRACT: &str = "0xbeeF010f9cb27031ad51e3333f9aF9C6B1228183";

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub zeroex: ZeroExConfig,
    pub dune: DuneConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ZeroExConfig {
    pub api_url: String,
    pub api_version: String,
    #[serde(default)]
    pub api_key: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DuneConfig {
    pub api_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    pub contract_address: String,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let config = Config::builder()
            // Start with default values
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 3000)?
            .set_default("zeroex.api_url", "https://api.0x.org")?
            .set_default("zeroex.api_version", "v2")?
            .set_default("dune.api_url", "https://api.sim.dune.com")?
            .set_default("dune.contract_address", DEFAULT_TRANSACTIONS_CONTRACT)?
            // Load from config file if it exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // Override with environment variables (EARNWALLET__SERVER__PORT, etc.)
            .add_source(
                Environment::with_prefix("EARNWALLET")
                    .separator("__")
                    .try_parsing(true),
            )
            // The credentials keep their conventional names
            .set_override_option("zeroex.api_key", std::env::var("OX_API_KEY").ok())?
            .set_override_option("dune.api_key", std::env::var("DUNE_API_KEY").ok())?
            .build()?;

        config.try_deserialize()
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

/// A usable credential: present and not blank.
pub fn credential(key: &Option<String>) -> Option<&str> {
    key.as_deref().map(str::trim).filter(|k| !k.is_empty())
}

/// First and last four characters, for logs.
pub fn key_preview(key: &Option<String>) -> String {
    match credential(key) {
        None => "EMPTY".to_string(),
        Some(k) if k.len() > 8 && k.is_ascii() => format!("{}...{}", &k[..4], &k[k.len() - 4..]),
        Some(_) => "***".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_credential_is_missing() {
        assert_eq!(credential(&None), None);
        assert_eq!(credential(&Some("   ".into())), None);
        assert_eq!(credential(&Some("abc".into())), Some("abc"));
    }

    #[test]
    fn test_key_preview_masks_middle() {
        assert_eq!(key_preview(&Some("abcd1234efgh5678".into())), "abcd...5678");
        assert_eq!(key_preview(&Some("short".into())), "***");
        assert_eq!(key_preview(&None), "EMPTY");
    }
}
