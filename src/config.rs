use std::path::Path;
use std::time::Duration;
use serde::Deserialize;
use crate::core::{CloudError, Result};

pub const DEFAULT_CONFIG_FILE: &str = "family-cloud.toml";

#[derive(Deserialize, Debug, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Origin of the web app, used to build share links
    #[serde(default = "default_share_origin")]
    pub share_origin: String,
}

fn default_base_url() -> String {
    "http://localhost:5000".to_string()
}

fn default_timeout_secs() -> u64 {
    600
}

fn default_share_origin() -> String {
    "http://localhost:5173".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            share_origin: default_share_origin(),
        }
    }
}

impl ServerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct AuthConfig {
    #[serde(default)]
    pub token: Option<String>,
    /// Sent as `uploadedBy`
    #[serde(default = "default_user_name")]
    pub user_name: String,
}

fn default_user_name() -> String {
    "Guest".to_string()
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token: None,
            user_name: default_user_name(),
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct UploadConfig {
    /// Stage estimates at or above this are not shown
    #[serde(default = "default_eta_ceiling_secs")]
    pub eta_ceiling_secs: u64,
}

fn default_eta_ceiling_secs() -> u64 {
    300
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            eta_ceiling_secs: default_eta_ceiling_secs(),
        }
    }
}

impl UploadConfig {
    pub fn eta_ceiling(&self) -> Duration {
        Duration::from_secs(self.eta_ceiling_secs)
    }
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct TelegramConfig {
    #[serde(default)]
    pub bot_token: String,
    #[serde(default)]
    pub chat_id: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct LoggingConfig {
    /// trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub upload: UploadConfig,
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|err| CloudError::Config(format!("config parse error: {err}")))
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::parse(&content)
    }

    /// Missing file means defaults; a broken file is still an error.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        match std::fs::read_to_string(path.as_ref()) {
            Ok(content) => Self::parse(&content),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(err.into()),
        }
    }

    /// Environment wins over the file:
    /// `FAMILY_CLOUD_URL`, `FAMILY_CLOUD_TOKEN`, `FAMILY_CLOUD_USER`,
    /// `FAMILY_CLOUD_TG_TOKEN`, `FAMILY_CLOUD_TG_CHAT`.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.is_empty());

        if let Some(url) = get("FAMILY_CLOUD_URL") {
            self.server.base_url = url;
        }
        if let Some(token) = get("FAMILY_CLOUD_TOKEN") {
            self.auth.token = Some(token);
        }
        if let Some(user) = get("FAMILY_CLOUD_USER") {
            self.auth.user_name = user;
        }
        if let Some(bot_token) = get("FAMILY_CLOUD_TG_TOKEN") {
            self.telegram.bot_token = bot_token;
        }
        if let Some(chat_id) = get("FAMILY_CLOUD_TG_CHAT") {
            self.telegram.chat_id = chat_id;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.auth.user_name, "Guest");
        assert_eq!(config.upload.eta_ceiling(), Duration::from_secs(300));
        assert_eq!(config.logging.level, "info");
        assert!(config.auth.token.is_none());
    }

    #[test]
    fn test_partial_sections() {
        let config = Config::parse(
            r#"
            [server]
            base_url = "https://cloud.example"

            [auth]
            user_name = "Mom"

            [upload]
            eta_ceiling_secs = 120
            "#,
        )
        .unwrap();

        assert_eq!(config.server.base_url, "https://cloud.example");
        assert_eq!(config.server.timeout_secs, 600);
        assert_eq!(config.auth.user_name, "Mom");
        assert_eq!(config.upload.eta_ceiling_secs, 120);
    }

    #[test]
    fn test_bad_config_is_an_error() {
        assert!(matches!(Config::parse("[server"), Err(CloudError::Config(_))));
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = [
            ("FAMILY_CLOUD_URL", "https://other.example"),
            ("FAMILY_CLOUD_TOKEN", "secret"),
            ("FAMILY_CLOUD_USER", ""),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_overrides(|key| env.get(key).map(|value| value.to_string()));

        assert_eq!(config.server.base_url, "https://other.example");
        assert_eq!(config.auth.token.as_deref(), Some("secret"));
        // empty values are ignored
        assert_eq!(config.auth.user_name, "Guest");
    }

    #[test]
    fn test_load_or_default() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert_eq!(Config::load_or_default(&missing).unwrap().auth.user_name, "Guest");

        let present = dir.path().join("family-cloud.toml");
        std::fs::write(&present, "[telegram]\nchat_id = \"42\"\n").unwrap();
        assert_eq!(Config::load_or_default(&present).unwrap().telegram.chat_id, "42");
    }
}
