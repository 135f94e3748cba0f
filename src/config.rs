use std::path::PathBuf;
use std::time::Duration;

use directories::ProjectDirs;
use serde::Deserialize;

use crate::error::{LinearError, Result};

pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_REDIRECT_URI: &str = "http://localhost:5000/auth/callback";
const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[derive(Deserialize, Default, Debug, Clone)]
pub struct Config {
    pub api_key: Option<String>,
    pub default_team: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub redirect_uri: Option<String>,
    pub port: Option<u16>,
    pub request_timeout_secs: Option<u64>,
    /// GraphQL endpoint override, e.g. for a proxy.
    pub api_endpoint: Option<String>,
}

impl Config {
    /// Load the config file (if any) and apply environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_file()?;
        config.apply_env(|name| std::env::var(name).ok());
        Ok(config)
    }

    fn load_file() -> Result<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            return Ok(Config::default());
        }

        let contents =
            std::fs::read_to_string(&config_path).map_err(|e| LinearError::ConfigRead {
                path: config_path.clone(),
                source: e,
            })?;

        toml::from_str(&contents).map_err(|e| LinearError::ConfigParse {
            path: config_path,
            source: e,
        })
    }

    /// Environment variables take precedence over the config file.
    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        let non_empty = |name: &str| var(name).filter(|v| !v.trim().is_empty());

        if let Some(key) = non_empty("LINEAR_API_KEY") {
            self.api_key = Some(key);
        }
        if let Some(id) = non_empty("LINEAR_CLIENT_ID") {
            self.client_id = Some(id);
        }
        if let Some(secret) = non_empty("LINEAR_CLIENT_SECRET") {
            self.client_secret = Some(secret);
        }
        if let Some(team) = non_empty("LINEAR_DEFAULT_TEAM") {
            self.default_team = Some(team);
        }
        if let Some(port) = non_empty("PORT").and_then(|p| p.parse().ok()) {
            self.port = Some(port);
        }

        // A hosted deployment knows its public URL better than the local default
        if let Some(external) = non_empty("RENDER_EXTERNAL_URL") {
            self.redirect_uri = Some(format!(
                "{}/auth/callback",
                external.trim_end_matches('/')
            ));
        } else if let Some(uri) = non_empty("LINEAR_REDIRECT_URI") {
            self.redirect_uri = Some(uri);
        }
    }

    pub fn config_path() -> Result<PathBuf> {
        ProjectDirs::from("", "", "linear-roadmap")
            .map(|dirs| dirs.config_dir().join("config.toml"))
            .ok_or(LinearError::NoConfigDir)
    }

    /// API key required by the CLI commands.
    pub fn api_key(&self) -> Result<String> {
        self.api_key.clone().ok_or(LinearError::MissingApiKey)
    }

    /// Get team, preferring explicit argument over default
    pub fn resolve_team(&self, explicit: Option<&str>) -> Option<String> {
        explicit
            .map(String::from)
            .or_else(|| self.default_team.clone())
    }

    pub fn port(&self) -> u16 {
        self.port.unwrap_or(DEFAULT_PORT)
    }

    pub fn redirect_uri(&self) -> String {
        self.redirect_uri
            .clone()
            .unwrap_or_else(|| DEFAULT_REDIRECT_URI.to_string())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_env_overrides_file_values() {
        let mut config: Config = toml::from_str(
            r#"
api_key = "lin_api_file"
client_id = "file-client"
port = 8080
"#,
        )
        .unwrap();

        config.apply_env(env(&[("LINEAR_API_KEY", "lin_api_env"), ("PORT", "9000")]));

        assert_eq!(config.api_key.as_deref(), Some("lin_api_env"));
        assert_eq!(config.client_id.as_deref(), Some("file-client"));
        assert_eq!(config.port(), 9000);
    }

    #[test]
    fn test_empty_env_values_are_ignored() {
        let mut config = Config {
            api_key: Some("lin_api_file".to_string()),
            ..Config::default()
        };
        config.apply_env(env(&[("LINEAR_API_KEY", "  ")]));
        assert_eq!(config.api_key.as_deref(), Some("lin_api_file"));
    }

    #[test]
    fn test_external_url_builds_redirect_uri() {
        let mut config = Config::default();
        config.apply_env(env(&[
            ("RENDER_EXTERNAL_URL", "https://roadmap.example.com/"),
            ("LINEAR_REDIRECT_URI", "http://ignored/auth/callback"),
        ]));
        assert_eq!(
            config.redirect_uri(),
            "https://roadmap.example.com/auth/callback"
        );
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.port(), DEFAULT_PORT);
        assert_eq!(config.redirect_uri(), DEFAULT_REDIRECT_URI);
        assert_eq!(config.request_timeout(), Duration::from_secs(10));
        assert!(matches!(config.api_key(), Err(LinearError::MissingApiKey)));
    }

    #[test]
    fn test_resolve_team_prefers_explicit() {
        let config = Config {
            default_team: Some("ENG".to_string()),
            ..Config::default()
        };
        assert_eq!(config.resolve_team(Some("OPS")).as_deref(), Some("OPS"));
        assert_eq!(config.resolve_team(None).as_deref(), Some("ENG"));
    }
}
