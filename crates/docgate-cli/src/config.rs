//! Runtime configuration.
//!
//! Reads `config/default.toml`, then applies `DOCGATE_*` environment
//! overrides (a `.env` file is loaded into the environment by `main`).
//! Command-line flags are applied last, by the subcommands themselves.

use std::path::PathBuf;

use docgate_adapters::{ApiClientConfig, DEFAULT_API_URL};
use docgate_web::{DEFAULT_API_PORT, WebConfig};

/// Location of the configuration file, relative to the working directory.
pub const CONFIG_PATH: &str = "config/default.toml";

/// Settings from the `[server]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerSettings {
    pub bind: String,
    pub port: u16,
}

/// Settings from the `[store]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreSettings {
    /// SQLite file backing the document store.
    pub path: PathBuf,
    /// Name reported as `database` by the collections API.
    pub database_name: String,
}

/// Settings from the `[bridge]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct BridgeSettings {
    pub api_url: String,
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub server: ServerSettings,
    pub store: StoreSettings,
    pub bridge: BridgeSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerSettings {
                bind: "0.0.0.0".into(),
                port: DEFAULT_API_PORT,
            },
            store: StoreSettings {
                path: PathBuf::from("data/docgate.db"),
                database_name: "companyDB".into(),
            },
            bridge: BridgeSettings {
                api_url: DEFAULT_API_URL.into(),
                enabled: true,
            },
        }
    }
}

impl Config {
    /// Load from [`CONFIG_PATH`] and the process environment.
    ///
    /// A missing file means defaults; an unparsable one is logged and
    /// ignored.
    pub fn load() -> Self {
        let content = std::fs::read_to_string(CONFIG_PATH).ok();
        Self::from_sources(content.as_deref(), |key| std::env::var(key).ok())
    }

    /// Build a configuration from file contents and an environment lookup.
    pub fn from_sources(content: Option<&str>, env: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(content) = content {
            match content.parse::<toml::Table>() {
                Ok(table) => config.merge_table(&table),
                Err(e) => tracing::warn!(error = %e, path = CONFIG_PATH, "ignoring invalid config file"),
            }
        }

        if let Some(path) = env("DOCGATE_DB_PATH") {
            config.store.path = PathBuf::from(path);
        }
        if let Some(name) = env("DOCGATE_DB_NAME") {
            config.store.database_name = name;
        }
        if let Some(url) = env("DOCGATE_API_URL") {
            config.bridge.api_url = url;
        }
        if let Some(flag) = env("DOCGATE_ENABLE_API") {
            config.bridge.enabled = parse_flag(&flag);
        }

        config
    }

    fn merge_table(&mut self, table: &toml::Table) {
        if let Some(toml::Value::Table(server)) = table.get("server") {
            if let Some(bind) = server.get("bind").and_then(|v| v.as_str()) {
                self.server.bind = bind.to_owned();
            }
            if let Some(port) = server
                .get("port")
                .and_then(|v| v.as_integer())
                .and_then(|v| u16::try_from(v).ok())
            {
                self.server.port = port;
            }
        }

        if let Some(toml::Value::Table(store)) = table.get("store") {
            if let Some(path) = store.get("path").and_then(|v| v.as_str()) {
                self.store.path = PathBuf::from(path);
            }
            if let Some(name) = store.get("database_name").and_then(|v| v.as_str()) {
                self.store.database_name = name.to_owned();
            }
        }

        if let Some(toml::Value::Table(bridge)) = table.get("bridge") {
            if let Some(url) = bridge.get("api_url").and_then(|v| v.as_str()) {
                self.bridge.api_url = url.to_owned();
            }
            if let Some(enabled) = bridge.get("enabled").and_then(|v| v.as_bool()) {
                self.bridge.enabled = enabled;
            }
        }
    }

    /// Web configuration with optional command-line overrides.
    pub fn web(&self, bind: Option<String>, port: Option<u16>) -> WebConfig {
        WebConfig {
            bind_addr: bind.unwrap_or_else(|| self.server.bind.clone()),
            port: port.unwrap_or(self.server.port),
        }
    }

    pub fn api_client(&self) -> ApiClientConfig {
        ApiClientConfig {
            base_url: self.bridge.api_url.clone(),
            enabled: self.bridge.enabled,
        }
    }
}

/// `1`, `true` and `yes` (any case) enable; anything else disables.
fn parse_flag(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn defaults_without_sources() {
        let config = Config::from_sources(None, no_env);
        assert_eq!(config, Config::default());
        assert_eq!(config.server.port, 8001);
        assert_eq!(config.store.database_name, "companyDB");
        assert_eq!(config.bridge.api_url, "http://127.0.0.1:8001");
        assert!(config.bridge.enabled);
    }

    #[test]
    fn file_values_then_env_overrides() {
        let file = r#"
            [server]
            bind = "127.0.0.1"
            port = 9001

            [store]
            path = "/tmp/file.db"

            [bridge]
            api_url = "http://file:1"
            enabled = true
        "#;
        let env: HashMap<&str, &str> = [
            ("DOCGATE_DB_PATH", "/tmp/env.db"),
            ("DOCGATE_ENABLE_API", "off"),
        ]
        .into_iter()
        .collect();

        let config = Config::from_sources(Some(file), |k| env.get(k).map(|v| (*v).to_owned()));
        assert_eq!(config.server.bind, "127.0.0.1");
        assert_eq!(config.server.port, 9001);
        assert_eq!(config.store.path, PathBuf::from("/tmp/env.db"));
        assert_eq!(config.store.database_name, "companyDB");
        assert_eq!(config.bridge.api_url, "http://file:1");
        assert!(!config.bridge.enabled);
    }

    #[test]
    fn invalid_file_falls_back_to_defaults() {
        let config = Config::from_sources(Some("[server\nport = "), no_env);
        assert_eq!(config, Config::default());
    }

    #[test]
    fn out_of_range_port_is_ignored() {
        let config = Config::from_sources(Some("[server]\nport = 70000"), no_env);
        assert_eq!(config.server.port, 8001);
    }

    #[test]
    fn enable_flag_spellings() {
        for raw in ["1", "true", "YES", " yes "] {
            assert!(parse_flag(raw), "{raw}");
        }
        for raw in ["0", "false", "no", ""] {
            assert!(!parse_flag(raw), "{raw}");
        }
    }

    #[test]
    fn flags_override_server_section() {
        let config = Config::default();
        let web = config.web(None, Some(8000));
        assert_eq!(web.bind_addr, "0.0.0.0");
        assert_eq!(web.port, 8000);
    }
}
