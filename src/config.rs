//! Layered application settings.
//!
//! Later sources override earlier ones: built-in defaults, `config/default`,
//! `config/{MEDPORTAL_ENV}`, `MEDPORTAL__SECTION__KEY` environment variables,
//! and finally a bare `DATABASE_URL`.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use crate::crypto::HashSettings;
use crate::storage::DatabaseSettings;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub auth: HashSettings,
    pub log: LogSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogSettings {
    pub filter: String,
    pub format: LogFormat,
}

impl Settings {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        let env = std::env::var("MEDPORTAL_ENV").unwrap_or_else(|_| "development".into());
        Self::from_sources(
            Some(&format!("config/{}", env)),
            std::env::var("DATABASE_URL").ok(),
            Environment::with_prefix("MEDPORTAL")
                .prefix_separator("__")
                .separator("__"),
        )
    }

    fn from_sources(
        env_file: Option<&str>,
        database_url: Option<String>,
        environment: Environment,
    ) -> Result<Self, ConfigError> {
        let defaults = HashSettings::default();
        let mut builder = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("database.backend", "postgres")?
            .set_default("database.url", "postgres://localhost/medportal")?
            .set_default("database.pool_size", 10)?
            .set_default("auth.memory_kib", i64::from(defaults.memory_kib))?
            .set_default("auth.iterations", i64::from(defaults.iterations))?
            .set_default("auth.parallelism", i64::from(defaults.parallelism))?
            .set_default("log.filter", "info")?
            .set_default("log.format", "pretty")?
            .add_source(File::with_name("config/default").required(false));
        if let Some(path) = env_file {
            builder = builder.add_source(File::with_name(path).required(false));
        }
        builder
            .add_source(environment)
            .set_override_option("database.url", database_url)?
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::storage::Backend;

    fn vars(pairs: &[(&str, &str)]) -> Environment {
        let source: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Environment::with_prefix("MEDPORTAL")
            .prefix_separator("__")
            .separator("__")
            .source(Some(source))
    }

    #[test]
    fn defaults_fill_everything() {
        let settings = Settings::from_sources(None, None, vars(&[])).unwrap();
        assert_eq!(settings.server.port, 8080);
        assert_eq!(settings.database.backend, Backend::Postgres);
        assert_eq!(settings.log.format, LogFormat::Pretty);
    }

    #[test]
    fn environment_overrides_defaults() {
        let settings = Settings::from_sources(
            None,
            None,
            vars(&[
                ("MEDPORTAL__SERVER__PORT", "9090"),
                ("MEDPORTAL__DATABASE__BACKEND", "memory"),
                ("MEDPORTAL__LOG__FORMAT", "json"),
            ]),
        )
        .unwrap();
        assert_eq!(settings.server.port, 9090);
        assert_eq!(settings.database.backend, Backend::Memory);
        assert_eq!(settings.log.format, LogFormat::Json);
    }

    #[test]
    fn database_url_wins() {
        let settings = Settings::from_sources(
            None,
            Some("postgres://db.internal/portal".into()),
            vars(&[("MEDPORTAL__DATABASE__URL", "postgres://ignored/db")]),
        )
        .unwrap();
        assert_eq!(settings.database.url, "postgres://db.internal/portal");
    }
}
