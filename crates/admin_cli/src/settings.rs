//! Settings for `tally_admin`.
//!
//! Sources, later ones winning: the TOML file (`config/tally.toml` unless
//! `--config` is given), `TALLY_*` environment variables (`__` separates
//! nested keys, e.g. `TALLY_DATABASE__URL`), then command line flags.

use serde::Deserialize;

const DEFAULT_CONFIG_PATH: &str = "config/tally.toml";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct App {
    pub level: String,
}

impl Default for App {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Database {
    pub url: String,
}

impl Default for Database {
    fn default() -> Self {
        Self {
            url: "sqlite:./tally.db?mode=rwc".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Engine {
    /// Attempts after a conflicting concurrent write.
    pub max_retries: u32,
}

impl Default for Engine {
    fn default() -> Self {
        Self { max_retries: 3 }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub app: App,
    pub database: Database,
    pub engine: Engine,
}

/// Values given on the command line; they override every other source.
#[derive(Debug, Default)]
pub struct Overrides {
    pub config: Option<String>,
    pub database_url: Option<String>,
    pub log_level: Option<String>,
}

impl Settings {
    pub fn load(overrides: Overrides) -> Result<Self, config::ConfigError> {
        let config_path = overrides.config.as_deref().unwrap_or(DEFAULT_CONFIG_PATH);
        let mut settings: Settings = config::Config::builder()
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(
                config::Environment::with_prefix("TALLY")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        if let Some(url) = overrides.database_url {
            settings.database.url = url;
        }
        if let Some(level) = overrides.log_level {
            settings.app.level = level;
        }
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_without_a_config_file() {
        let settings = Settings::load(Overrides {
            config: Some("does/not/exist.toml".to_string()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(settings.engine.max_retries, 3);
        assert!(settings.database.url.starts_with("sqlite:"));
    }

    #[test]
    fn flags_override_other_sources() {
        let settings = Settings::load(Overrides {
            config: Some("does/not/exist.toml".to_string()),
            database_url: Some("sqlite::memory:".to_string()),
            log_level: Some("debug".to_string()),
        })
        .unwrap();
        assert_eq!(settings.database.url, "sqlite::memory:");
        assert_eq!(settings.app.level, "debug");
    }
}
