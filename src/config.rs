use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub relation: RelationConfig,
    #[serde(default)]
    pub state: StateConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RelationConfig {
    /// Endpoint name the client is bound to
    #[serde(default = "default_relation_name")]
    pub name: String,
    /// Remote unit the harness attributes relation data to
    #[serde(default = "default_remote_unit")]
    pub remote_unit: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StateConfig {
    #[serde(default = "default_state_path")]
    pub path: PathBuf,
}

impl Default for RelationConfig {
    fn default() -> Self {
        Self {
            name: default_relation_name(),
            remote_unit: default_remote_unit(),
        }
    }
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            path: default_state_path(),
        }
    }
}

impl Config {
    /// Loads configuration from an optional TOML file, overridden by
    /// `PGSQL_INTERFACE_*` environment variables (`__` separates sections).
    pub fn load(path: Option<&Path>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }

        let settings = builder
            .add_source(
                config::Environment::with_prefix("PGSQL_INTERFACE")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        settings.try_deserialize()
    }
}

fn default_relation_name() -> String {
    "db".to_string()
}

fn default_remote_unit() -> String {
    "postgresql/0".to_string()
}

fn default_state_path() -> PathBuf {
    PathBuf::from("pgsql-state.json")
}
