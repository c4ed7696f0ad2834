use crate::error::AppError;
use config::{Config as Cfg, Environment, File};
use serde::Deserialize;
use serde::de::DeserializeOwned;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub log_json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_json: false,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let config = Cfg::builder()
            .add_source(File::with_name("configuration").required(false))
            .add_source(Environment::with_prefix("APP").separator("__"))
            .build()?;

        Ok(config.try_deserialize()?)
    }
}

/// Load a service-specific section from an optional `file_name` config file
/// and `{prefix}__*` environment variables.
///
/// Keys listed in `list_keys` are split on commas when read from the
/// environment.
pub fn load_section<T: DeserializeOwned>(
    file_name: &str,
    prefix: &str,
    list_keys: &[&str],
) -> Result<T, AppError> {
    dotenvy::dotenv().ok();

    let mut env = Environment::with_prefix(prefix)
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true);
    if !list_keys.is_empty() {
        env = env.list_separator(",");
        for key in list_keys {
            env = env.with_list_parse_key(key);
        }
    }

    let config = Cfg::builder()
        .add_source(File::with_name(file_name).required(false))
        .add_source(env)
        .build()?;

    Ok(config.try_deserialize()?)
}
