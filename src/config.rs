//! Runtime configuration
//!
//! Layers, lowest precedence first: built-in defaults, an optional YAML file,
//! then `HOTEL_APPROVAL_*` environment variables.
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const ENV_PREFIX: &str = "HOTEL_APPROVAL_";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub data_dir: PathBuf,
    pub jwt_secret: String,
    pub access_token_ttl_secs: i64,
    pub refresh_token_ttl_secs: i64,
    pub flush_on_write: bool,
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data/hotel-approval.db"),
            jwt_secret: "dev_secret".into(),
            access_token_ttl_secs: 15 * 60,
            refresh_token_ttl_secs: 7 * 24 * 60 * 60,
            flush_on_write: true,
            log_filter: "hotel_approval=info".into(),
        }
    }
}

impl Config {
    pub fn figment(file: Option<&Path>) -> Figment {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));
        if let Some(file) = file {
            figment = figment.merge(Yaml::file(file));
        }
        figment.merge(Env::prefixed(ENV_PREFIX))
    }

    pub fn load(file: Option<&Path>) -> anyhow::Result<Self> {
        let config: Config = Self::figment(file).extract()?;
        if config.jwt_secret.is_empty() {
            anyhow::bail!("jwt_secret must not be empty");
        }
        if config.access_token_ttl_secs <= 0 {
            anyhow::bail!("access_token_ttl_secs must be positive");
        }
        if config.refresh_token_ttl_secs <= 0 {
            anyhow::bail!("refresh_token_ttl_secs must be positive");
        }
        Ok(config)
    }
}
