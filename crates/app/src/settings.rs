//! Application settings, read from `settings.toml`.

use config::{Config, ConfigError, File};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Database {
    Memory,
    Sqlite(String),
}

#[derive(Debug, Deserialize)]
pub struct App {
    pub level: String,
}

#[derive(Debug, Deserialize)]
pub struct Server {
    pub bind: Option<String>,
    pub port: u16,
    pub database: Database,
}

#[derive(Debug, Deserialize)]
pub struct Scheduler {
    pub enabled: bool,
}

/// Currency conversion via exchangerate-api.com.
#[derive(Debug, Deserialize)]
pub struct Rates {
    pub api_key: String,
    pub base_url: Option<String>,
}

/// Webhook notification delivery.
#[derive(Debug, Deserialize)]
pub struct Notifier {
    pub webhook_url: String,
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub app: App,
    pub server: Option<Server>,
    pub scheduler: Option<Scheduler>,
    pub rates: Option<Rates>,
    pub notifier: Option<Notifier>,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name("settings"))
            .build()?;

        settings.try_deserialize()
    }
}
