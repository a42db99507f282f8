use anyhow::{anyhow, Result};
use config::Config;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::database::SessionSettings;
use crate::scenario::SequencerSettings;

/// Default configuration file, read from the working directory when present
pub const DEFAULT_CONFIG_FILE: &str = "txprobe.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeConfig {
    /// Path of the SQLite file the scenarios run against
    pub db_path: String,

    /// Address the HTTP listener binds to
    pub address: String,

    /// Port the HTTP listener binds to
    pub port: u16,

    /// How long a statement waits on a held lock before failing
    pub busy_timeout_ms: u64,

    /// Upper bound of every read step
    pub read_limit: u32,

    /// Text stored by every write step
    pub insert_value: String,

    /// Recreate the database file on startup
    pub reset_on_start: bool,

    /// Answer `read_write_transaction_immediate` without touching the store
    pub immediate_placeholder: bool,
}

const EMPTY_CONFIG: &str = r#"### txprobe configuration file

### SQLite file the scenarios run against (recreated on start)
# db_path = "./db.sqlite3"

### HTTP listener
# address = "0.0.0.0"
# port = 8000

### lock wait before a statement fails with SQLITE_BUSY (milliseconds)
# busy_timeout_ms = 5000

### statement parameters
# read_limit = 10
# insert_value = "name"

### startup and scenario switches
# reset_on_start = true
# immediate_placeholder = false
"#;

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            db_path: "./db.sqlite3".to_string(),
            address: "0.0.0.0".to_string(),
            port: 8000,
            busy_timeout_ms: 5000,
            read_limit: 10,
            insert_value: "name".to_string(),
            reset_on_start: true,
            immediate_placeholder: false,
        }
    }
}

impl ProbeConfig {
    /// Function to create and initialize a new configuration
    ///
    /// Sources, later ones winning: built-in defaults, the TOML file (the
    /// given path, created from a template if missing, or `./txprobe.toml`
    /// if it exists), then `TXPROBE_*` environment variables.
    pub fn new(path: &Option<String>) -> Result<ProbeConfig> {
        let mut builder = Config::builder();

        // Add in toml configuration file
        match path {
            Some(p) => {
                let path = Path::new(p.as_str());
                if path.exists() {
                    let path_str = path
                        .to_str()
                        .ok_or_else(|| anyhow!("Could not convert path to string"))?;
                    builder = builder.add_source(config::File::with_name(path_str));
                } else {
                    std::fs::write(p.as_str(), EMPTY_CONFIG)
                        .map_err(|e| anyhow!("Unable to create config file: {}", e))?;
                }
            }
            None => {
                if Path::new(DEFAULT_CONFIG_FILE).exists() {
                    builder = builder.add_source(config::File::with_name(DEFAULT_CONFIG_FILE));
                }
            }
        }

        // Add in settings from the environment (with a prefix of TXPROBE)
        // E.g., `TXPROBE_PORT=9000 ./txprobe` would set the listener port
        builder = builder.add_source(config::Environment::with_prefix("TXPROBE"));

        let settings = builder
            .build()
            .map_err(|e| anyhow!("Failed to build configuration: {}", e))?;

        let config = settings
            .try_deserialize::<HashMap<String, String>>()
            .map_err(|e| anyhow!("Failed to deserialize configuration: {}", e))?;

        Self::from_map(&config)
    }

    /// Build a configuration from flat key/value pairs, defaulting missing keys
    pub fn from_map(config: &HashMap<String, String>) -> Result<ProbeConfig> {
        let defaults = ProbeConfig::default();

        Ok(ProbeConfig {
            db_path: config.get("db_path").cloned().unwrap_or(defaults.db_path),
            address: config.get("address").cloned().unwrap_or(defaults.address),
            port: parse_key(config, "port", defaults.port)?,
            busy_timeout_ms: parse_key(config, "busy_timeout_ms", defaults.busy_timeout_ms)?,
            read_limit: parse_key(config, "read_limit", defaults.read_limit)?,
            insert_value: config
                .get("insert_value")
                .cloned()
                .unwrap_or(defaults.insert_value),
            reset_on_start: parse_key(config, "reset_on_start", defaults.reset_on_start)?,
            immediate_placeholder: parse_key(
                config,
                "immediate_placeholder",
                defaults.immediate_placeholder,
            )?,
        })
    }

    /// Get the path to the SQLite database file
    pub fn sqlite_path(&self) -> PathBuf {
        PathBuf::from(&self.db_path)
    }

    /// Get the busy timeout as Duration
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }

    /// Session pragmas for every connection to the store
    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings::with_busy_timeout(self.busy_timeout())
    }

    /// Statement parameters for scenario runs
    pub fn sequencer_settings(&self) -> SequencerSettings {
        SequencerSettings {
            read_limit: self.read_limit,
            insert_value: self.insert_value.clone(),
        }
    }

    /// Display configuration summary
    pub fn summary(&self) -> String {
        let lines = [
            format!("SQLite Path:        {}", self.db_path),
            format!("Listen Address:     {}:{}", self.address, self.port),
            format!("Busy Timeout:       {} ms", self.busy_timeout_ms),
            format!("Read Limit:         {}", self.read_limit),
            format!("Insert Value:       {}", self.insert_value),
            format!("Reset On Start:     {}", self.reset_on_start),
            format!("Immediate Mode:     {}", self.immediate_mode_label()),
        ];

        lines.join("\n")
    }

    fn immediate_mode_label(&self) -> &'static str {
        if self.immediate_placeholder {
            "placeholder (no store access)"
        } else {
            "BEGIN IMMEDIATE"
        }
    }
}

fn parse_key<T>(config: &HashMap<String, String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match config.get(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow!("Invalid value '{}' for {}: {}", raw, key, e)),
        None => Ok(default),
    }
}
