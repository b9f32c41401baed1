//! Configuration for checkin-ledger

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Address the HTTP endpoint binds to
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// HTTP port
    #[serde(default = "default_http_port")]
    pub http_port: u16,

    /// SQLite database holding the sheets
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    /// Sheet that receives check-in rows
    #[serde(default = "default_sheet_name")]
    pub sheet_name: String,
}

fn default_bind_addr() -> String {
    "0.0.0.0".to_string()
}

fn default_http_port() -> u16 {
    8095
}

fn default_database_path() -> PathBuf {
    PathBuf::from("checkin-ledger.db")
}

fn default_sheet_name() -> String {
    "Responses".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            http_port: default_http_port(),
            database_path: default_database_path(),
            sheet_name: default_sheet_name(),
        }
    }
}

impl Config {
    /// Load config from file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }

    /// Save config to file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), std::io::Error> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }

    /// `bind_addr:http_port`
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind_addr, self.http_port)
    }
}
