use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "outreach.yaml";

// ---------------------------------------------------------------------------
// SmtpSettings
// ---------------------------------------------------------------------------

/// Outbound server settings. The credential is deliberately not part of the
/// on-disk config; it comes in through the environment at send time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SmtpSettings {
    #[serde(default = "default_server")]
    pub server: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub sender: String,
}

fn default_server() -> String {
    "smtp.gmail.com".to_string()
}

fn default_port() -> u16 {
    587
}

impl Default for SmtpSettings {
    fn default() -> Self {
        Self {
            server: default_server(),
            port: default_port(),
            sender: String::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub smtp: SmtpSettings,
    /// Template set location, relative to the working root.
    #[serde(default = "default_templates_path")]
    pub templates_path: PathBuf,
    /// Delay between messages, in milliseconds.
    #[serde(default = "default_pacing_ms")]
    pub pacing_ms: u64,
}

fn default_templates_path() -> PathBuf {
    PathBuf::from("email_templates.json")
}

fn default_pacing_ms() -> u64 {
    100
}

impl Default for Config {
    fn default() -> Self {
        Self {
            smtp: SmtpSettings::default(),
            templates_path: default_templates_path(),
            pacing_ms: default_pacing_ms(),
        }
    }
}

impl Config {
    /// Load `outreach.yaml` from `root`; a missing file yields the defaults.
    pub fn load(root: &Path) -> Result<Self> {
        let path = root.join(CONFIG_FILE);
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(&path)?;
        let config: Config = serde_yaml::from_str(&data)?;
        Ok(config)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
