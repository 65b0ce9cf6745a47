use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const STABLE_CHANNEL_URL: &str =
    "https://discord.com/api/download/stable?platform=linux&format=deb";

/// How privileged commands get authorized.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum AuthMethod {
    /// System authentication agent (pkexec)
    Agent,
    /// Masked password prompt piped to sudo
    Password,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Config {
    pub channel_url: String,
    /// Defaults to the OS temporary directory at the time of the run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_dir: Option<PathBuf>,
    pub app_binary: String,
    pub package_binary: String,
    pub auth: AuthMethod,
    pub agent_helper: String,
    pub sudo_helper: String,
    pub bootstrap: bool,
    pub repair_dependencies: bool,
    pub repair_command: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            channel_url: STABLE_CHANNEL_URL.to_string(),
            download_dir: None,
            app_binary: "discord".to_string(),
            package_binary: "dpkg".to_string(),
            auth: AuthMethod::Agent,
            agent_helper: "pkexec".to_string(),
            sudo_helper: "sudo".to_string(),
            bootstrap: true,
            repair_dependencies: true,
            repair_command: ["apt-get", "-f", "install", "-y"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl Config {
    pub fn download_dir(&self) -> PathBuf {
        self.download_dir.clone().unwrap_or_else(std::env::temp_dir)
    }

    /// The repair command, or `None` when repair is switched off.
    pub fn repair(&self) -> Option<Vec<String>> {
        if self.repair_dependencies && !self.repair_command.is_empty() {
            Some(self.repair_command.clone())
        } else {
            None
        }
    }
}

/// Loads `~/.discord-launcher/config.json`. An unusable home directory
/// falls back to the defaults; only an unreadable or invalid file is an error.
pub fn load_config() -> Result<Config> {
    let Some(mut path) = dirs::home_dir() else {
        log::warn!("Could not find home directory, using default config");
        return Ok(Config::default());
    };
    path.push(".discord-launcher");
    if let Err(err) = fs::create_dir_all(&path) {
        log::warn!("Could not create {}: {err}, using default config", path.display());
        return Ok(Config::default());
    }
    path.push("config.json");
    load_from(&path)
}

/// Reads `path`, writing the defaults there first if it does not exist.
/// Failing to write the defaults is not fatal.
pub fn load_from(path: &Path) -> Result<Config> {
    if !path.exists() {
        let config = Config::default();
        let data = serde_json::to_string_pretty(&config)?;
        if let Err(err) = fs::write(path, data) {
            log::warn!("Could not write default config to {}: {err}", path.display());
        }
        return Ok(config);
    }

    let data = fs::read_to_string(path)
        .with_context(|| format!("Could not read config {}", path.display()))?;
    let config = serde_json::from_str(&data)
        .with_context(|| format!("Invalid config {}", path.display()))?;
    Ok(config)
}
