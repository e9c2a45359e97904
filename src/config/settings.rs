use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Name of the settings file, looked up in the working directory and
/// then in the home directory.
pub const SETTINGS_FILE: &str = ".dbkeeper.yaml";

/// Application settings. Every field has a default, so a missing or
/// partial file is fine.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub default_database: DatabaseSettings,

    #[serde(default)]
    pub storage: StorageSettings,

    #[serde(default)]
    pub backup: BackupSettings,
}

/// Default connection parameters applied when CLI flags are omitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    #[serde(default, rename = "type")]
    pub kind: String,

    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default)]
    pub port: u16,

    #[serde(default)]
    pub username: String,

    #[serde(default)]
    pub password: String,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            kind: String::new(),
            host: default_host(),
            port: 0,
            username: String::new(),
            password: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSettings {
    #[serde(default = "default_local_path")]
    pub local_path: PathBuf,

    #[serde(default)]
    pub cloud: CloudSettings,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            local_path: default_local_path(),
            cloud: CloudSettings::default(),
        }
    }
}

/// Cloud target parameters. Parsed for completeness; no cloud backend
/// is wired up.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CloudSettings {
    #[serde(default)]
    pub provider: String,
    #[serde(default)]
    pub bucket: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub access_key: String,
    #[serde(default)]
    pub secret_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupSettings {
    #[serde(default = "default_compress")]
    pub compress: bool,

    #[serde(default = "default_backup_type")]
    pub default_type: String,
}

impl Default for BackupSettings {
    fn default() -> Self {
        Self {
            compress: default_compress(),
            default_type: default_backup_type(),
        }
    }
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_local_path() -> PathBuf {
    PathBuf::from("./backups")
}

fn default_compress() -> bool {
    true
}

fn default_backup_type() -> String {
    "full".to_string()
}

impl Settings {
    /// Load from an explicit path, or search the working directory and
    /// then the home directory. A missing file yields the defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        if Path::new(SETTINGS_FILE).exists() {
            return Self::from_file(Path::new(SETTINGS_FILE));
        }
        if let Some(home) = home_dir() {
            let path = home.join(SETTINGS_FILE);
            if path.exists() {
                return Self::from_file(&path);
            }
        }
        Ok(Self::default())
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        serde_yaml::from_str(&content)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_yaml::to_string(self).context("failed to serialize config")?;
        fs::write(path, content)
            .with_context(|| format!("failed to write config file {}", path.display()))
    }
}

fn home_dir() -> Option<PathBuf> {
    if cfg!(windows) {
        std::env::var("USERPROFILE").ok().map(PathBuf::from)
    } else {
        std::env::var("HOME").ok().map(PathBuf::from)
    }
}
