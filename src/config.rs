use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable that overrides the backend address
pub const BACKEND_URL_ENV: &str = "AGROMIND_BACKEND_URL";

const CONFIG_FILE: &str = "config.toml";
const LOG_FILE: &str = "agromind.log";

/// Main application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Question-answering backend
    pub backend: BackendConfig,

    /// UI preferences
    pub ui: UiConfig,

    /// AgroMind home directory, not written to the file
    #[serde(skip)]
    pub home: PathBuf,
}

/// Where and how to reach the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

/// UI configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    /// Label shown above bot messages
    pub assistant_name: String,
    /// Badge shown in the header
    pub model_label: String,
    /// How long transient notices such as "Copied" stay visible
    pub status_timeout_ms: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            timeout_secs: 60,
        }
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            assistant_name: "Agri Chatbot".to_string(),
            model_label: "GPT-4o-mini".to_string(),
            status_timeout_ms: 2000,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("~"));
        Config {
            backend: BackendConfig::default(),
            ui: UiConfig::default(),
            home: home.join(".agromind"),
        }
    }
}

impl Config {
    /// Load `~/.agromind/config.toml` and apply the environment override.
    /// Nothing is written; see [`Config::write_template_if_missing`].
    pub fn load() -> Result<Self> {
        let home = dirs::home_dir().context("Could not find home directory")?;
        let mut config = Self::load_from(&home.join(".agromind"))?;
        config.apply_env();
        Ok(config)
    }

    /// Load the configuration stored under `home`
    pub fn load_from(home: &Path) -> Result<Self> {
        let config_path = home.join(CONFIG_FILE);

        let mut config = if config_path.exists() {
            let content = fs::read_to_string(&config_path)
                .context("Failed to read config file")?;
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse {}", config_path.display()))?
        } else {
            Config::default()
        };
        config.home = home.to_path_buf();

        Ok(config)
    }

    /// Save the current settings as a template when no config file exists
    /// yet. Returns whether a file was written.
    pub fn write_template_if_missing(&self) -> Result<bool> {
        if self.config_path().exists() {
            return Ok(false);
        }
        self.save()?;
        Ok(true)
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        fs::create_dir_all(&self.home).context("Failed to create .agromind directory")?;
        let content = toml::to_string_pretty(self)
            .context("Failed to serialize config")?;
        fs::write(self.config_path(), content)
            .context("Failed to write config file")?;
        Ok(())
    }

    pub fn config_path(&self) -> PathBuf {
        self.home.join(CONFIG_FILE)
    }

    /// File the TUI logs to so output never lands on the screen
    pub fn log_path(&self) -> PathBuf {
        self.home.join(LOG_FILE)
    }

    fn apply_env(&mut self) {
        if let Ok(url) = std::env::var(BACKEND_URL_ENV) {
            self.apply_backend_url(Some(url));
        }
    }

    /// Override the backend address, ignoring blank values
    pub fn apply_backend_url(&mut self, url: Option<String>) {
        if let Some(url) = url.filter(|u| !u.trim().is_empty()) {
            self.backend.base_url = url.trim().to_string();
        }
    }

    pub fn apply_timeout(&mut self, secs: Option<u64>) {
        if let Some(secs) = secs {
            self.backend.timeout_secs = secs;
        }
    }
}
