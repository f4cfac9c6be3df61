//! Config file discovery, loading and saving
//!
//! Files ending in `.yaml` or `.yml` are YAML; anything else is JSON.

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};

use super::EngineConfig;
use crate::utils::LogLevel;

/// Working-directory candidates, checked before the user config dir
pub const CONFIG_LOCATIONS: &[&str] = &["./dspec.yaml", "./dspec.yml", "./.dspec.yaml"];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Format {
    Yaml,
    Json,
}

impl Format {
    fn of(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml" | "yml") => Format::Yaml,
            _ => Format::Json,
        }
    }

    fn parse(self, content: &str) -> Result<EngineConfig> {
        Ok(match self {
            Format::Yaml => serde_yaml::from_str(content)?,
            Format::Json => serde_json::from_str(content)?,
        })
    }

    fn render(self, config: &EngineConfig) -> Result<String> {
        Ok(match self {
            Format::Yaml => serde_yaml::to_string(config)?,
            Format::Json => serde_json::to_string_pretty(config)?,
        })
    }
}

impl EngineConfig {
    /// First existing candidate: [`CONFIG_LOCATIONS`], then
    /// `<config dir>/dspec/config.yaml`
    pub fn find() -> Option<PathBuf> {
        let user = dirs::config_dir().map(|dir| dir.join("dspec").join("config.yaml"));
        CONFIG_LOCATIONS
            .iter()
            .map(PathBuf::from)
            .chain(user)
            .find(|path| path.is_file())
    }

    /// Load the discovered file, or defaults when there is none
    pub fn load_default() -> Result<Self> {
        match Self::find() {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config = Format::of(path)
            .parse(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("Invalid config file: {}", path.display()))?;
        Ok(config)
    }

    /// Write in the format the extension names, creating parent directories
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = Format::of(path).render(self).context("Failed to serialize config")?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))
    }

    pub fn validate(&self) -> Result<()> {
        if self.poll_interval_ms == 0 {
            bail!("poll_interval_ms must be greater than 0");
        }
        if LogLevel::from_str(&self.log_level).is_none() {
            bail!("Unknown log level: {}", self.log_level);
        }
        if self.suite_title.trim().is_empty() {
            bail!("suite_title must not be empty");
        }
        Ok(())
    }
}
