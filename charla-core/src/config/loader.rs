//! Configuration loading and management

use super::schema::Config;
use super::validate::validate_config;
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Configuration loader
pub struct ConfigLoader {
    config_dir: PathBuf,
}

impl ConfigLoader {
    /// Create a new config loader with the default config directory
    pub fn new() -> Self {
        let config_dir = dirs::home_dir()
            .map(|h| h.join(".charla"))
            .unwrap_or_else(|| PathBuf::from(".charla"));

        Self { config_dir }
    }

    /// Create a new config loader with a custom config directory
    pub fn with_dir<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            config_dir: dir.as_ref().to_path_buf(),
        }
    }

    /// Load configuration from file and environment
    pub fn load(&self) -> crate::Result<Config> {
        let config_path = self.config_dir.join("config.json");

        // missing sections and fields fall back to their serde defaults
        let from_file = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            serde_json::from_str(&content)?
        } else {
            Config::default()
        };

        let mut merged = serde_json::to_value(from_file)?;
        apply_alias_overrides(&mut merged);
        apply_path_overrides(&mut merged);

        let config: Config = serde_json::from_value(merged)?;
        validate_config(&config)?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, config: &Config) -> crate::Result<()> {
        std::fs::create_dir_all(&self.config_dir)?;
        let config_path = self.config_dir.join("config.json");
        let content = serde_json::to_string_pretty(config)?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    /// Get the config directory path
    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Keys whose env values are taken verbatim, even when they parse as JSON
const STRING_KEYS: &[&str] = &["api_key", "system_prompt", "model", "api_base"];

/// Later entries win; empty values are skipped.
const ALIASES: &[(&str, &str, &str)] = &[
    ("VITE_ANTHROPIC_API_KEY", "provider", "api_key"),
    ("ANTHROPIC_API_KEY", "provider", "api_key"),
    ("ANTHROPIC_BASE_URL", "provider", "api_base"),
];

fn set_field(config: &mut Value, section: &str, key: &str, value: Value) {
    if let Some(section) = config.get_mut(section).and_then(Value::as_object_mut) {
        section.insert(key.to_string(), value);
    }
}

fn apply_alias_overrides(config: &mut Value) {
    for &(env_key, section, key) in ALIASES {
        match std::env::var(env_key) {
            Ok(value) if !value.trim().is_empty() => {
                set_field(config, section, key, Value::String(value));
            }
            _ => {}
        }
    }
}

/// `CHARLA__<SECTION>__<KEY>=value`, e.g. `CHARLA__CHAT__MAX_TOKENS=512`
fn apply_path_overrides(config: &mut Value) {
    const PREFIX: &str = "CHARLA__";
    for (name, raw) in std::env::vars() {
        let Some(path) = name.strip_prefix(PREFIX) else {
            continue;
        };
        let path = path.to_ascii_lowercase();
        let Some((section, key)) = path.split_once("__") else {
            continue;
        };

        let value = if STRING_KEYS.contains(&key) {
            Value::String(raw)
        } else {
            serde_json::from_str(&raw).unwrap_or(Value::String(raw))
        };
        set_field(config, section, key, value);
    }
}
