//! Application configuration: the bar shape and its items.

use anyhow::Result;
use rotabar_types::{Color, ItemConfig};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Application-wide configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Version of the config format
    pub version: u32,
    /// Bar geometry and timing
    pub bar: BarConfig,
    /// Items configuration
    pub items: Vec<ItemConfig>,
}

impl AppConfig {
    /// Load configuration from disk
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(config_path)?;
        let config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;
        self.save_to_path(&config_path)
    }

    /// Get the configuration file path
    fn config_path() -> Result<PathBuf> {
        let dirs = directories::ProjectDirs::from("com", "github", "rotabar")
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;

        Ok(dirs.config_dir().join("config.json"))
    }

    /// Load configuration from a specific file path
    pub fn load_from_path(path: &PathBuf) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a specific file path
    pub fn save_to_path(&self, path: &PathBuf) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: 1,
            bar: BarConfig::default(),
            items: Vec::new(),
        }
    }
}

/// Bar geometry and timing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BarConfig {
    pub height: u32,
    /// Hex color string in `0xAARRGGBB` form
    #[serde(default = "default_background")]
    pub background: String,
    /// Frame clock interval in milliseconds
    #[serde(default = "default_refresh_interval_ms")]
    pub refresh_interval_ms: u64,
    /// Item poll interval in milliseconds
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

fn default_background() -> String {
    "0xff202020".to_string()
}

fn default_refresh_interval_ms() -> u64 {
    crate::core::FRAME_INTERVAL.as_millis() as u64
}

fn default_poll_interval_ms() -> u64 {
    crate::core::UPDATE_POLL_INTERVAL.as_millis() as u64
}

impl BarConfig {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms.max(1))
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn background_color(&self) -> Result<Color> {
        let raw = self.background.trim_start_matches("0x");
        let packed = u32::from_str_radix(raw, 16).map_err(|e| {
            anyhow::anyhow!("invalid background color '{}': {e}", self.background)
        })?;
        Ok(Color::from_hex(packed))
    }
}

impl Default for BarConfig {
    fn default() -> Self {
        Self {
            height: 32,
            background: default_background(),
            refresh_interval_ms: default_refresh_interval_ms(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_round_trips() {
        let config = AppConfig::default();
        let json = serde_json::to_string_pretty(&config).unwrap();
        let back: AppConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.version, 1);
        assert_eq!(back.bar.height, 32);
        assert!(back.items.is_empty());
    }

    #[test]
    fn test_partial_bar_config_uses_defaults() {
        let config: BarConfig = serde_json::from_str(r#"{"height": 24}"#).unwrap();
        assert_eq!(config.height, 24);
        assert_eq!(config.refresh_interval(), crate::core::FRAME_INTERVAL);
        assert_eq!(config.poll_interval(), crate::core::UPDATE_POLL_INTERVAL);
        assert!(config.background_color().is_ok());
    }

    #[test]
    fn test_save_and_load_from_path() {
        let dir = std::env::temp_dir().join(format!("rotabar-config-test-{}", std::process::id()));
        let path = dir.join("config.json");

        let mut config = AppConfig::default();
        config.items.push(ItemConfig {
            name: "cpu".into(),
            update_frequency: 2,
            ..ItemConfig::default()
        });
        config.save_to_path(&path).unwrap();

        let back = AppConfig::load_from_path(&path).unwrap();
        assert_eq!(back.items.len(), 1);
        assert_eq!(back.items[0].name, "cpu");
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_zero_intervals_are_clamped() {
        let config: BarConfig =
            serde_json::from_str(r#"{"height": 24, "refresh_interval_ms": 0}"#).unwrap();
        assert_eq!(config.refresh_interval(), Duration::from_millis(1));
    }
}
