use crate::models::SlideshowConfig;
use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;

/// Configuration manager for loading and saving the YAML configuration file.
///
/// Manages a single file (`slideshow.yaml`) holding the timing options, the
/// image discovery settings, and the debug switch. Every option has a
/// default, so a missing or partial file never blocks a run.
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config_dir: Utf8PathBuf,
    config_path: Utf8PathBuf,
}

impl ConfigManager {
    /// Create a new ConfigManager with the specified configuration directory.
    ///
    /// # Arguments
    /// * `config_dir` - Directory containing the configuration file (e.g., "slidecycle-data")
    ///
    /// # Returns
    /// A new ConfigManager instance
    pub fn new<P: AsRef<Utf8Path>>(config_dir: P) -> Result<Self> {
        let config_dir = config_dir.as_ref().to_path_buf();

        // Create config directory if it doesn't exist
        if !config_dir.exists() {
            fs::create_dir_all(&config_dir)
                .with_context(|| format!("Failed to create config directory: {}", config_dir))?;
        }

        Ok(Self {
            config_path: config_dir.join("slideshow.yaml"),
            config_dir,
        })
    }

    /// Load the configuration file.
    ///
    /// Unrecognized keys are ignored and unspecified keys keep their
    /// defaults. A file that fails to parse is reported and replaced by
    /// the defaults rather than aborting the run; an unreadable file is
    /// still an error.
    ///
    /// # Returns
    /// The loaded SlideshowConfig, or defaults if the file doesn't exist
    pub fn load(&self) -> Result<SlideshowConfig> {
        if !self.config_path.exists() {
            tracing::warn!(
                "Config file not found at {}, using defaults",
                self.config_path
            );
            return Ok(SlideshowConfig::default());
        }

        let file_contents = fs::read_to_string(&self.config_path)
            .with_context(|| format!("Failed to read config: {}", self.config_path))?;

        match serde_yaml_ng::from_str(&file_contents) {
            Ok(config) => {
                tracing::info!("Loaded config from {}", self.config_path);
                Ok(config)
            }
            Err(error) => {
                tracing::warn!(
                    "Failed to parse config at {}: {error}; using defaults",
                    self.config_path
                );
                Ok(SlideshowConfig::default())
            }
        }
    }

    /// Save the configuration file.
    ///
    /// # Arguments
    /// * `config` - The SlideshowConfig to save
    pub fn save(&self, config: &SlideshowConfig) -> Result<()> {
        let yaml_string =
            serde_yaml_ng::to_string(config).context("Failed to serialize config to YAML")?;

        fs::write(&self.config_path, yaml_string)
            .with_context(|| format!("Failed to write config: {}", self.config_path))?;

        tracing::info!("Saved config to {}", self.config_path);
        Ok(())
    }

    /// Get the configuration directory path.
    pub fn config_dir(&self) -> &Utf8Path {
        &self.config_dir
    }

    /// Get the configuration file path.
    pub fn config_path(&self) -> &Utf8Path {
        &self.config_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_config_manager() -> (ConfigManager, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let config_path = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
        let manager = ConfigManager::new(&config_path).unwrap();
        (manager, temp_dir)
    }

    #[test]
    fn test_create_config_manager() {
        let (manager, _temp_dir) = create_test_config_manager();
        assert!(manager.config_path().as_str().ends_with("slideshow.yaml"));
    }

    #[test]
    fn test_new_creates_missing_directory() {
        let temp_dir = TempDir::new().unwrap();
        let base = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
        let nested = base.join("nested").join("data");

        let manager = ConfigManager::new(&nested).unwrap();
        assert!(manager.config_dir().exists());
    }

    #[test]
    fn test_missing_file_loads_defaults() {
        let (manager, _temp_dir) = create_test_config_manager();

        let config = manager.load().unwrap();
        assert_eq!(config.timing.hold_ms, 5000);
        assert_eq!(config.slide_count, 6);
    }

    #[test]
    fn test_load_save_roundtrip() {
        let (manager, _temp_dir) = create_test_config_manager();

        let mut config = SlideshowConfig::default();
        config.timing.hold_ms = 2500;
        config.timing.fade_ms = 450;
        config.image_dir = "photos".to_string();
        manager.save(&config).unwrap();

        let loaded = manager.load().unwrap();
        assert_eq!(loaded.timing.hold_ms, 2500);
        assert_eq!(loaded.timing.fade_ms, 450);
        assert_eq!(loaded.image_dir, "photos");
        // Untouched options keep their defaults through the roundtrip
        assert_eq!(loaded.timing.teardown_ms, 400);
        assert_eq!(loaded.fallback_sources, vec!["media1/banana.jpg"]);
    }

    #[test]
    fn test_saved_file_uses_recognized_keys() {
        let (manager, _temp_dir) = create_test_config_manager();

        manager.save(&SlideshowConfig::default()).unwrap();

        let raw = fs::read_to_string(manager.config_path()).unwrap();
        assert!(raw.contains("holdDurationMs"));
        assert!(raw.contains("fallbackMarginMs"));
        assert!(raw.contains("imageDir"));
    }

    #[test]
    fn test_invalid_yaml_falls_back_to_defaults() {
        let (manager, _temp_dir) = create_test_config_manager();
        fs::write(manager.config_path(), "timing: [not, a, mapping").unwrap();

        let config = manager.load().unwrap();
        assert_eq!(config.timing.hold_ms, 5000);
        assert_eq!(config.slide_count, 6);
    }

    #[test]
    fn test_unknown_keys_are_ignored() {
        let (manager, _temp_dir) = create_test_config_manager();
        fs::write(
            manager.config_path(),
            "slideCount: 3\nsomeFutureOption: true\n",
        )
        .unwrap();

        let config = manager.load().unwrap();
        assert_eq!(config.slide_count, 3);
    }
}
