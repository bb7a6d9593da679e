//! Integration tests for ConfigManager and configuration file handling
//!
//! These tests verify:
//! - Configuration loading and saving
//! - Default values when the file is missing or partial
//! - The recognized camelCase option names
//! - Tolerant handling of unparseable files
//! - Integration with the cycle controller's timing

use camino::Utf8PathBuf;
use slidecycle::ConfigManager;
use slidecycle::models::SlideshowConfig;
use std::fs;
use tempfile::TempDir;

fn create_test_config_dir() -> (TempDir, Utf8PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let config_path = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
    (temp_dir, config_path)
}

#[test]
fn test_create_config_manager() {
    let (_temp_dir, config_path) = create_test_config_dir();
    let manager = ConfigManager::new(&config_path).unwrap();

    assert_eq!(manager.config_dir(), &config_path);
    assert_eq!(manager.config_path(), config_path.join("slideshow.yaml"));
}

#[test]
fn test_load_default_config() {
    let (_temp_dir, config_path) = create_test_config_dir();
    let manager = ConfigManager::new(&config_path).unwrap();

    // Config file doesn't exist, should return defaults
    let config = manager.load().unwrap();

    assert_eq!(config.timing.hold_ms, 5000);
    assert_eq!(config.timing.fade_ms, 900);
    assert_eq!(config.timing.teardown_ms, 400);
    assert_eq!(config.timing.fallback_margin_ms, 300);
    assert_eq!(config.slide_count, 6);
    assert_eq!(config.image_dir, "media1");
    assert_eq!(config.fallback_sources, vec!["media1/banana.jpg"]);
    assert!(!config.debug_mode);
}

#[test]
fn test_save_and_load_config() {
    let (_temp_dir, config_path) = create_test_config_dir();
    let manager = ConfigManager::new(&config_path).unwrap();

    // Load defaults, modify, save
    let mut config = manager.load().unwrap();
    config.timing.hold_ms = 3000;
    config.timing.fallback_margin_ms = 500;
    config.slide_count = 10;
    config.debug_mode = true;
    manager.save(&config).unwrap();

    // Load it again
    let loaded = manager.load().unwrap();

    assert_eq!(loaded.timing.hold_ms, 3000);
    assert_eq!(loaded.timing.fallback_margin_ms, 500);
    assert_eq!(loaded.slide_count, 10);
    assert!(loaded.debug_mode);
    // Untouched options survive the roundtrip at their defaults
    assert_eq!(loaded.timing.fade_ms, 900);
    assert_eq!(loaded.image_dir, "media1");
}

#[test]
fn test_hand_written_config_uses_recognized_keys() {
    let (_temp_dir, config_path) = create_test_config_dir();
    let manager = ConfigManager::new(&config_path).unwrap();

    // A file written by hand with the documented camelCase option names
    let content = r#"
timing:
  holdDurationMs: 2500
  fadeDurationMs: 600
imageDir: "photos"
slideCount: 4
fallbackSources:
  - "photos/one.jpg"
  - "photos/two.jpg"
"#;
    fs::write(manager.config_path(), content).unwrap();

    let config = manager.load().unwrap();

    assert_eq!(config.timing.hold_ms, 2500);
    assert_eq!(config.timing.fade_ms, 600);
    assert_eq!(config.image_dir, "photos");
    assert_eq!(config.slide_count, 4);
    assert_eq!(
        config.fallback_sources,
        vec!["photos/one.jpg", "photos/two.jpg"]
    );
    // Unspecified timing options keep their defaults
    assert_eq!(config.timing.teardown_ms, 400);
    assert_eq!(config.timing.fallback_margin_ms, 300);
}

#[test]
fn test_config_directory_creation() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = Utf8PathBuf::try_from(temp_dir.path().to_path_buf())
        .unwrap()
        .join("nonexistent_dir");

    // Directory doesn't exist yet
    assert!(!config_path.exists());

    // Creating ConfigManager should create the directory
    let _manager = ConfigManager::new(&config_path).unwrap();

    // Directory should now exist
    assert!(config_path.exists());
}

#[test]
fn test_invalid_yaml_falls_back_to_defaults() {
    let (_temp_dir, config_path) = create_test_config_dir();
    let manager = ConfigManager::new(&config_path).unwrap();

    // Create invalid YAML file
    fs::write(manager.config_path(), "invalid: yaml: content: {{").unwrap();

    // A config file that cannot be parsed must not block the slideshow;
    // the load reports it and hands back the defaults
    let config = manager.load().unwrap();
    assert_eq!(config.timing.hold_ms, 5000);
    assert_eq!(config.slide_count, 6);
}

#[test]
fn test_unrecognized_options_ignored() {
    let (_temp_dir, config_path) = create_test_config_dir();
    let manager = ConfigManager::new(&config_path).unwrap();

    let content = r#"
slideCount: 2
paletteMode: vivid
timing:
  holdDurationMs: 1000
  easingCurve: bounce
"#;
    fs::write(manager.config_path(), content).unwrap();

    let config = manager.load().unwrap();
    assert_eq!(config.slide_count, 2);
    assert_eq!(config.timing.hold_ms, 1000);
}

#[test]
fn test_config_timing_feeds_the_controller() {
    use slidecycle::SlideCycle;
    use slidecycle::surface::{ConsoleHome, ConsoleStage, FileImageLoader};
    use std::sync::Arc;

    let (_temp_dir, config_path) = create_test_config_dir();
    let manager = ConfigManager::new(&config_path).unwrap();

    let mut config = SlideshowConfig::default();
    config.timing.fade_ms = 800;
    config.timing.fallback_margin_ms = 250;
    manager.save(&config).unwrap();

    let loaded = manager.load().unwrap();
    let cycle = SlideCycle::new(
        loaded.timing,
        Arc::new(ConsoleStage::new()),
        Arc::new(ConsoleHome::new()),
        Arc::new(FileImageLoader::new()),
    );

    // The four options travel together into the controller
    let timing = cycle.timing();
    assert_eq!(timing.fade_ms, 800);
    assert_eq!(
        timing.release_deadline(),
        std::time::Duration::from_millis(1050),
        "Release deadline is fade + fallback margin"
    );
    assert_eq!(
        timing.removal_deadline(),
        std::time::Duration::from_millis(650),
        "Removal deadline is teardown + fallback margin"
    );
}

#[test]
fn test_concurrent_config_access() {
    use std::sync::Arc;

    let (_temp_dir, config_path) = create_test_config_dir();
    let manager = Arc::new(ConfigManager::new(&config_path).unwrap());
    manager.save(&SlideshowConfig::default()).unwrap();

    // Spawn multiple threads reading config concurrently
    let mut handles = vec![];

    for _ in 0..10 {
        let manager_clone = manager.clone();
        let handle = std::thread::spawn(move || {
            let config = manager_clone.load().unwrap();
            assert_eq!(config.timing.hold_ms, 5000);
        });
        handles.push(handle);
    }

    // All threads should complete successfully
    for handle in handles {
        handle.join().unwrap();
    }
}
