//! Application configuration
//!
//! The config types live in pixie-types so the overlay crate and the demo
//! share them. This module adds persistence through confy.

use std::path::{Path, PathBuf};

use pixie_types::PixieConfig;

use super::ConfigError;

pub const APP_NAME: &str = "pixie";
pub const CONFIG_NAME: &str = "config";

/// Extension trait for PixieConfig persistence
pub trait PixieConfigExt: Sized {
    /// Load from the default location, falling back to defaults on error
    fn load() -> Self;
    fn try_load() -> Result<Self, ConfigError>;
    fn save(&self) -> Result<(), ConfigError>;
    fn config_path() -> Result<PathBuf, ConfigError>;
    fn load_from(path: &Path) -> Result<Self, ConfigError>;
    fn store_to(&self, path: &Path) -> Result<(), ConfigError>;
}

impl PixieConfigExt for PixieConfig {
    fn load() -> Self {
        Self::try_load().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Falling back to default configuration");
            Self::default()
        })
    }

    fn try_load() -> Result<Self, ConfigError> {
        Ok(confy::load(APP_NAME, CONFIG_NAME)?)
    }

    fn save(&self) -> Result<(), ConfigError> {
        let path = Self::config_path()?;
        self.store_to(&path)
    }

    fn config_path() -> Result<PathBuf, ConfigError> {
        Ok(confy::get_configuration_file_path(APP_NAME, CONFIG_NAME)?)
    }

    fn load_from(path: &Path) -> Result<Self, ConfigError> {
        Ok(confy::load_path(path)?)
    }

    fn store_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(ConfigError::CreateDir)?;
        }
        confy::store_path(path, self).map_err(ConfigError::Save)?;
        tracing::debug!(path = %path.display(), "Configuration saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::{SystemTime, UNIX_EPOCH};

    use pixie_types::Side;

    use super::*;

    fn scratch_dir(tag: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or_default();
        std::env::temp_dir().join(format!("pixie-{tag}-{}-{nanos}", std::process::id()))
    }

    #[test]
    fn store_then_load_keeps_settings() {
        let dir = scratch_dir("roundtrip");
        let path = dir.join("nested").join("config.toml");

        let mut config = PixieConfig::default();
        config.bubble.auto_hide_ms = 1500;
        config.bubble.preferred_side = Side::Above;
        config.appearance.font_size = 18.0;

        config.store_to(&path).unwrap();
        let loaded = PixieConfig::load_from(&path).unwrap();
        assert_eq!(loaded, config);

        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = scratch_dir("partial");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, "[bubble]\ntyping_interval_ms = 45\n").unwrap();

        let loaded = PixieConfig::load_from(&path).unwrap();
        assert_eq!(loaded.bubble.typing_interval_ms, 45);
        assert_eq!(loaded.bubble.auto_hide_ms, 4000);
        assert_eq!(loaded.appearance, PixieConfig::default().appearance);

        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn garbage_file_is_a_load_error() {
        let dir = scratch_dir("garbage");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, "bubble = [[[").unwrap();

        assert!(matches!(
            PixieConfig::load_from(&path),
            Err(ConfigError::Load(_))
        ));

        let _ = std::fs::remove_dir_all(dir);
    }
}
