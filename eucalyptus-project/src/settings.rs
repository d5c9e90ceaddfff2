//! Per-package editor settings.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use ron::ser::PrettyConfig;
use serde::{Deserialize, Serialize};

use crate::io::SaveMode;
use crate::manifest::{MANIFEST_FILE_NAME, MarkerPruning, StoreOptions};

pub const SETTINGS_FILE_NAME: &str = "editor_settings.ron";

/// Settings for how a package's documents are maintained.
///
/// # Location
/// This file is `editor_settings.ron` and is located at the package root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorSettings {
    /// Which empty folder markers are dropped when a resource lands in a
    /// folder.
    pub marker_pruning: MarkerPruning,
    /// How documents are written back to disk.
    pub save_mode: SaveMode,
    pub manifest_file: String,
    /// Package subdirectory new scene files are created in.
    pub scenes_dir: String,
    pub date_last_accessed: String,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            marker_pruning: MarkerPruning::default(),
            save_mode: SaveMode::default(),
            manifest_file: MANIFEST_FILE_NAME.to_string(),
            scenes_dir: "Scenes".to_string(),
            date_last_accessed: String::new(),
        }
    }
}

impl EditorSettings {
    pub fn build_path(package_dir: impl AsRef<Path>) -> PathBuf {
        package_dir.as_ref().join(SETTINGS_FILE_NAME)
    }

    pub fn store_options(&self) -> StoreOptions {
        StoreOptions {
            save_mode: self.save_mode,
            marker_pruning: self.marker_pruning,
        }
    }

    /// Writes the settings to the package directory.
    ///
    /// # Parameters
    /// * package_dir - The root **folder** of the package.
    pub fn write_to(&mut self, package_dir: impl AsRef<Path>) -> anyhow::Result<()> {
        self.date_last_accessed = format!("{}", Utc::now().format("%Y-%m-%d %H:%M:%S"));
        let ron_str = ron::ser::to_string_pretty(&self, PrettyConfig::default())
            .map_err(|e| anyhow::anyhow!("RON serialization error: {}", e))?;
        let config_path = Self::build_path(package_dir);
        fs::write(&config_path, ron_str).map_err(|e| anyhow::anyhow!(e.to_string()))?;
        Ok(())
    }

    /// # Parameters
    /// * package_dir - The root **folder** of the package.
    pub fn read_from(package_dir: impl AsRef<Path>) -> anyhow::Result<Self> {
        let ron_str = fs::read_to_string(Self::build_path(package_dir))?;
        let config: EditorSettings = ron::de::from_str(&ron_str)
            .map_err(|e| anyhow::anyhow!("RON deserialization error: {}", e))?;
        Ok(config)
    }

    /// Reads the settings, falling back to defaults.
    ///
    /// A missing file is replaced by the defaults on disk. A malformed file is
    /// left alone and the defaults are used for this session.
    pub fn load_or_default(package_dir: impl AsRef<Path>) -> anyhow::Result<Self> {
        let package_dir = package_dir.as_ref();
        match Self::read_from(package_dir) {
            Ok(settings) => Ok(settings),
            Err(e) => {
                if let Some(io_err) = e.downcast_ref::<std::io::Error>()
                    && io_err.kind() == std::io::ErrorKind::NotFound
                {
                    log::warn!("{} not found, creating default.", SETTINGS_FILE_NAME);
                    let mut default = EditorSettings::default();
                    default.write_to(package_dir)?;
                    return Ok(default);
                }
                log::warn!("Failed to load {}: {}", SETTINGS_FILE_NAME, e);
                Ok(EditorSettings::default())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_settings_are_created() {
        let dir = tempfile::tempdir().unwrap();
        let settings = EditorSettings::load_or_default(dir.path()).unwrap();
        assert_eq!(settings.marker_pruning, MarkerPruning::ImmediateParent);
        assert!(EditorSettings::build_path(dir.path()).exists());
    }

    #[test]
    fn settings_round_trip_through_ron() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = EditorSettings {
            marker_pruning: MarkerPruning::AllAncestors,
            save_mode: SaveMode::Overwrite,
            ..Default::default()
        };
        settings.write_to(dir.path()).unwrap();
        let back = EditorSettings::read_from(dir.path()).unwrap();
        assert_eq!(back, settings);
        assert!(!back.date_last_accessed.is_empty());
    }

    #[test]
    fn malformed_settings_fall_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(EditorSettings::build_path(dir.path()), "(marker_pruning: Sideways").unwrap();
        let settings = EditorSettings::load_or_default(dir.path()).unwrap();
        assert_eq!(settings, EditorSettings::default());
    }

    #[test]
    fn partial_settings_fill_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            EditorSettings::build_path(dir.path()),
            "(marker_pruning: AllAncestors)",
        )
        .unwrap();
        let settings = EditorSettings::read_from(dir.path()).unwrap();
        assert_eq!(settings.marker_pruning, MarkerPruning::AllAncestors);
        assert_eq!(settings.scenes_dir, "Scenes");
    }
}
