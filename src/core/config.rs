//! Engine configuration
//!
//! Settings can be built in code or loaded from a RON file:
//!
//! ```ron
//! (
//!     title: "BlackHole",
//!     width: 1280,
//!     height: 720,
//!     scene: Raymarch,
//! )
//! ```
//!
//! Missing fields fall back to their defaults.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::assets::AssetLoader;
use crate::renderer::SceneKind;

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Window title
    pub title: String,
    /// Initial window width
    pub width: u32,
    /// Initial window height
    pub height: u32,
    /// Enable VSync
    pub vsync: bool,
    /// Demo geometry to draw
    pub scene: SceneKind,
    /// Asset base directory; `None` reads `ASSET_DIR`, then `"assets"`
    pub asset_dir: Option<PathBuf>,
    /// Grab and hide the cursor while running, feeding mouse look
    pub capture_mouse: bool,
    /// Speed multiplier while Shift is held
    pub boost_multiplier: f32,
    /// Framebuffer clear color (RGBA)
    pub clear_color: [f64; 4],
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            title: String::from("BlackHole"),
            width: 800,
            height: 600,
            vsync: true,
            scene: SceneKind::default(),
            asset_dir: None,
            capture_mouse: true,
            boost_multiplier: 2.5,
            clear_color: [0.1, 0.12, 0.2, 1.0],
        }
    }
}

impl EngineConfig {
    /// Set the window title
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Set window dimensions
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Enable or disable VSync
    pub fn with_vsync(mut self, vsync: bool) -> Self {
        self.vsync = vsync;
        self
    }

    /// Select the demo geometry
    pub fn with_scene(mut self, scene: SceneKind) -> Self {
        self.scene = scene;
        self
    }

    /// Use a fixed asset directory instead of `ASSET_DIR`
    pub fn with_asset_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.asset_dir = Some(dir.into());
        self
    }

    /// Enable or disable mouse capture
    pub fn with_capture_mouse(mut self, capture: bool) -> Self {
        self.capture_mouse = capture;
        self
    }

    /// Set the Shift speed multiplier
    pub fn with_boost_multiplier(mut self, multiplier: f32) -> Self {
        self.boost_multiplier = multiplier;
        self
    }

    /// Build the asset loader this configuration describes
    pub fn asset_loader(&self) -> AssetLoader {
        match &self.asset_dir {
            Some(dir) => AssetLoader::new(dir),
            None => AssetLoader::from_env(),
        }
    }

    /// Parse a configuration from RON text
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a valid configuration
    pub fn from_ron_str(text: &str) -> Result<Self, ConfigError> {
        ron::from_str(text).map_err(|e| ConfigError::Deserialize(e.to_string()))
    }

    /// Load a configuration from a RON file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;
        Self::from_ron_str(&content)
    }

    /// Save the configuration to a RON file
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let text = ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| ConfigError::Serialize(e.to_string()))?;
        fs::write(path, text).map_err(|e| ConfigError::Io(e.to_string()))
    }
}

/// Errors that can occur while loading or saving a configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// File IO error
    Io(String),
    /// Serialization error
    Serialize(String),
    /// Deserialization error
    Deserialize(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "config IO error: {e}"),
            Self::Serialize(e) => write!(f, "config serialization error: {e}"),
            Self::Deserialize(e) => write!(f, "config parse error: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let config = EngineConfig::default()
            .with_title("Test")
            .with_size(1024, 768)
            .with_vsync(false)
            .with_scene(SceneKind::Raymarch)
            .with_asset_dir("data")
            .with_capture_mouse(false)
            .with_boost_multiplier(4.0);

        assert_eq!(config.title, "Test");
        assert_eq!((config.width, config.height), (1024, 768));
        assert!(!config.vsync);
        assert_eq!(config.scene, SceneKind::Raymarch);
        assert_eq!(config.asset_loader().base_dir(), Path::new("data"));
        assert!(!config.capture_mouse);
        assert_eq!(config.boost_multiplier, 4.0);
    }

    #[test]
    fn test_partial_ron_uses_defaults() {
        let config = EngineConfig::from_ron_str("(title: \"Disk\", scene: Triangle)").unwrap();

        assert_eq!(config.title, "Disk");
        assert_eq!(config.scene, SceneKind::Triangle);
        assert_eq!(config.width, 800);
        assert_eq!(config.boost_multiplier, 2.5);
        assert_eq!(config.asset_dir, None);
    }

    #[test]
    fn test_invalid_ron_is_error() {
        let err = EngineConfig::from_ron_str("(width: \"wide\")").unwrap_err();
        assert!(matches!(err, ConfigError::Deserialize(_)));
    }

    #[test]
    fn test_save_and_load() {
        let path = std::env::temp_dir().join(format!("blackhole-{}-config.ron", std::process::id()));
        let config = EngineConfig::default()
            .with_scene(SceneKind::Raymarch)
            .with_asset_dir("somewhere");

        config.save(&path).unwrap();
        let loaded = EngineConfig::load(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(loaded, config);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = EngineConfig::load("/definitely/not/here.ron").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
