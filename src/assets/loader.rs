//! Asset path resolution and text loading

use std::fmt;
use std::path::{Path, PathBuf};

/// Environment variable overriding the asset base directory.
pub const ASSET_DIR_ENV: &str = "ASSET_DIR";

/// Base directory used when nothing else is configured.
pub const DEFAULT_ASSET_DIR: &str = "assets";

/// Resolves asset-relative paths against a base directory.
///
/// The loader is a plain value: each component that needs file access gets
/// its own copy, so tests can point different loaders at different
/// directories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetLoader {
    base_dir: PathBuf,
}

impl AssetLoader {
    /// Create a loader rooted at `base_dir`
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Create a loader from `ASSET_DIR`, falling back to `default_dir`.
    ///
    /// The environment is read once, here.
    pub fn from_env_or(default_dir: impl Into<PathBuf>) -> Self {
        match std::env::var_os(ASSET_DIR_ENV) {
            Some(dir) if !dir.is_empty() => Self::new(dir),
            _ => Self::new(default_dir),
        }
    }

    /// Create a loader from `ASSET_DIR`, falling back to `"assets"`
    pub fn from_env() -> Self {
        Self::from_env_or(DEFAULT_ASSET_DIR)
    }

    /// The configured base directory
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Replace the base directory
    pub fn set_base_dir(&mut self, base_dir: impl Into<PathBuf>) {
        self.base_dir = base_dir.into();
    }

    /// Resolve a path relative to the base directory.
    ///
    /// An empty base directory leaves the path untouched.
    pub fn resolve(&self, relative: impl AsRef<Path>) -> PathBuf {
        if self.base_dir.as_os_str().is_empty() {
            return relative.as_ref().to_path_buf();
        }
        self.base_dir.join(relative)
    }

    /// Read a UTF-8 text asset.
    ///
    /// # Errors
    ///
    /// Returns [`AssetError::NotFound`] if the resolved file does not exist
    /// and [`AssetError::Io`] for any other read failure.
    pub fn read_text(&self, relative: impl AsRef<Path>) -> Result<String, AssetError> {
        let path = self.resolve(relative);
        std::fs::read_to_string(&path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => AssetError::NotFound(path),
            _ => AssetError::Io {
                path,
                message: e.to_string(),
            },
        })
    }
}

impl Default for AssetLoader {
    fn default() -> Self {
        Self::new(DEFAULT_ASSET_DIR)
    }
}

/// Errors that can occur while reading assets
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetError {
    /// No file at the resolved path
    NotFound(PathBuf),
    /// The file exists but could not be read
    Io {
        /// Resolved path
        path: PathBuf,
        /// Underlying error message
        message: String,
    },
}

impl fmt::Display for AssetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound(path) => write!(f, "asset not found: {}", path.display()),
            Self::Io { path, message } => {
                write!(f, "could not read {}: {message}", path.display())
            }
        }
    }
}

impl std::error::Error for AssetError {}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("blackhole-{}-{name}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_resolve_joins_base_dir() {
        let loader = AssetLoader::new("assets");
        assert_eq!(
            loader.resolve("shaders/flat.wgsl"),
            Path::new("assets").join("shaders/flat.wgsl")
        );

        let trailing = AssetLoader::new("assets/");
        assert_eq!(
            trailing.resolve("shaders/flat.wgsl"),
            loader.resolve("shaders/flat.wgsl")
        );
    }

    #[test]
    fn test_empty_base_dir_is_passthrough() {
        let loader = AssetLoader::new("");
        assert_eq!(loader.resolve("a/b.txt"), PathBuf::from("a/b.txt"));
    }

    #[test]
    fn test_read_text() {
        let dir = scratch_dir("read");
        std::fs::write(dir.join("hello.txt"), "hi there").unwrap();

        let loader = AssetLoader::new(&dir);
        assert_eq!(loader.read_text("hello.txt").unwrap(), "hi there");

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let loader = AssetLoader::new(scratch_dir("missing"));

        let err = loader.read_text("nope.wgsl").unwrap_err();
        assert!(matches!(err, AssetError::NotFound(_)));
        assert!(err.to_string().contains("nope.wgsl"));
    }

    #[test]
    fn test_loaders_are_independent() {
        let mut a = AssetLoader::new("first");
        let b = a.clone();
        a.set_base_dir("second");

        assert_eq!(a.base_dir(), Path::new("second"));
        assert_eq!(b.base_dir(), Path::new("first"));
    }
}
