//! Asset access
//!
//! Resolves asset-relative paths against a configurable base directory and
//! reads shader sources from disk.

mod loader;

pub use loader::{ASSET_DIR_ENV, AssetError, AssetLoader, DEFAULT_ASSET_DIR};
