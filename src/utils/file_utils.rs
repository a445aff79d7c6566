//! File system utilities

use anyhow::{anyhow, Result};
use std::fs;
use std::path::Path;

/// Ensure directory exists
pub fn ensure_dir_exists(path: &Path) -> Result<()> {
    if path.exists() {
        if !path.is_dir() {
            return Err(anyhow!("{} exists and is not a directory", path.display()));
        }
        return Ok(());
    }
    fs::create_dir_all(path)
        .map_err(|e| anyhow!("Failed to create directory {}: {}", path.display(), e))
}
