//! Application path management for portable and installed modes.
//!
//! - **Portable mode**: a `.portable` marker file next to the executable
//!   keeps the config and logs in the executable's directory.
//! - **Installed mode** (default): data lives in `%APPDATA%\Display Chime`
//!   (or the platform data directory elsewhere).

use std::path::{Path, PathBuf};
use tracing::debug;

/// Application name used for directories in installed mode
const APP_NAME: &str = "Display Chime";

/// Application paths for config and logs.
#[derive(Debug, Clone)]
pub struct AppPaths {
    /// Path to the configuration file
    pub config: PathBuf,
    /// Path to the logs directory
    pub logs_dir: PathBuf,
    /// Whether running in portable mode (config next to exe)
    pub is_portable: bool,
}

impl AppPaths {
    /// Detect the appropriate paths based on environment.
    ///
    /// Called before logging is initialized, so nothing here is logged.
    pub fn detect() -> Self {
        let exe_dir = std::env::current_exe()
            .ok()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
            .unwrap_or_else(|| PathBuf::from("."));

        Self::resolve(&exe_dir, dirs::data_dir())
    }

    fn resolve(exe_dir: &Path, data_dir: Option<PathBuf>) -> Self {
        if exe_dir.join(".portable").exists() {
            return Self::rooted_at(exe_dir, true);
        }

        // Installed mode, falling back to the exe dir without a data dir
        let app_data = data_dir
            .unwrap_or_else(|| exe_dir.to_path_buf())
            .join(APP_NAME);
        Self::rooted_at(&app_data, false)
    }

    fn rooted_at(base: &Path, is_portable: bool) -> Self {
        Self {
            config: base.join("config.yaml"),
            logs_dir: base.join("logs"),
            is_portable,
        }
    }

    /// Get the base directory (for displaying in logs)
    pub fn base_dir(&self) -> PathBuf {
        self.config
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// Ensure a logs directory exists, returning it.
    pub fn ensure_logs_dir(dir: &Path) -> anyhow::Result<&Path> {
        if !dir.exists() {
            debug!("Creating logs directory: {}", dir.display());
            std::fs::create_dir_all(dir)?;
        }
        Ok(dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_installed_mode_uses_data_dir() {
        let exe_dir = TempDir::new().unwrap();
        let data_dir = TempDir::new().unwrap();

        let paths = AppPaths::resolve(exe_dir.path(), Some(data_dir.path().to_path_buf()));

        assert!(!paths.is_portable);
        assert_eq!(paths.config, data_dir.path().join(APP_NAME).join("config.yaml"));
        assert_eq!(paths.logs_dir, data_dir.path().join(APP_NAME).join("logs"));
        assert_eq!(paths.base_dir(), data_dir.path().join(APP_NAME));
    }

    #[test]
    fn test_portable_marker_keeps_files_next_to_exe() {
        let exe_dir = TempDir::new().unwrap();
        std::fs::write(exe_dir.path().join(".portable"), "").unwrap();

        let paths = AppPaths::resolve(exe_dir.path(), None);

        assert!(paths.is_portable);
        assert_eq!(paths.config, exe_dir.path().join("config.yaml"));
    }

    #[test]
    fn test_ensure_logs_dir_creates_missing_directories() {
        let root = TempDir::new().unwrap();
        let logs = root.path().join("a").join("logs");

        AppPaths::ensure_logs_dir(&logs).unwrap();

        assert!(logs.is_dir());
    }
}
