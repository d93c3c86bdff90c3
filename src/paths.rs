//! Where the configuration file and logs live.
//!
//! Resolution order:
//!
//! - An explicit `--config` path always wins; logs go next to it.
//! - **Working directory**: a `config.yaml` in the current directory
//!   (typical when developing or running from a checkout).
//! - **Portable mode**: a `.portable` marker file next to the executable
//!   keeps everything in the executable's directory.
//! - **Installed mode** (default): `%APPDATA%\GrassMidi` on Windows,
//!   `~/.local/share/GrassMidi` on Linux.

use std::path::{Path, PathBuf};
use tracing::debug;

/// Application name used for directories in installed mode
const APP_NAME: &str = "GrassMidi";

const CONFIG_FILE: &str = "config.yaml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppPaths {
    /// Path to the configuration file (YAML or JSON by extension)
    pub config: PathBuf,
    /// Directory for rolling log files
    pub logs_dir: PathBuf,
    /// Config and logs share the executable's directory
    pub is_portable: bool,
}

impl AppPaths {
    /// Resolve paths for this process.
    ///
    /// Called before logging is initialized.
    pub fn detect(explicit: Option<PathBuf>) -> Self {
        let exe_dir = std::env::current_exe()
            .ok()
            .and_then(|p| p.parent().map(Path::to_path_buf))
            .unwrap_or_else(|| PathBuf::from("."));
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));

        Self::resolve(explicit, &cwd, &exe_dir, dirs::data_dir())
    }

    fn resolve(
        explicit: Option<PathBuf>,
        cwd: &Path,
        exe_dir: &Path,
        data_dir: Option<PathBuf>,
    ) -> Self {
        if let Some(config) = explicit {
            let base = config
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map(Path::to_path_buf)
                .unwrap_or_else(|| cwd.to_path_buf());
            return Self {
                config,
                logs_dir: base.join("logs"),
                is_portable: true,
            };
        }

        let cwd_config = cwd.join(CONFIG_FILE);
        if cwd_config.exists() {
            return Self {
                config: cwd_config,
                logs_dir: cwd.join("logs"),
                is_portable: true,
            };
        }

        if exe_dir.join(".portable").exists() {
            return Self {
                config: exe_dir.join(CONFIG_FILE),
                logs_dir: exe_dir.join("logs"),
                is_portable: true,
            };
        }

        let app_data = data_dir.unwrap_or_else(|| exe_dir.to_path_buf()).join(APP_NAME);
        Self {
            config: app_data.join(CONFIG_FILE),
            logs_dir: app_data.join("logs"),
            is_portable: false,
        }
    }

    /// Directory holding the config file
    pub fn base_dir(&self) -> PathBuf {
        self.config
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// Create the config and logs directories if missing
    pub fn ensure_directories(&self) -> anyhow::Result<()> {
        for dir in [self.base_dir(), self.logs_dir.clone()] {
            if !dir.exists() {
                debug!("Creating directory: {}", dir.display());
                std::fs::create_dir_all(&dir)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_explicit_config_wins() {
        let cwd = TempDir::new().unwrap();
        std::fs::write(cwd.path().join(CONFIG_FILE), "").unwrap();

        let paths = AppPaths::resolve(
            Some(PathBuf::from("/etc/grass/bindings.json")),
            cwd.path(),
            cwd.path(),
            None,
        );
        assert_eq!(paths.config, PathBuf::from("/etc/grass/bindings.json"));
        assert_eq!(paths.logs_dir, PathBuf::from("/etc/grass/logs"));
    }

    #[test]
    fn test_bare_explicit_name_uses_cwd() {
        let cwd = TempDir::new().unwrap();
        let paths = AppPaths::resolve(Some(PathBuf::from("mine.yaml")), cwd.path(), cwd.path(), None);
        assert_eq!(paths.logs_dir, cwd.path().join("logs"));
    }

    #[test]
    fn test_cwd_config() {
        let cwd = TempDir::new().unwrap();
        let exe = TempDir::new().unwrap();
        std::fs::write(cwd.path().join(CONFIG_FILE), "").unwrap();

        let paths = AppPaths::resolve(None, cwd.path(), exe.path(), None);
        assert_eq!(paths.config, cwd.path().join(CONFIG_FILE));
        assert!(paths.is_portable);
    }

    #[test]
    fn test_portable_marker() {
        let cwd = TempDir::new().unwrap();
        let exe = TempDir::new().unwrap();
        std::fs::write(exe.path().join(".portable"), "").unwrap();

        let paths = AppPaths::resolve(None, cwd.path(), exe.path(), None);
        assert_eq!(paths.config, exe.path().join(CONFIG_FILE));
        assert_eq!(paths.logs_dir, exe.path().join("logs"));
    }

    #[test]
    fn test_installed_mode() {
        let cwd = TempDir::new().unwrap();
        let exe = TempDir::new().unwrap();
        let data = TempDir::new().unwrap();

        let paths = AppPaths::resolve(None, cwd.path(), exe.path(), Some(data.path().to_path_buf()));
        assert_eq!(paths.config, data.path().join("GrassMidi").join(CONFIG_FILE));
        assert!(!paths.is_portable);

        paths.ensure_directories().unwrap();
        assert!(paths.logs_dir.is_dir());
        assert!(paths.base_dir().is_dir());
    }
}
