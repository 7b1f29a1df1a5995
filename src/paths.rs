//! Where hydrateme keeps its files.
//!
//! - preferences: `$XDG_CONFIG_HOME/hydrateme.json`
//! - instance lock: `$TMPDIR/hydrateme.lock`
//! - logs: `$XDG_STATE_HOME/hydrateme/` (cache dir, then temp dir, as fallbacks)
//! - bundled sound: `/usr/share/sounds/paani.wav`, relocated under `$SNAP`

use std::path::{Path, PathBuf};

use crate::error::{HydrateError, Result};

pub const APP_NAME: &str = "hydrateme";
pub const CONFIG_FILE_NAME: &str = "hydrateme.json";
pub const LOCK_FILE_NAME: &str = "hydrateme.lock";
pub const DEFAULT_SOUND: &str = "/usr/share/sounds/paani.wav";

/// Resolved locations for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paths {
    pub config_file: PathBuf,
    pub lock_file: PathBuf,
    pub log_dir: PathBuf,
}

impl Paths {
    /// Resolves every path, letting explicit overrides win over the defaults.
    pub fn resolve(config_file: Option<PathBuf>, lock_file: Option<PathBuf>) -> Result<Self> {
        let config_file = match config_file {
            Some(path) => path,
            None => default_config_file()?,
        };
        Ok(Self {
            config_file,
            lock_file: lock_file.unwrap_or_else(default_lock_file),
            log_dir: default_log_dir(),
        })
    }
}

pub fn default_config_file() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|dir| dir.join(CONFIG_FILE_NAME))
        .ok_or(HydrateError::DirectoryUnavailable("config"))
}

pub fn default_lock_file() -> PathBuf {
    std::env::temp_dir().join(LOCK_FILE_NAME)
}

pub fn default_log_dir() -> PathBuf {
    dirs::state_dir()
        .or_else(dirs::cache_dir)
        .unwrap_or_else(std::env::temp_dir)
        .join(APP_NAME)
}

/// Relocates an absolute `/usr/...` asset path into a snap's mount point.
pub fn asset_path(path: &str) -> PathBuf {
    relocate_asset(std::env::var_os("SNAP").map(PathBuf::from).as_deref(), path)
}

fn relocate_asset(snap_root: Option<&Path>, path: &str) -> PathBuf {
    match snap_root {
        Some(root) if path.starts_with("/usr/") => root.join(path.trim_start_matches('/')),
        _ => PathBuf::from(path),
    }
}

/// The sound played when no custom sound is configured.
pub fn default_sound() -> PathBuf {
    asset_path(DEFAULT_SOUND)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn asset_outside_snap_is_unchanged() {
        assert_eq!(relocate_asset(None, DEFAULT_SOUND), PathBuf::from(DEFAULT_SOUND));
    }

    #[test]
    fn usr_asset_moves_under_snap_root() {
        let relocated = relocate_asset(Some(Path::new("/snap/hydrateme/12")), DEFAULT_SOUND);
        assert_eq!(
            relocated,
            PathBuf::from("/snap/hydrateme/12/usr/share/sounds/paani.wav")
        );
    }

    #[test]
    fn non_usr_asset_ignores_snap_root() {
        let relocated = relocate_asset(Some(Path::new("/snap/hydrateme/12")), "/opt/drip.ogg");
        assert_eq!(relocated, PathBuf::from("/opt/drip.ogg"));
    }

    #[test]
    fn explicit_overrides_win() {
        let paths = Paths::resolve(
            Some(PathBuf::from("/tmp/custom.json")),
            Some(PathBuf::from("/tmp/custom.lock")),
        )
        .unwrap();
        assert_eq!(paths.config_file, PathBuf::from("/tmp/custom.json"));
        assert_eq!(paths.lock_file, PathBuf::from("/tmp/custom.lock"));
    }
}
