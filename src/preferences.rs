//! User preferences and the per-user JSON file that stores them.
//!
//! Reading is forgiving: every field falls back to its default on its own, so a
//! half-broken file still yields the valid half. Writing always replaces the
//! whole file through a temp file + rename.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tempfile::NamedTempFile;

use crate::error::{HydrateError, Result};

pub const DEFAULT_INTERVAL_MINUTES: u32 = 30;
pub const DEFAULT_SOUND_ENABLED: bool = true;

/// Minutes between reminders, always within `MIN..=MAX`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct ReminderInterval(u32);

impl ReminderInterval {
    pub const MIN: u32 = 1;
    pub const MAX: u32 = 240;

    /// Clamps any integer into the valid range.
    pub fn clamped(minutes: i64) -> Self {
        Self(minutes.clamp(i64::from(Self::MIN), i64::from(Self::MAX)) as u32)
    }

    /// Clamps any JSON number, fractional or huge, into the valid range.
    fn from_number(minutes: f64) -> Option<Self> {
        if !minutes.is_finite() {
            return None;
        }
        let minutes = minutes
            .round()
            .clamp(f64::from(Self::MIN), f64::from(Self::MAX));
        Some(Self(minutes as u32))
    }

    pub fn minutes(self) -> u32 {
        self.0
    }

    pub fn duration(self) -> Duration {
        Duration::from_secs(u64::from(self.0) * 60)
    }

    /// Moves by `delta` minutes, saturating at the bounds.
    pub fn step(self, delta: i32) -> Self {
        Self::clamped(i64::from(self.0) + i64::from(delta))
    }
}

impl Default for ReminderInterval {
    fn default() -> Self {
        Self(DEFAULT_INTERVAL_MINUTES)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Preferences {
    #[serde(rename = "interval")]
    pub interval: ReminderInterval,
    #[serde(rename = "sound")]
    pub sound_enabled: bool,
    /// Empty means "use the bundled sound".
    pub custom_sound_path: String,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            interval: ReminderInterval::default(),
            sound_enabled: DEFAULT_SOUND_ENABLED,
            custom_sound_path: String::new(),
        }
    }
}

impl Preferences {
    /// Builds preferences from a parsed JSON object, defaulting field by field.
    fn from_json(value: &Value) -> Self {
        let defaults = Self::default();

        let interval = match value.get("interval") {
            Some(raw) => raw.as_f64().and_then(ReminderInterval::from_number).unwrap_or_else(|| {
                tracing::warn!(value = %raw, "interval is not a number, using default");
                defaults.interval
            }),
            None => defaults.interval,
        };

        let sound_enabled = match value.get("sound") {
            Some(raw) => raw.as_bool().unwrap_or_else(|| {
                tracing::warn!(value = %raw, "sound is not a boolean, using default");
                defaults.sound_enabled
            }),
            None => defaults.sound_enabled,
        };

        let custom_sound_path = match value.get("custom_sound_path") {
            Some(Value::String(path)) => path.clone(),
            Some(Value::Null) | None => defaults.custom_sound_path,
            Some(raw) => {
                tracing::warn!(value = %raw, "custom_sound_path is not a string, using default");
                defaults.custom_sound_path
            }
        };

        Self {
            interval,
            sound_enabled,
            custom_sound_path,
        }
    }

    /// The user's sound file, if one is set.
    pub fn custom_sound(&self) -> Option<&Path> {
        let trimmed = self.custom_sound_path.trim();
        (!trimmed.is_empty()).then(|| Path::new(trimmed))
    }
}

/// Reads and writes [`Preferences`] at a fixed path.
#[derive(Debug, Clone)]
pub struct PreferenceStore {
    path: PathBuf,
}

impl PreferenceStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads preferences, never failing: problems are logged and defaulted.
    pub fn load(&self) -> Preferences {
        match self.read() {
            Ok(Some(prefs)) => prefs,
            Ok(None) => {
                tracing::debug!(path = %self.path.display(), "no preferences file, using defaults");
                Preferences::default()
            }
            Err(e) => {
                tracing::warn!(error = %e, "could not read preferences, using defaults");
                Preferences::default()
            }
        }
    }

    /// Reads the file strictly. `Ok(None)` when it does not exist.
    pub fn read(&self) -> Result<Option<Preferences>> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(HydrateError::io(format!("reading {}", self.path.display()))(e));
            }
        };

        let value: Value =
            serde_json::from_str(&contents).map_err(|e| HydrateError::PreferencesMalformed {
                path: self.path.clone(),
                details: e.to_string(),
            })?;

        if !value.is_object() {
            return Err(HydrateError::PreferencesMalformed {
                path: self.path.clone(),
                details: "top-level value is not an object".to_string(),
            });
        }

        Ok(Some(Preferences::from_json(&value)))
    }

    /// Replaces the file with `prefs`, creating parent directories as needed.
    pub fn save(&self, prefs: &Preferences) -> Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)
            .map_err(HydrateError::io(format!("creating {}", dir.display())))?;

        let mut tmp = NamedTempFile::new_in(dir)
            .map_err(HydrateError::io(format!("creating temp file in {}", dir.display())))?;
        serde_json::to_writer_pretty(&mut tmp, prefs)?;
        tmp.write_all(b"\n")
            .and_then(|()| tmp.flush())
            .map_err(HydrateError::io(format!(
                "writing temp file for {}",
                self.path.display()
            )))?;
        tmp.persist(&self.path).map_err(|e| HydrateError::Io {
            context: format!("persisting {}", self.path.display()),
            source: e.error,
        })?;

        tracing::info!(
            path = %self.path.display(),
            interval = prefs.interval.minutes(),
            sound = prefs.sound_enabled,
            "preferences saved"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn store_with(contents: &str) -> (tempfile::TempDir, PreferenceStore) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("hydrateme.json");
        std::fs::write(&path, contents).unwrap();
        (dir, PreferenceStore::new(path))
    }

    #[test]
    fn missing_file_yields_exact_defaults() {
        let dir = tempdir().unwrap();
        let store = PreferenceStore::new(dir.path().join("absent.json"));
        let prefs = store.load();
        assert_eq!(prefs.interval.minutes(), 30);
        assert!(prefs.sound_enabled);
        assert_eq!(prefs.custom_sound_path, "");
    }

    #[test]
    fn missing_sound_field_defaults_to_enabled_and_keeps_the_rest() {
        let (_dir, store) =
            store_with(r#"{"interval": 45, "custom_sound_path": "/home/me/drip.ogg"}"#);
        let prefs = store.load();
        assert!(prefs.sound_enabled);
        assert_eq!(prefs.interval.minutes(), 45);
        assert_eq!(prefs.custom_sound_path, "/home/me/drip.ogg");
    }

    #[test]
    fn malformed_json_falls_back_to_defaults() {
        let (_dir, store) = store_with("{ interval: 45,");
        assert!(matches!(
            store.read(),
            Err(HydrateError::PreferencesMalformed { .. })
        ));
        assert_eq!(store.load(), Preferences::default());
    }

    #[test]
    fn non_object_json_falls_back_to_defaults() {
        let (_dir, store) = store_with("[1, 2, 3]");
        assert_eq!(store.load(), Preferences::default());
    }

    #[test]
    fn wrongly_typed_fields_default_individually() {
        let (_dir, store) =
            store_with(r#"{"interval": "soon", "sound": false, "custom_sound_path": 7}"#);
        let prefs = store.load();
        assert_eq!(prefs.interval.minutes(), 30);
        assert!(!prefs.sound_enabled);
        assert_eq!(prefs.custom_sound_path, "");
    }

    #[test]
    fn out_of_range_interval_is_clamped() {
        let (_dir, store) = store_with(r#"{"interval": 0}"#);
        assert_eq!(store.load().interval.minutes(), 1);

        let (_dir, store) = store_with(r#"{"interval": 999}"#);
        assert_eq!(store.load().interval.minutes(), 240);

        let (_dir, store) = store_with(r#"{"interval": -15}"#);
        assert_eq!(store.load().interval.minutes(), 1);
    }

    #[test]
    fn non_integer_numbers_are_clamped_not_discarded() {
        let (_dir, store) = store_with(r#"{"interval": 45.0}"#);
        assert_eq!(store.load().interval.minutes(), 45);

        let (_dir, store) = store_with(r#"{"interval": 1e9}"#);
        assert_eq!(store.load().interval.minutes(), 240);

        let (_dir, store) = store_with(r#"{"interval": 18446744073709551615}"#);
        assert_eq!(store.load().interval.minutes(), 240);

        let (_dir, store) = store_with(r#"{"interval": 0.2}"#);
        assert_eq!(store.load().interval.minutes(), 1);
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("hydrateme.json");

        let cases = [
            Preferences::default(),
            Preferences {
                interval: ReminderInterval::clamped(1),
                sound_enabled: false,
                custom_sound_path: "/music/splash.flac".to_string(),
            },
            Preferences {
                interval: ReminderInterval::clamped(240),
                sound_enabled: true,
                custom_sound_path: String::new(),
            },
        ];

        for prefs in cases {
            PreferenceStore::new(&path).save(&prefs).unwrap();
            let fresh = PreferenceStore::new(&path);
            assert_eq!(fresh.load(), prefs);
        }
    }

    #[test]
    fn save_creates_missing_parent_directories() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config").join("hydrateme.json");
        let store = PreferenceStore::new(&path);
        store.save(&Preferences::default()).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn save_overwrites_the_whole_object() {
        let (_dir, store) = store_with(r#"{"interval": 10, "legacy": "value"}"#);
        store.save(&Preferences::default()).unwrap();

        let written: Value =
            serde_json::from_str(&std::fs::read_to_string(store.path()).unwrap()).unwrap();
        assert_eq!(
            written,
            serde_json::json!({"interval": 30, "sound": true, "custom_sound_path": ""})
        );
    }

    #[test]
    fn interval_step_saturates_at_bounds() {
        let low = ReminderInterval::clamped(1);
        assert_eq!(low.step(-1).minutes(), 1);
        assert_eq!(low.step(10).minutes(), 11);

        let high = ReminderInterval::clamped(240);
        assert_eq!(high.step(1).minutes(), 240);
        assert_eq!(high.step(-10).minutes(), 230);
    }

    #[test]
    fn blank_custom_sound_means_default() {
        let mut prefs = Preferences::default();
        assert!(prefs.custom_sound().is_none());
        prefs.custom_sound_path = "   ".to_string();
        assert!(prefs.custom_sound().is_none());
        prefs.custom_sound_path = "/tmp/a.wav".to_string();
        assert_eq!(prefs.custom_sound(), Some(Path::new("/tmp/a.wav")));
    }
}
