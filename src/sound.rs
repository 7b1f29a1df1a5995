//! Reminder sounds, played by an external audio player process.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::error::{HydrateError, Result};
use crate::preferences::Preferences;

pub const DEFAULT_PLAYER: &str = "paplay";

pub trait SoundPlayer {
    /// Starts playback and returns without waiting for it to finish.
    fn play(&self, file: &Path) -> Result<()>;
}

/// Picks the file to play: the user's custom sound, else the bundled one.
pub fn reminder_sound(prefs: &Preferences, bundled: &Path) -> PathBuf {
    prefs
        .custom_sound()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| bundled.to_path_buf())
}

/// Runs `<program> <file>` with output discarded.
#[derive(Debug, Clone)]
pub struct CommandPlayer {
    program: String,
}

impl CommandPlayer {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl SoundPlayer for CommandPlayer {
    fn play(&self, file: &Path) -> Result<()> {
        if !file.exists() {
            return Err(HydrateError::Io {
                context: format!("sound file {}", file.display()),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            });
        }

        let mut child = Command::new(&self.program)
            .arg(file)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| HydrateError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        // Reap in the background so finished players don't linger as zombies.
        let program = self.program.clone();
        std::thread::spawn(move || match child.wait() {
            Ok(status) if !status.success() => {
                tracing::warn!(program = %program, %status, "sound player exited unsuccessfully");
            }
            Ok(_) => {}
            Err(e) => tracing::warn!(program = %program, error = %e, "failed to wait for sound player"),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn custom_sound_wins_over_bundled() {
        let prefs = Preferences {
            custom_sound_path: "/home/me/splash.ogg".to_string(),
            ..Preferences::default()
        };
        assert_eq!(
            reminder_sound(&prefs, Path::new("/usr/share/sounds/paani.wav")),
            PathBuf::from("/home/me/splash.ogg")
        );
    }

    #[test]
    fn empty_custom_sound_uses_bundled() {
        assert_eq!(
            reminder_sound(&Preferences::default(), Path::new("/usr/share/sounds/paani.wav")),
            PathBuf::from("/usr/share/sounds/paani.wav")
        );
    }

    #[test]
    fn missing_file_is_reported_without_spawning() {
        let dir = tempdir().unwrap();
        let player = CommandPlayer::new("definitely-not-a-real-player");
        let err = player.play(&dir.path().join("missing.wav")).unwrap_err();
        assert!(matches!(err, HydrateError::Io { .. }));
    }

    #[test]
    fn missing_player_is_a_spawn_error() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("drip.wav");
        std::fs::write(&file, b"RIFF").unwrap();

        let player = CommandPlayer::new("definitely-not-a-real-player");
        let err = player.play(&file).unwrap_err();
        assert!(matches!(err, HydrateError::Spawn { .. }));
    }

    #[test]
    fn player_runs_with_the_file_argument() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("drip.wav");
        std::fs::write(&file, b"RIFF").unwrap();

        assert!(CommandPlayer::new("true").play(&file).is_ok());
    }
}
