//! Single-instance enforcement.
//!
//! One process per user holds an exclusive `flock` on a shared lock file for
//! its whole lifetime; the kernel drops the lock when the process dies, however
//! it dies. The holder writes its PID into the file so a later launch knows
//! whom to poke, but that PID is only a hint: ownership is whoever holds the
//! lock, never whoever wrote last.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::os::fd::AsRawFd;
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};

use crate::error::{HydrateError, Result};
use crate::wake::WakeSignal;

/// Outcome of trying to become the running instance.
#[derive(Debug)]
pub enum Acquisition {
    Acquired(SingleInstanceGuard),
    /// Somebody else holds the lock. `holder` is the PID hint from the file.
    Held { holder: Option<u32> },
}

/// Proof that this process is the running instance. Dropping it (or exiting)
/// releases the lock.
#[derive(Debug)]
pub struct SingleInstanceGuard {
    file: File,
    path: PathBuf,
    pid: u32,
}

impl SingleInstanceGuard {
    /// Tries to take the lock without blocking.
    pub fn acquire(path: &Path) -> Result<Acquisition> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .mode(0o666)
            .open(path)
            .map_err(HydrateError::io(format!("opening lock file {}", path.display())))?;

        // SAFETY: `file` owns a valid descriptor for the duration of the call.
        let rc = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) };
        if rc != 0 {
            let err = std::io::Error::last_os_error();
            if err.raw_os_error() == Some(libc::EWOULDBLOCK) {
                let holder = read_holder_pid(path);
                tracing::debug!(path = %path.display(), ?holder, "instance lock already held");
                return Ok(Acquisition::Held { holder });
            }
            return Err(HydrateError::io(format!("locking {}", path.display()))(err));
        }

        let mut guard = SingleInstanceGuard {
            file,
            path: path.to_path_buf(),
            pid: std::process::id(),
        };
        guard.record_pid()?;
        tracing::info!(path = %path.display(), pid = guard.pid, "acquired instance lock");
        Ok(Acquisition::Acquired(guard))
    }

    /// Rewrites the PID hint with the current process id. Called again after
    /// detaching, since the forked child inherits the lock but not the PID.
    pub fn record_pid(&mut self) -> Result<()> {
        self.pid = std::process::id();
        let context = format!("writing PID to {}", self.path.display());
        self.file
            .set_len(0)
            .and_then(|()| self.file.seek(SeekFrom::Start(0)))
            .and_then(|_| write!(self.file, "{}", self.pid))
            .and_then(|()| self.file.flush())
            .map_err(HydrateError::io(context))
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Reads the PID hint. Anything unusable (missing, garbage, 0, or out of
/// `pid_t` range) is `None`, so it can never reach `kill` as a group target.
pub fn read_holder_pid(path: &Path) -> Option<u32> {
    let mut contents = String::new();
    File::open(path).ok()?.read_to_string(&mut contents).ok()?;
    parse_pid(&contents)
}

fn parse_pid(contents: &str) -> Option<u32> {
    let pid: u32 = contents.trim().parse().ok()?;
    (pid > 0 && i32::try_from(pid).is_ok()).then_some(pid)
}

/// True if a process with this PID exists (it may not be ours after reuse).
pub fn is_pid_alive(pid: u32) -> bool {
    let Ok(pid) = libc::pid_t::try_from(pid) else {
        return false;
    };
    if pid <= 0 {
        return false;
    }
    // SAFETY: signal 0 performs the permission/existence check only.
    let rc = unsafe { libc::kill(pid, 0) };
    rc == 0 || std::io::Error::last_os_error().raw_os_error() == Some(libc::EPERM)
}

/// Delivers `signal` to `pid`. One attempt, no retry.
pub fn signal_process(pid: u32, signal: WakeSignal) -> Result<()> {
    let target = libc::pid_t::try_from(pid)
        .ok()
        .filter(|p| *p > 0)
        .ok_or_else(|| HydrateError::Signal {
            pid,
            source: std::io::Error::from(std::io::ErrorKind::InvalidInput),
        })?;

    // SAFETY: `target` is a positive pid, so this addresses exactly one process.
    let rc = unsafe { libc::kill(target, signal.signo()) };
    if rc != 0 {
        return Err(HydrateError::Signal {
            pid,
            source: std::io::Error::last_os_error(),
        });
    }
    tracing::debug!(pid, ?signal, "signal delivered");
    Ok(())
}

/// True while some process holds the instance lock on `path`.
///
/// Tries a shared, non-blocking `flock` on a fresh descriptor. Getting
/// it means nobody holds the exclusive lock; it is released again when the
/// descriptor closes.
pub fn is_lock_held(path: &Path) -> bool {
    let Ok(file) = File::open(path) else {
        return false;
    };
    // SAFETY: `file` owns a valid descriptor for the duration of the call.
    let rc = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_SH | libc::LOCK_NB) };
    if rc == 0 {
        return false;
    }
    let err = std::io::Error::last_os_error();
    if err.raw_os_error() == Some(libc::EWOULDBLOCK) {
        return true;
    }
    tracing::warn!(error = %err, path = %path.display(), "could not check instance lock");
    false
}

/// The PID of the running instance, if the lock is held and its PID hint
/// names a live process. A hint left behind by a dead instance is ignored,
/// even when the PID has since been reused.
pub fn running_instance(lock_file: &Path) -> Option<u32> {
    if !is_lock_held(lock_file) {
        return None;
    }
    read_holder_pid(lock_file).filter(|pid| is_pid_alive(*pid))
}

/// Finds the running instance through the lock file and sends it `signal`.
/// Returns the PID that was signalled.
pub fn request(lock_file: &Path, signal: WakeSignal) -> Result<u32> {
    let pid = running_instance(lock_file).ok_or(HydrateError::NotRunning)?;
    signal_process(pid, signal)?;
    Ok(pid)
}

/// Second-launch path: poke the holder to show its settings, never failing.
pub fn wake_holder(holder: Option<u32>) {
    match holder {
        Some(pid) => match signal_process(pid, WakeSignal::ShowSettings) {
            Ok(()) => tracing::info!(pid, "asked running instance to open its settings"),
            Err(e) => tracing::warn!(error = %e, "failed to notify running instance"),
        },
        None => tracing::warn!("lock is held but no usable PID was recorded"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn first_acquire_creates_file_and_records_pid() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("hydrateme.lock");

        let Acquisition::Acquired(guard) = SingleInstanceGuard::acquire(&path).unwrap() else {
            panic!("expected to acquire a fresh lock");
        };
        assert_eq!(guard.pid(), std::process::id());
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            std::process::id().to_string()
        );
    }

    #[test]
    fn second_acquire_sees_holder_and_leaves_pid_untouched() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("hydrateme.lock");

        let first = SingleInstanceGuard::acquire(&path).unwrap();
        assert!(matches!(first, Acquisition::Acquired(_)));
        let before = std::fs::read(&path).unwrap();

        match SingleInstanceGuard::acquire(&path).unwrap() {
            Acquisition::Held { holder } => assert_eq!(holder, Some(std::process::id())),
            Acquisition::Acquired(_) => panic!("second acquire must not succeed"),
        }
        assert_eq!(std::fs::read(&path).unwrap(), before);
        drop(first);
    }

    #[test]
    fn lock_is_released_when_guard_drops() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("hydrateme.lock");

        let first = SingleInstanceGuard::acquire(&path).unwrap();
        drop(first);
        assert!(matches!(
            SingleInstanceGuard::acquire(&path).unwrap(),
            Acquisition::Acquired(_)
        ));
    }

    #[test]
    fn stale_pid_in_unlocked_file_is_overwritten() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("hydrateme.lock");
        std::fs::write(&path, "99999999999").unwrap();

        assert!(matches!(
            SingleInstanceGuard::acquire(&path).unwrap(),
            Acquisition::Acquired(_)
        ));
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            std::process::id().to_string()
        );
    }

    #[test]
    fn unusable_pid_hints_are_rejected() {
        assert_eq!(parse_pid("4242\n"), Some(4242));
        assert_eq!(parse_pid(""), None);
        assert_eq!(parse_pid("0"), None);
        assert_eq!(parse_pid("-1"), None);
        assert_eq!(parse_pid("abc"), None);
        assert_eq!(parse_pid("4294967295"), None);
    }

    #[test]
    fn missing_lock_file_has_no_holder() {
        let dir = tempdir().unwrap();
        assert_eq!(read_holder_pid(&dir.path().join("nope.lock")), None);
    }

    #[test]
    fn current_process_is_alive() {
        assert!(is_pid_alive(std::process::id()));
        assert!(!is_pid_alive(0));
    }

    #[test]
    fn held_lock_reports_the_running_instance() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("hydrateme.lock");
        assert!(!is_lock_held(&path));

        let guard = SingleInstanceGuard::acquire(&path).unwrap();
        assert!(is_lock_held(&path));
        assert_eq!(running_instance(&path), Some(std::process::id()));

        drop(guard);
        assert!(!is_lock_held(&path));
        assert_eq!(running_instance(&path), None);
    }

    #[test]
    fn live_pid_in_an_unlocked_file_is_not_signalled() {
        // A crashed instance leaves its PID behind; here it names a live
        // process (this test) that must not receive SIGUSR2.
        let dir = tempdir().unwrap();
        let path = dir.path().join("hydrateme.lock");
        std::fs::write(&path, std::process::id().to_string()).unwrap();

        assert_eq!(running_instance(&path), None);
        assert!(matches!(
            request(&path, WakeSignal::RemindNow),
            Err(HydrateError::NotRunning)
        ));
    }

    #[test]
    fn request_without_instance_reports_not_running() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("hydrateme.lock");
        assert!(matches!(
            request(&path, WakeSignal::RemindNow),
            Err(HydrateError::NotRunning)
        ));
    }
}
