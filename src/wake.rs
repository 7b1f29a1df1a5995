//! Carries OS signals into the event loop.
//!
//! The handler does one thing: `write(2)` the signal number as a single byte
//! into the write end of a non-blocking socket pair. Everything else happens on
//! the receiving side, outside signal context, after the read end turns
//! readable.

use std::io::{ErrorKind, Read};
use std::os::fd::AsRawFd;
use std::os::unix::net::UnixStream;
use std::sync::atomic::{AtomicI32, Ordering};
use std::time::Duration;

use crate::error::{HydrateError, Result};

/// Write end of the socket pair, or -1 when no channel is installed.
static WAKE_FD: AtomicI32 = AtomicI32::new(-1);

/// Requests another process (or the settings editor) can make of the running
/// instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WakeSignal {
    /// SIGUSR1: bring up the settings editor.
    ShowSettings,
    /// SIGHUP: re-read preferences and reapply the interval.
    ReloadPreferences,
    /// SIGUSR2: present a reminder now.
    RemindNow,
}

impl WakeSignal {
    pub const ALL: [WakeSignal; 3] = [
        WakeSignal::ShowSettings,
        WakeSignal::ReloadPreferences,
        WakeSignal::RemindNow,
    ];

    pub fn signo(self) -> libc::c_int {
        match self {
            WakeSignal::ShowSettings => libc::SIGUSR1,
            WakeSignal::ReloadPreferences => libc::SIGHUP,
            WakeSignal::RemindNow => libc::SIGUSR2,
        }
    }

    pub fn from_signo(signo: libc::c_int) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.signo() == signo)
    }
}

extern "C" fn on_signal(signo: libc::c_int) {
    let fd = WAKE_FD.load(Ordering::Relaxed);
    if fd < 0 {
        return;
    }
    let byte = signo as u8;
    // SAFETY: errno access and write(2) are async-signal-safe; `byte` lives on
    // this frame for the duration of the call.
    unsafe {
        let errno = libc::__errno_location();
        let saved = *errno;
        // A full buffer already guarantees a pending wake-up, so the result is ignored.
        let _ = libc::write(fd, (&byte as *const u8).cast(), 1);
        *errno = saved;
    }
}

/// Owns the socket pair and the installed handlers.
#[derive(Debug)]
pub struct WakeChannel {
    writer: UnixStream,
    receiver: Option<WakeReceiver>,
}

impl WakeChannel {
    /// Creates the socket pair and routes every [`WakeSignal`] into it.
    ///
    /// Install before taking the instance lock: once our PID is published, a
    /// SIGUSR1 must never meet the default (terminating) disposition.
    pub fn install() -> Result<Self> {
        let (reader, writer) =
            UnixStream::pair().map_err(HydrateError::io("creating wake socket pair"))?;
        reader
            .set_nonblocking(true)
            .and_then(|()| writer.set_nonblocking(true))
            .map_err(HydrateError::io("making wake sockets non-blocking"))?;

        WAKE_FD.store(writer.as_raw_fd(), Ordering::SeqCst);

        for signal in WakeSignal::ALL {
            install_handler(signal.signo())
                .map_err(HydrateError::io(format!("installing handler for {signal:?}")))?;
        }

        Ok(Self {
            writer,
            receiver: Some(WakeReceiver { reader }),
        })
    }

    /// Hands out the read end. Only the first call returns `Some`.
    pub fn take_receiver(&mut self) -> Option<WakeReceiver> {
        self.receiver.take()
    }
}

impl Drop for WakeChannel {
    fn drop(&mut self) {
        // Handlers stay installed but become no-ops before the fd closes.
        let fd = self.writer.as_raw_fd();
        let _ = WAKE_FD.compare_exchange(fd, -1, Ordering::SeqCst, Ordering::SeqCst);
    }
}

fn install_handler(signo: libc::c_int) -> std::io::Result<()> {
    let handler: extern "C" fn(libc::c_int) = on_signal;
    // SAFETY: the sigaction struct is zero-initialised then filled in; the
    // handler only performs async-signal-safe operations.
    unsafe {
        let mut action: libc::sigaction = std::mem::zeroed();
        action.sa_sigaction = handler as libc::sighandler_t;
        action.sa_flags = libc::SA_RESTART;
        libc::sigemptyset(&mut action.sa_mask);
        if libc::sigaction(signo, &action, std::ptr::null_mut()) != 0 {
            return Err(std::io::Error::last_os_error());
        }
    }
    Ok(())
}

/// Read end of the channel.
#[derive(Debug)]
pub struct WakeReceiver {
    reader: UnixStream,
}

impl WakeReceiver {
    /// Blocks until the socket is readable or `timeout` elapses.
    pub fn wait_readable(&self, timeout: Option<Duration>) -> std::io::Result<bool> {
        let timeout_ms = timeout
            .map(|t| libc::c_int::try_from(t.as_millis()).unwrap_or(libc::c_int::MAX))
            .unwrap_or(-1);
        let mut fds = libc::pollfd {
            fd: self.reader.as_raw_fd(),
            events: libc::POLLIN,
            revents: 0,
        };
        loop {
            // SAFETY: `fds` is a valid, exclusively borrowed pollfd array of length 1.
            let rc = unsafe { libc::poll(&mut fds, 1, timeout_ms) };
            if rc >= 0 {
                return Ok(rc > 0);
            }
            let err = std::io::Error::last_os_error();
            if err.kind() != ErrorKind::Interrupted {
                return Err(err);
            }
        }
    }

    /// Reads everything pending. Repeats within one burst collapse into one
    /// entry; first-arrival order is kept. Unknown bytes are dropped.
    pub fn drain(&mut self) -> std::io::Result<Vec<WakeSignal>> {
        let mut signals = Vec::new();
        let mut buf = [0u8; 64];
        loop {
            match self.reader.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => {
                    for signal in buf[..n]
                        .iter()
                        .filter_map(|b| WakeSignal::from_signo(libc::c_int::from(*b)))
                    {
                        if !signals.contains(&signal) {
                            signals.push(signal);
                        }
                    }
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(signals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signal_numbers_map_back() {
        for signal in WakeSignal::ALL {
            assert_eq!(WakeSignal::from_signo(signal.signo()), Some(signal));
        }
        assert_eq!(WakeSignal::from_signo(libc::SIGTERM), None);
    }

    #[test]
    fn raised_signals_arrive_on_the_channel() {
        let mut channel = WakeChannel::install().unwrap();
        let mut receiver = channel.take_receiver().unwrap();
        assert!(channel.take_receiver().is_none());

        assert!(!receiver.wait_readable(Some(Duration::ZERO)).unwrap());

        // SAFETY: handlers for these signals were installed above.
        unsafe {
            libc::raise(libc::SIGUSR1);
            libc::raise(libc::SIGUSR1);
            libc::raise(libc::SIGUSR2);
        }

        assert!(receiver.wait_readable(Some(Duration::from_secs(1))).unwrap());
        assert_eq!(
            receiver.drain().unwrap(),
            vec![WakeSignal::ShowSettings, WakeSignal::RemindNow]
        );
        assert!(receiver.drain().unwrap().is_empty());
    }
}
