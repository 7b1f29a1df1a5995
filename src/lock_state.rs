//! Is the session screen locked?
//!
//! Asked over the session bus. GNOME's screen saver answers first; the
//! freedesktop name (KDE, Xfce, ...) is the fallback.

use zbus::blocking::{Connection, Proxy};

use crate::error::Result;

pub trait LockStateOracle {
    fn is_locked(&self) -> Result<bool>;
}

/// (bus name, object path, interface)
const SCREEN_SAVERS: [(&str, &str, &str); 2] = [
    (
        "org.gnome.ScreenSaver",
        "/org/gnome/ScreenSaver",
        "org.gnome.ScreenSaver",
    ),
    (
        "org.freedesktop.ScreenSaver",
        "/org/freedesktop/ScreenSaver",
        "org.freedesktop.ScreenSaver",
    ),
];

/// Queries the desktop screen saver's `GetActive` method.
#[derive(Debug, Default)]
pub struct ScreenSaverOracle;

impl ScreenSaverOracle {
    pub fn new() -> Self {
        Self
    }

    fn query(connection: &Connection, service: (&str, &str, &str)) -> Result<bool> {
        let (destination, path, interface) = service;
        let proxy = Proxy::new(connection, destination, path, interface)?;
        let active: bool = proxy.call("GetActive", &())?;
        Ok(active)
    }
}

impl LockStateOracle for ScreenSaverOracle {
    fn is_locked(&self) -> Result<bool> {
        let connection = Connection::session()?;

        let [primary, fallback] = SCREEN_SAVERS;
        let active = match Self::query(&connection, primary) {
            Ok(active) => active,
            Err(e) => {
                tracing::debug!(service = primary.0, error = %e, "screen saver query failed");
                Self::query(&connection, fallback)?
            }
        };
        tracing::debug!(active, "screen saver state");
        Ok(active)
    }
}
