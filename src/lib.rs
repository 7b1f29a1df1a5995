//! HydrateMe: a tray-resident reminder to drink water.
//!
//! One instance per user session owns an advisory lock, counts down the
//! configured interval and then either posts a notification (screen locked) or
//! shows a dialog that repeats a sound until acknowledged.

pub mod app;
pub mod cli;
pub mod error;
pub mod instance;
pub mod lock_state;
pub mod logging;
pub mod menubar;
pub mod notification;
pub mod paths;
pub mod preferences;
pub mod presenter;
pub mod scheduler;
pub mod sound;
pub mod tui;
pub mod wake;
