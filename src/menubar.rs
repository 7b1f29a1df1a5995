//! The tray surface: event loop, menu, water-drop icon, reminder dialog and
//! the settings launcher.
//!
//! Everything that touches [`AppContext`] runs on the event-loop thread.
//! Helper threads (wake reader, dialog) only post [`UserEvent`]s through the
//! loop proxy.

use std::ffi::OsString;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

use chrono::{DateTime, Local};
use rfd::{MessageButtons, MessageDialog, MessageDialogResult, MessageLevel};
use tao::{
    event::{Event, StartCause},
    event_loop::{ControlFlow, EventLoopBuilder, EventLoopProxy},
};
use tray_icon::{
    Icon, TrayIcon, TrayIconBuilder,
    menu::{Menu, MenuEvent, MenuItem, PredefinedMenuItem},
};

use crate::app::{AppContext, AppEvent, Flow};
use crate::error::{HydrateError, Result};
use crate::instance::SingleInstanceGuard;
use crate::lock_state::ScreenSaverOracle;
use crate::notification::{APP_TITLE, DesktopNotifier};
use crate::paths::{self, Paths};
use crate::preferences::PreferenceStore;
use crate::presenter::{ReminderModal, ReminderPresenter, ReminderState};
use crate::scheduler::ReminderScheduler;
use crate::sound::CommandPlayer;
use crate::wake::WakeReceiver;

const MENU_SETTINGS: &str = "settings";
const MENU_QUIT: &str = "quit";

const DIALOG_MESSAGE: &str = "💧 Time to Drink Water! 💧";
const DIALOG_BUTTON: &str = "I drank water";
/// A dialog closed faster than this was never in front of the user.
const DIALOG_MIN_VISIBLE: Duration = Duration::from_secs(1);

/// Upper bound on how long the loop sleeps, so the status line stays fresh.
const REFRESH_PERIOD: Duration = Duration::from_secs(15);
const SETTINGS_ON_START_DELAY: Duration = Duration::from_millis(100);

const ICON_SIZE: u32 = 22;
const ICON_LEVELS: u8 = 16;

#[derive(Debug)]
enum UserEvent {
    Menu(MenuEvent),
    App(AppEvent),
}

pub struct TrayOptions {
    pub paths: Paths,
    pub player: String,
    pub settings_on_start: bool,
}

/// Runs the tray until Quit. Holding `guard` for the loop's lifetime keeps the
/// single-instance lock.
pub fn run(options: TrayOptions, wake: WakeReceiver, guard: SingleInstanceGuard) -> Result<()> {
    let event_loop = EventLoopBuilder::<UserEvent>::with_user_event().build();

    let proxy = event_loop.create_proxy();
    MenuEvent::set_event_handler(Some(move |event| {
        let _ = proxy.send_event(UserEvent::Menu(event));
    }));

    spawn_wake_reader(wake, event_loop.create_proxy())?;

    if options.settings_on_start {
        let proxy = event_loop.create_proxy();
        std::thread::spawn(move || {
            std::thread::sleep(SETTINGS_ON_START_DELAY);
            let _ = proxy.send_event(UserEvent::App(AppEvent::SettingsRequested));
        });
    }

    let presenter = ReminderPresenter::new(
        Box::new(ScreenSaverOracle::new()),
        Box::new(DesktopNotifier::new()),
        Box::new(CommandPlayer::new(options.player.clone())),
        Box::new(DialogModal {
            proxy: event_loop.create_proxy(),
        }),
        paths::default_sound(),
    );
    let mut ctx = AppContext::new(
        PreferenceStore::new(options.paths.config_file.clone()),
        presenter,
    );
    let mut launcher = SettingsLauncher::new(current_exe(), &options.paths);
    let mut surface = TraySurface::new()?;

    tracing::info!(pid = guard.pid(), lock = %guard.path().display(), "tray started");
    let mut guard = Some(guard);

    event_loop.run(move |event, _, control_flow| {
        match event {
            Event::NewEvents(StartCause::Init) => {
                if let Err(e) = surface.show() {
                    tracing::error!(error = %e, "failed to create tray icon");
                    *control_flow = ControlFlow::ExitWithCode(1);
                    return;
                }
                ctx.start(Instant::now());
            }

            Event::UserEvent(UserEvent::Menu(event)) => {
                let app_event = match event.id.0.as_str() {
                    MENU_SETTINGS => AppEvent::SettingsRequested,
                    MENU_QUIT => AppEvent::QuitRequested,
                    _ => return,
                };
                dispatch(&mut ctx, &mut launcher, app_event, control_flow);
            }

            Event::UserEvent(UserEvent::App(app_event)) => {
                dispatch(&mut ctx, &mut launcher, app_event, control_flow);
            }

            Event::MainEventsCleared => {
                if matches!(*control_flow, ControlFlow::ExitWithCode(_)) {
                    return;
                }
                let now = Instant::now();
                ctx.tick(now);
                launcher.reap();
                surface.refresh(&ctx, now);

                let wake_at = ctx
                    .next_deadline()
                    .map_or(now + REFRESH_PERIOD, |deadline| deadline.min(now + REFRESH_PERIOD));
                *control_flow = ControlFlow::WaitUntil(wake_at);
            }

            Event::LoopDestroyed => {
                surface.hide();
                if let Some(guard) = guard.take() {
                    tracing::info!(lock = %guard.path().display(), "releasing instance lock");
                }
            }

            _ => {}
        }
    });
}

fn dispatch(
    ctx: &mut AppContext,
    launcher: &mut SettingsLauncher,
    event: AppEvent,
    control_flow: &mut ControlFlow,
) {
    match ctx.handle(event, Instant::now()) {
        Flow::Continue => {}
        Flow::OpenSettings => {
            if let Err(e) = launcher.open() {
                tracing::error!(error = %e, "failed to open settings editor");
            }
        }
        Flow::Quit => *control_flow = ControlFlow::ExitWithCode(0),
    }
}

fn current_exe() -> PathBuf {
    std::env::current_exe().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "cannot resolve own executable, relying on PATH");
        PathBuf::from(paths::APP_NAME)
    })
}

/// Forwards wake-channel signals into the event loop until the loop goes away.
fn spawn_wake_reader(mut wake: WakeReceiver, proxy: EventLoopProxy<UserEvent>) -> Result<()> {
    std::thread::Builder::new()
        .name("wake-reader".into())
        .spawn(move || {
            loop {
                match wake.wait_readable(None) {
                    Ok(true) => {}
                    Ok(false) => continue,
                    Err(e) => {
                        tracing::error!(error = %e, "wake channel failed");
                        return;
                    }
                }
                let signals = match wake.drain() {
                    Ok(signals) => signals,
                    Err(e) => {
                        tracing::error!(error = %e, "failed to read wake channel");
                        return;
                    }
                };
                for signal in signals {
                    tracing::info!(?signal, "woken by signal");
                    if proxy.send_event(UserEvent::App(signal.into())).is_err() {
                        return;
                    }
                }
            }
        })
        .map_err(HydrateError::io("spawning wake reader"))?;
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Reminder dialog
// ─────────────────────────────────────────────────────────────────────────────

/// Shows the reminder as a native message box on its own thread, so the loop
/// keeps running (and the repeat sound keeps playing) while it is up.
struct DialogModal {
    proxy: EventLoopProxy<UserEvent>,
}

impl ReminderModal for DialogModal {
    fn open(&mut self) -> Result<()> {
        let proxy = self.proxy.clone();
        std::thread::Builder::new()
            .name("reminder-dialog".into())
            .spawn(move || {
                let shown_at = Instant::now();
                let result = MessageDialog::new()
                    .set_level(MessageLevel::Info)
                    .set_title(APP_TITLE)
                    .set_description(DIALOG_MESSAGE)
                    .set_buttons(MessageButtons::OkCustom(DIALOG_BUTTON.to_string()))
                    .show();
                let event = dialog_outcome(&result, shown_at.elapsed());
                tracing::debug!(?event, "reminder dialog closed");
                let _ = proxy.send_event(UserEvent::App(event));
            })
            .map_err(HydrateError::io("spawning reminder dialog"))?;
        Ok(())
    }
}

/// Maps how the dialog closed onto an event. The button is an acknowledgment.
/// So is any other close after the dialog was up for a while, since the user
/// saw it. A non-button result that comes back at once means no dialog was
/// ever shown.
fn dialog_outcome(result: &MessageDialogResult, shown_for: Duration) -> AppEvent {
    match result {
        MessageDialogResult::Ok | MessageDialogResult::Yes => AppEvent::AckReceived,
        MessageDialogResult::Custom(label) if label == DIALOG_BUTTON => AppEvent::AckReceived,
        _ if shown_for < DIALOG_MIN_VISIBLE => AppEvent::ModalUnavailable,
        _ => AppEvent::AckReceived,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Settings launcher
// ─────────────────────────────────────────────────────────────────────────────

/// A terminal emulator and the flag that precedes the command it should run.
#[derive(Debug, Clone, PartialEq, Eq)]
struct TerminalCommand {
    program: String,
    exec_flag: Option<&'static str>,
}

impl TerminalCommand {
    fn new(program: impl Into<String>, exec_flag: Option<&'static str>) -> Self {
        Self {
            program: program.into(),
            exec_flag,
        }
    }
}

/// Terminals to try, the user's `$TERMINAL` first.
fn terminal_candidates(preferred: Option<String>) -> Vec<TerminalCommand> {
    let mut candidates = Vec::new();
    if let Some(program) = preferred.filter(|p| !p.trim().is_empty()) {
        candidates.push(TerminalCommand::new(program.trim(), Some("-e")));
    }
    candidates.extend([
        TerminalCommand::new("x-terminal-emulator", Some("-e")),
        TerminalCommand::new("gnome-terminal", Some("--")),
        TerminalCommand::new("konsole", Some("-e")),
        TerminalCommand::new("xfce4-terminal", Some("-x")),
        TerminalCommand::new("kitty", None),
        TerminalCommand::new("alacritty", Some("-e")),
        TerminalCommand::new("xterm", Some("-e")),
    ]);
    candidates
}

/// Opens `hydrateme settings` in a terminal, at most one at a time.
struct SettingsLauncher {
    exe: PathBuf,
    args: Vec<OsString>,
    child: Option<Child>,
}

impl SettingsLauncher {
    fn new(exe: PathBuf, paths: &Paths) -> Self {
        let args = vec![
            OsString::from("settings"),
            OsString::from("--config"),
            paths.config_file.clone().into_os_string(),
            OsString::from("--lock-file"),
            paths.lock_file.clone().into_os_string(),
        ];
        Self {
            exe,
            args,
            child: None,
        }
    }

    fn open(&mut self) -> Result<()> {
        self.reap();
        if self.child.is_some() {
            tracing::info!("settings editor already open");
            return Ok(());
        }

        for terminal in terminal_candidates(std::env::var("TERMINAL").ok()) {
            let mut command = Command::new(&terminal.program);
            if let Some(flag) = terminal.exec_flag {
                command.arg(flag);
            }
            command
                .arg(&self.exe)
                .args(&self.args)
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::null());

            match command.spawn() {
                Ok(child) => {
                    tracing::info!(terminal = %terminal.program, pid = child.id(), "settings editor launched");
                    self.child = Some(child);
                    return Ok(());
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    tracing::debug!(terminal = %terminal.program, "terminal not installed");
                }
                Err(source) => {
                    return Err(HydrateError::Spawn {
                        program: terminal.program,
                        source,
                    });
                }
            }
        }
        Err(HydrateError::NoTerminal)
    }

    /// Forgets the editor once its terminal has exited.
    fn reap(&mut self) {
        let Some(child) = self.child.as_mut() else {
            return;
        };
        match child.try_wait() {
            Ok(Some(status)) => {
                tracing::debug!(%status, "settings editor closed");
                self.child = None;
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(error = %e, "lost track of settings editor");
                self.child = None;
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tray icon and menu
// ─────────────────────────────────────────────────────────────────────────────

/// What the drop icon currently shows; redrawn only when this changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DropLevel {
    Filling(u8),
    Alert,
}

impl DropLevel {
    fn of(ctx: &AppContext, now: Instant) -> Self {
        if ctx.state() == ReminderState::Presenting {
            return DropLevel::Alert;
        }
        let level = (ctx.progress(now) * f32::from(ICON_LEVELS)).floor();
        DropLevel::Filling(level.clamp(0.0, f32::from(ICON_LEVELS)) as u8)
    }

    fn fill(self) -> f32 {
        match self {
            DropLevel::Filling(level) => f32::from(level) / f32::from(ICON_LEVELS),
            DropLevel::Alert => 1.0,
        }
    }
}

struct TraySurface {
    menu: Menu,
    status_item: MenuItem,
    tray: Option<TrayIcon>,
    shown_level: Option<DropLevel>,
    shown_status: String,
}

impl TraySurface {
    fn new() -> Result<Self> {
        let status_item = MenuItem::with_id("status", "Starting…", false, None);
        let settings_item = MenuItem::with_id(MENU_SETTINGS, "Settings", true, None);
        let quit_item = MenuItem::with_id(MENU_QUIT, "Quit", true, None);

        let menu = Menu::new();
        menu.append_items(&[
            &status_item,
            &PredefinedMenuItem::separator(),
            &settings_item,
            &PredefinedMenuItem::separator(),
            &quit_item,
        ])?;

        Ok(Self {
            menu,
            status_item,
            tray: None,
            shown_level: None,
            shown_status: String::new(),
        })
    }

    /// Creates the tray icon. Must run on the event-loop thread after start-up.
    fn show(&mut self) -> Result<()> {
        let level = DropLevel::Filling(0);
        let tray = TrayIconBuilder::new()
            .with_menu(Box::new(self.menu.clone()))
            .with_tooltip(APP_TITLE)
            .with_icon(drop_icon(level)?)
            .build()?;
        self.tray = Some(tray);
        self.shown_level = Some(level);
        Ok(())
    }

    fn hide(&mut self) {
        self.tray.take();
    }

    fn refresh(&mut self, ctx: &AppContext, now: Instant) {
        let Some(tray) = &self.tray else {
            return;
        };

        let level = DropLevel::of(ctx, now);
        if self.shown_level != Some(level) {
            match drop_icon(level) {
                Ok(icon) => {
                    if let Err(e) = tray.set_icon(Some(icon)) {
                        tracing::warn!(error = %e, "failed to update tray icon");
                    }
                }
                Err(e) => tracing::warn!(error = %e, "failed to draw tray icon"),
            }
            self.shown_level = Some(level);
        }

        let status = status_text(ctx.state(), ctx.scheduler(), now, Local::now());
        if status != self.shown_status {
            self.status_item.set_text(&status);
            let tooltip = format!("{APP_TITLE} - {status}");
            if let Err(e) = tray.set_tooltip(Some(tooltip)) {
                tracing::debug!(error = %e, "failed to update tooltip");
            }
            self.shown_status = status;
        }
    }
}

/// The disabled first line of the tray menu.
fn status_text(
    state: ReminderState,
    scheduler: &ReminderScheduler,
    now: Instant,
    wall_clock: DateTime<Local>,
) -> String {
    match state {
        ReminderState::Presenting => "Time to drink water!".to_string(),
        ReminderState::Idle => "Reminders paused".to_string(),
        ReminderState::CountingDown => {
            let next = scheduler
                .remaining(now)
                .and_then(|remaining| chrono::Duration::from_std(remaining).ok())
                .map(|remaining| wall_clock + remaining);
            match next {
                Some(at) => format!("Next reminder at {}", at.format("%H:%M")),
                None => "Next reminder soon".to_string(),
            }
        }
    }
}

fn drop_icon(level: DropLevel) -> Result<Icon> {
    let alert = level == DropLevel::Alert;
    Ok(Icon::from_rgba(
        drop_pixels(ICON_SIZE, level.fill(), alert),
        ICON_SIZE,
        ICON_SIZE,
    )?)
}

const WATER: [u8; 4] = [64, 156, 255, 255];
const WATER_ALERT: [u8; 4] = [120, 210, 255, 255];
const EMPTY: [u8; 4] = [140, 140, 140, 110];

/// Draws a water drop (round base, pointed top) filled from the bottom up to
/// `fill` (0.0 – 1.0). Pixels outside the drop are transparent.
fn drop_pixels(size: u32, fill: f32, alert: bool) -> Vec<u8> {
    let mut rgba = vec![0u8; (size * size * 4) as usize];

    let s = size as f32;
    let center_x = s / 2.0;
    let radius = s * 0.32;
    let center_y = s - radius - 1.0;
    let tip_y = 1.0;
    let bottom_y = center_y + radius;
    let water_line = bottom_y - fill.clamp(0.0, 1.0) * (bottom_y - tip_y);
    let water = if alert { WATER_ALERT } else { WATER };

    for y in 0..size {
        for x in 0..size {
            let px = x as f32 + 0.5;
            let py = y as f32 + 0.5;
            let dx = px - center_x;

            let inside = if py >= center_y {
                let dy = py - center_y;
                dx * dx + dy * dy <= radius * radius
            } else if py >= tip_y {
                let half_width = radius * (py - tip_y) / (center_y - tip_y);
                dx.abs() <= half_width
            } else {
                false
            };
            if !inside {
                continue;
            }

            let color = if py >= water_line { water } else { EMPTY };
            let idx = ((y * size + x) * 4) as usize;
            rgba[idx..idx + 4].copy_from_slice(&color);
        }
    }

    rgba
}
