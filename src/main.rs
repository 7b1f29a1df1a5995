use std::process::ExitCode;

use clap::Parser;

use hydrateme::cli::{Cli, Commands, GlobalArgs, RunArgs};
use hydrateme::error::{HydrateError, Result};
use hydrateme::instance::{self, Acquisition, SingleInstanceGuard};
use hydrateme::menubar::{self, TrayOptions};
use hydrateme::paths::{self, Paths};
use hydrateme::preferences::PreferenceStore;
use hydrateme::wake::{WakeChannel, WakeSignal};
use hydrateme::{logging, tui};

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "hydrateme failed");
            eprintln!("hydrateme: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let global = &cli.global;
    let paths = Paths::resolve(global.config.clone(), global.lock_file.clone())?;

    match cli.command() {
        Commands::Run(args) => run_tray(global, paths, args),
        Commands::Settings => {
            logging::init(&paths.log_dir, global.verbose, false);
            tui::run_settings(&paths).map_err(HydrateError::io("running settings editor"))
        }
        Commands::Remind => {
            logging::init(&paths.log_dir, global.verbose, false);
            let pid = instance::request(&paths.lock_file, WakeSignal::RemindNow)?;
            println!("Asked HydrateMe (pid {pid}) to remind you now");
            Ok(())
        }
        Commands::Status => {
            print_status(&paths);
            Ok(())
        }
    }
}

fn run_tray(global: &GlobalArgs, paths: Paths, args: RunArgs) -> Result<()> {
    logging::init(&paths.log_dir, global.verbose, args.no_fork);

    // Handlers go in before the lock so a SIGUSR1 aimed at our PID never kills us.
    let mut wake = WakeChannel::install()?;

    let mut guard = match SingleInstanceGuard::acquire(&paths.lock_file)? {
        Acquisition::Acquired(guard) => guard,
        Acquisition::Held { holder } => {
            tracing::info!(?holder, "another instance is running");
            instance::wake_holder(holder);
            println!("HydrateMe is already running");
            return Ok(());
        }
    };

    if !args.no_fork {
        daemonize()?;
        guard.record_pid()?;
    }

    let Some(receiver) = wake.take_receiver() else {
        return Err(HydrateError::io("opening wake channel")(std::io::Error::other(
            "read end already taken",
        )));
    };

    menubar::run(
        TrayOptions {
            paths,
            player: global.player.clone(),
            settings_on_start: args.settings_on_start,
        },
        receiver,
        guard,
    )
}

/// Fork and detach from the terminal. The child inherits the locked file
/// description, so the lock survives the parent's exit.
fn daemonize() -> Result<()> {
    // SAFETY: no threads have been started yet, so the child gets a
    // consistent copy of the process.
    unsafe {
        let pid = libc::fork();
        if pid < 0 {
            return Err(HydrateError::io("forking")(std::io::Error::last_os_error()));
        }
        if pid > 0 {
            // Parent process exits immediately
            println!("HydrateMe started (pid: {pid})");
            std::process::exit(0);
        }
        // Create new session to detach from terminal
        libc::setsid();
    }
    Ok(())
}

fn print_status(paths: &Paths) {
    match instance::running_instance(&paths.lock_file) {
        Some(pid) => println!("HydrateMe is running (pid {pid})"),
        None => println!("HydrateMe is not running"),
    }

    let prefs = PreferenceStore::new(paths.config_file.clone()).load();
    println!();
    println!("{:<15} {} minutes", "Interval:", prefs.interval.minutes());
    println!(
        "{:<15} {}",
        "Sound:",
        if prefs.sound_enabled { "on" } else { "off" }
    );
    match prefs.custom_sound() {
        Some(path) => println!("{:<15} {}", "Custom sound:", path.display()),
        None => println!(
            "{:<15} default ({})",
            "Custom sound:",
            paths::default_sound().display()
        ),
    }
    println!();
    println!("{:<15} {}", "Config:", paths.config_file.display());
    println!("{:<15} {}", "Lock file:", paths.lock_file.display());
    println!("{:<15} {}", "Logs:", paths.log_dir.display());
}
