use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::sound::DEFAULT_PLAYER;

#[derive(Parser, Debug)]
#[command(name = "hydrateme", version)]
#[command(about = "Tray reminder that nudges you to drink water", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    #[command(flatten)]
    pub global: GlobalArgs,
}

#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Preferences file (default: ~/.config/hydrateme.json)
    #[arg(long, global = true, env = "HYDRATEME_CONFIG", value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Single-instance lock file (default: $TMPDIR/hydrateme.lock)
    #[arg(long, global = true, env = "HYDRATEME_LOCK_FILE", value_name = "PATH")]
    pub lock_file: Option<PathBuf>,

    /// Program used to play reminder sounds
    #[arg(long, global = true, env = "HYDRATEME_PLAYER", default_value = DEFAULT_PLAYER, value_name = "PROGRAM")]
    pub player: String,

    /// Log at debug level
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Start the tray reminder (the default)
    Run(RunArgs),

    /// Edit preferences in the terminal
    Settings,

    /// Ask the running instance to remind you right now
    Remind,

    /// Show whether an instance is running and the effective preferences
    Status,
}

#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct RunArgs {
    /// Stay attached to the terminal instead of detaching
    #[arg(long)]
    pub no_fork: bool,

    /// Open the settings editor shortly after startup
    #[arg(long)]
    pub settings_on_start: bool,
}

impl Cli {
    pub fn command(&self) -> Commands {
        self.command
            .clone()
            .unwrap_or_else(|| Commands::Run(RunArgs::default()))
    }
}
