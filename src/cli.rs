use clap::{Args, Parser, Subcommand, ValueEnum};

/// Shell types for completion generation
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
    Powershell,
}

#[derive(Parser)]
#[command(name = "taqwa")]
#[command(author, version, about = "Prayer times, countdowns and prayer alerts", long_about = None)]
#[command(after_help = r#"Examples:
  taqwa times                                   Today's prayer times
  taqwa next --watch                            Live countdown to the next prayer
  taqwa location --refresh                      Look up your location again
  taqwa location set --city Cairo --country Egypt
  taqwa notify set --enabled true --minutes-before 15
  taqwa daemon                                  Deliver prayer alerts

Quick Start:
  1. taqwa location
  2. taqwa notify permission
  3. taqwa notify set --enabled true
  4. taqwa daemon
"#)]
pub struct Cli {
    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show (or look up) the current location
    #[command(after_help = r#"Examples:
  taqwa location                     Cached location if under an hour old
  taqwa location --refresh           Ask for a new position now
  taqwa location --refresh --strict  Fail instead of falling back
  taqwa location set --lat 21.42 --lon 39.82
  taqwa location search medina --pick 1
  taqwa location clear
"#)]
    Location(LocationArgs),

    /// Show today's prayer times
    Times {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the next prayer and the time remaining
    Next {
        /// Keep the countdown updating every second
        #[arg(long)]
        watch: bool,

        /// Output as JSON
        #[arg(long, conflicts_with = "watch")]
        json: bool,
    },

    /// Manage prayer notifications
    #[command(subcommand)]
    Notify(NotifyCommands),

    /// Run in the foreground and deliver prayer alerts
    Daemon,

    /// Show configuration
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: CompletionShell,
    },
}

#[derive(Args)]
#[command(args_conflicts_with_subcommands = true)]
pub struct LocationArgs {
    #[command(subcommand)]
    pub command: Option<LocationCommands>,

    /// Ignore the cached location
    #[arg(long)]
    pub refresh: bool,

    /// With --refresh: report lookup errors instead of falling back
    #[arg(long, requires = "refresh")]
    pub strict: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Subcommand)]
pub enum LocationCommands {
    /// Set the location by hand
    Set {
        #[arg(long, requires = "country", conflicts_with_all = ["lat", "lon"])]
        city: Option<String>,

        #[arg(long, requires = "city")]
        country: Option<String>,

        #[arg(long, requires = "lon", allow_negative_numbers = true)]
        lat: Option<f64>,

        #[arg(long, requires = "lat", allow_negative_numbers = true)]
        lon: Option<f64>,
    },

    /// Find a place by name, optionally picking one as the location
    #[command(after_help = r#"Examples:
  taqwa location search cairo            List matching places
  taqwa location search cairo --pick 1   Use the first match
"#)]
    Search {
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,

        /// Set the Nth result (1-based) as the location
        #[arg(long, value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
        pick: Option<usize>,

        /// Output as JSON
        #[arg(long, conflicts_with = "pick")]
        json: bool,
    },

    /// Forget the cached location
    Clear,
}

#[derive(Subcommand)]
pub enum NotifyCommands {
    /// Show notification settings
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Change notification settings
    #[command(after_help = r#"Examples:
  taqwa notify set --enabled true
  taqwa notify set --before false --at-time true
  taqwa notify set --minutes-before 15 --adhan true
"#)]
    Set {
        /// Turn all prayer alerts on or off
        #[arg(long)]
        enabled: Option<bool>,

        /// Alert ahead of each prayer
        #[arg(long)]
        before: Option<bool>,

        /// Alert at the prayer time
        #[arg(long)]
        at_time: Option<bool>,

        /// How far ahead the early alert fires
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..=120))]
        minutes_before: Option<u32>,

        /// Play the adhan at prayer time (needs adhan_command in config)
        #[arg(long)]
        adhan: Option<bool>,
    },

    /// Turn alerts for one prayer on or off
    Toggle {
        /// Fajr, Dhuhr, Asr, Maghrib or Isha
        prayer: String,
    },

    /// Ask for permission to show notifications
    Permission,

    /// Send a test notification
    Test,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print the effective configuration
    Show,
    /// Print config and database paths
    Path,
}
