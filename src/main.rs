//! taqwa - prayer times and prayer alerts for your location

use clap::Parser;
use tracing_subscriber::EnvFilter;

use taqwa::cli::{Cli, Commands, ConfigCommands, LocationCommands, NotifyCommands};
use taqwa::error::Result;

mod commands;

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        if let Some(hint) = e.hint() {
            eprintln!("\n{}", hint);
        }
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "taqwa=debug" } else { "warn" };
    let filter = EnvFilter::try_from_env("TAQWA_LOG").unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Location(args) => match args.command {
            Some(LocationCommands::Set { city, country, lat, lon }) => {
                commands::cmd_location_set(city, country, lat, lon)
            }
            Some(LocationCommands::Search { query, pick, json }) => {
                commands::cmd_location_search(&query.join(" "), pick, json)
            }
            Some(LocationCommands::Clear) => commands::cmd_location_clear(),
            None => commands::cmd_location(args.refresh, args.strict, args.json),
        },

        Commands::Times { json } => commands::cmd_times(json),
        Commands::Next { watch, json } => commands::cmd_next(watch, json),

        Commands::Notify(NotifyCommands::Show { json }) => commands::cmd_notify_show(json),
        Commands::Notify(NotifyCommands::Set {
            enabled,
            before,
            at_time,
            minutes_before,
            adhan,
        }) => commands::cmd_notify_set(enabled, before, at_time, minutes_before, adhan),
        Commands::Notify(NotifyCommands::Toggle { prayer }) => commands::cmd_notify_toggle(&prayer),
        Commands::Notify(NotifyCommands::Permission) => commands::cmd_notify_permission(),
        Commands::Notify(NotifyCommands::Test) => commands::cmd_notify_test(),

        Commands::Daemon => commands::cmd_daemon(),

        Commands::Config(ConfigCommands::Show) => commands::cmd_config_show(),
        Commands::Config(ConfigCommands::Path) => commands::cmd_config_path(),

        Commands::Completions { shell } => commands::cmd_completions(shell),
    }
}
