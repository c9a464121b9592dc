//! Config and completion commands

use std::io;

use clap::CommandFactory;
use clap_complete::{generate, Shell};
use colored::Colorize;

use taqwa::cli::{Cli, CompletionShell};
use taqwa::config::Config;
use taqwa::error::{Result, TaqwaError};

/// Print the effective configuration (defaults included)
pub fn cmd_config_show() -> Result<()> {
    let config = Config::load()?;
    let content =
        toml::to_string_pretty(&config).map_err(|e| TaqwaError::ConfigError(e.to_string()))?;
    println!("{}", content);
    Ok(())
}

pub fn cmd_config_path() -> Result<()> {
    let config_path = Config::config_path()?;
    let exists = if config_path.exists() {
        "".normal()
    } else {
        " (not created yet, defaults in use)".dimmed()
    };
    println!("Config:   {}{}", config_path.display(), exists);
    println!("Database: {}", Config::db_path()?.display());
    println!("Log:      {}", Config::data_dir()?.join("notifications.log").display());
    Ok(())
}

/// Generate shell completions
pub fn cmd_completions(shell: CompletionShell) -> Result<()> {
    let mut cmd = Cli::command();
    let shell = match shell {
        CompletionShell::Bash => Shell::Bash,
        CompletionShell::Zsh => Shell::Zsh,
        CompletionShell::Fish => Shell::Fish,
        CompletionShell::Powershell => Shell::PowerShell,
    };
    generate(shell, &mut cmd, "taqwa", &mut io::stdout());
    Ok(())
}
