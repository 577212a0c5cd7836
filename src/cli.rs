use std::io::{self, BufRead, Write};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use kerala_core::Config;
use kerala_ui::{view, AppServices, WeatherModel};

/// How long one action may run before the shell stops waiting on it.
const ACTION_TIMEOUT: Duration = Duration::from_secs(120);

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(
    name = "kerala-weather",
    version,
    about = "Current weather for Kerala's districts, with a local history"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Fetch and store current weather for every district.
    FetchAll,

    /// Show stored readings, newest first.
    History,

    /// Fetch current weather for one district without storing it.
    Search {
        /// District name (case-insensitive).
        district: String,
    },

    /// Same as search; a district name is required.
    Refresh { district: Option<String> },

    /// List the known districts and their coordinates.
    Districts,

    /// Read commands from standard input (default).
    Shell,
}

impl Cli {
    pub fn run(self, config: &Config) -> Result<()> {
        let services = AppServices::from_config(config)?;
        let mut model = WeatherModel::new(services);
        let history_limit = config.ui.history_limit;

        let result = match self.command.unwrap_or(Command::Shell) {
            Command::Shell => run_shell(&mut model, history_limit),
            command => {
                execute(&mut model, &command, history_limit);
                Ok(())
            }
        };

        model.shutdown();
        result
    }
}

/// Run one action to completion and print what changed.
fn execute(model: &mut WeatherModel, command: &Command, history_limit: usize) {
    for notice in model.take_notices() {
        eprintln!("{notice}");
    }

    match command {
        Command::FetchAll => model.fetch_all(),
        Command::History => model.show_history(),
        Command::Search { district } => model.search(district),
        Command::Refresh { district } => model.refresh(district.as_deref()),
        Command::Districts => {
            let sync = model.services().weather_sync();
            print!("{}", view::render_districts(sync.registry()));
            return;
        }
        Command::Shell => return,
    }

    if !model.wait_idle(ACTION_TIMEOUT) {
        eprintln!("Still waiting on the weather service; results will show on the next command.");
    }

    for notice in model.take_notices() {
        eprintln!("{notice}");
    }

    match command {
        Command::History => print!("{}", view::render_history(model.history(), history_limit)),
        _ => {
            if model.latest().is_some() || model.error_message().is_empty() {
                println!("{}", view::render_latest(model.latest()));
            }
        }
    }

    if !model.status().is_empty() {
        println!("{}", model.status());
    }
}

fn run_shell(model: &mut WeatherModel, history_limit: usize) -> Result<()> {
    println!("Kerala weather. Commands: fetch-all, history, search <district>, refresh [district], districts, quit");

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("> ");
        io::stdout().flush().context("Failed to write prompt")?;

        let Some(line) = lines.next() else {
            break;
        };
        let line = line.context("Failed to read command")?;

        match parse_shell_line(&line) {
            Ok(None) => continue,
            Ok(Some(ShellAction::Quit)) => break,
            Ok(Some(ShellAction::Run(command))) => execute(model, &command, history_limit),
            Err(message) => eprintln!("{message}"),
        }
    }
    Ok(())
}

#[derive(Debug, PartialEq, Eq)]
enum ShellAction {
    Run(Command),
    Quit,
}

fn parse_shell_line(line: &str) -> Result<Option<ShellAction>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let (verb, rest) = match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (line, ""),
    };

    let command = match verb.to_lowercase().as_str() {
        "fetch-all" | "fetch" => Command::FetchAll,
        "history" => Command::History,
        "search" => Command::Search {
            district: rest.to_string(),
        },
        "refresh" => Command::Refresh {
            district: (!rest.is_empty()).then(|| rest.to_string()),
        },
        "districts" => Command::Districts,
        "quit" | "exit" => return Ok(Some(ShellAction::Quit)),
        other => return Err(format!("Unknown command: {other}")),
    };
    Ok(Some(ShellAction::Run(command)))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn test_no_subcommand_defaults_to_shell() {
        let cli = Cli::try_parse_from(["kerala-weather"]).unwrap();
        assert_eq!(cli.command, None);
    }

    #[test]
    fn test_refresh_name_is_optional() {
        let cli = Cli::try_parse_from(["kerala-weather", "refresh"]).unwrap();
        assert_eq!(cli.command, Some(Command::Refresh { district: None }));

        let cli = Cli::try_parse_from(["kerala-weather", "search", "Kottayam"]).unwrap();
        assert_eq!(
            cli.command,
            Some(Command::Search {
                district: "Kottayam".into()
            })
        );
    }

    #[test]
    fn test_shell_lines() {
        assert_eq!(parse_shell_line("   "), Ok(None));
        assert_eq!(parse_shell_line("quit"), Ok(Some(ShellAction::Quit)));
        assert_eq!(
            parse_shell_line("search  Thiruvananthapuram "),
            Ok(Some(ShellAction::Run(Command::Search {
                district: "Thiruvananthapuram".into()
            })))
        );
        assert_eq!(
            parse_shell_line("refresh"),
            Ok(Some(ShellAction::Run(Command::Refresh { district: None })))
        );
        assert!(parse_shell_line("forecast").is_err());
    }
}
