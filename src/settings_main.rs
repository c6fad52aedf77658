// SPDX-License-Identifier: MPL-2.0

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use netstat_monitor::config::{self, DataPaths, SettingsStore};
use netstat_monitor::presentation::{ConsolePresenter, Presenter};

#[derive(Parser)]
#[command(name = "netstat-settings", version, about = "View and edit netstat-monitor settings")]
struct Cli {
    /// Directory holding config.json (default: ~/.netstat-monitor)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print every setting (default)
    Show,
    /// Change one setting
    Set { key: String, value: String },
    /// Restore the defaults
    Reset,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let paths = match cli.data_dir {
        Some(dir) => DataPaths::new(dir),
        None => DataPaths::from_home()?,
    };
    let mut store = SettingsStore::open(paths.config_file());
    let mut presenter = ConsolePresenter;

    match cli.command.unwrap_or(Commands::Show) {
        Commands::Show => {
            println!("Config file: {}", store.path().display());
            for (key, value) in store.get_all() {
                println!("{} = {}", key, value);
            }
        }
        Commands::Set { key, value } => {
            // Validate before touching the store so a bad value changes nothing
            let value = match config::parse_setting_value(&key, &value) {
                Ok(value) => value,
                Err(netstat_monitor::Error::InvalidSetting { reason, .. }) => {
                    presenter.alert("Invalid Value", &reason);
                    std::process::exit(2);
                }
                Err(e) => {
                    presenter.alert("Invalid Setting", &e.to_string());
                    std::process::exit(2);
                }
            };
            store.set(&key, value)?;

            let message = if key == "check_interval" {
                format!(
                    "Check interval set to {} seconds.\n\nRestart the monitor to apply.",
                    store.settings().check_interval
                )
            } else {
                format!("{} = {}", key, store.get(&key).unwrap_or_default())
            };
            presenter.alert("Settings Saved", &message);
        }
        Commands::Reset => {
            store.reset()?;
            presenter.alert("Settings Reset", "All settings restored to their defaults.");
        }
    }

    Ok(())
}
