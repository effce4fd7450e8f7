//! Command-line front end for inspecting and updating settings files.
//!
//! `get` prints a section, `set` persists one key through the writable
//! store, `watch` follows the file and prints each republished snapshot.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use serde_json::{Map, Value};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use config_overlay::{FileWatcher, SettingsMonitor, WritableOptions};

/// Sections are handled untyped here; applications bind their own types.
type DynSettings = Map<String, Value>;

#[derive(Parser)]
#[command(name = "config-overlay", about = "Inspect and update sections of a JSON settings file")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print a section as pretty JSON
    Get {
        #[arg(long)]
        file: PathBuf,
        #[arg(long)]
        section: String,
    },
    /// Set one key in a section and persist the change
    Set {
        #[arg(long)]
        file: PathBuf,
        #[arg(long)]
        section: String,
        #[arg(long)]
        key: String,
        /// Parsed as JSON when possible, otherwise stored as a string
        #[arg(long)]
        value: String,
    },
    /// Follow the file and print the section after each reload
    Watch {
        #[arg(long)]
        file: PathBuf,
        #[arg(long)]
        section: String,
        #[arg(long, default_value_t = 200)]
        debounce_ms: u64,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "config_overlay=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Get { file, section } => {
            let store = WritableOptions::<DynSettings>::open(&section, &file)?;
            println!("{}", serde_json::to_string_pretty(store.value().as_ref())?);
        }
        Command::Set {
            file,
            section,
            key,
            value,
        } => {
            let parsed: Value = serde_json::from_str(&value)
                .unwrap_or_else(|_| Value::String(value.clone()));
            let store = WritableOptions::<DynSettings>::open(&section, &file)?;
            store.update(|settings| {
                settings.insert(key.clone(), parsed);
            })?;
            tracing::info!(section = %section, key = %key, "Section updated");
        }
        Command::Watch {
            file,
            section,
            debounce_ms,
        } => {
            let monitor = SettingsMonitor::<DynSettings>::load(&section, &file)?;
            let watcher =
                FileWatcher::new(&file).with_debounce(Duration::from_millis(debounce_ms));
            watcher.attach(monitor.clone());
            let (_handle, mut reloads) = watcher.run()?;

            println!(
                "{}",
                serde_json::to_string_pretty(monitor.current_value().as_ref())?
            );
            while reloads.recv().await.is_some() {
                println!(
                    "{}",
                    serde_json::to_string_pretty(monitor.current_value().as_ref())?
                );
            }
        }
    }
    Ok(())
}
