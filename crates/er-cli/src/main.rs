//! Emote Remover CLI
//!
//! CLI tool for managing the emote list and trying the filter engine offline.

mod simulate;
mod store;

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use log::debug;

use er_core::{EngineConfig, KeyList, ListChange};

use crate::simulate::SimulateOptions;
use crate::store::FileStore;

#[derive(Parser)]
#[command(name = "er-cli")]
#[command(about = "Emote Remover list management and simulation tools")]
struct Cli {
    /// Key store file (JSON object, same layout as the extension's localStorage)
    #[arg(short, long, global = true, default_value = "emote-store.json")]
    store: PathBuf,

    /// Engine configuration file (JSON)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the stored emote list
    List,

    /// Add an emote to the stored list
    Add {
        /// Emote name, as carried by the chat's emote attribute
        name: String,
    },

    /// Remove an emote from the stored list
    Remove {
        /// Emote name
        #[arg(required_unless_present = "index")]
        name: Option<String>,

        /// Position in the list instead of a name
        #[arg(short, long, conflicts_with = "name")]
        index: Option<usize>,
    },

    /// Remove every stored emote
    Clear,

    /// Run the engine against a chat fixture
    Simulate {
        /// Fixture file
        #[arg(short, long)]
        fixture: PathBuf,

        /// Keys to start; defaults to the stored list (or the built-in defaults)
        #[arg(short, long)]
        key: Vec<String>,

        /// Also hide every entry holding any emote
        #[arg(long)]
        bulk: bool,

        /// Keys to stop after injection
        #[arg(long)]
        stop: Vec<String>,

        /// Stop everything after injection
        #[arg(long)]
        stop_all: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let result = load_config(cli.config.as_deref()).and_then(|config| match cli.command {
        Commands::List => cmd_list(&cli.store, &config),
        Commands::Add { name } => cmd_add(&cli.store, &config, &name),
        Commands::Remove { name, index } => cmd_remove(&cli.store, &config, name.as_deref(), index),
        Commands::Clear => cmd_clear(&cli.store, &config),
        Commands::Simulate {
            fixture,
            key,
            bulk,
            stop,
            stop_all,
        } => cmd_simulate(
            &cli.store,
            config,
            &fixture,
            SimulateOptions {
                keys: key,
                bulk,
                stop,
                stop_all,
            },
        ),
    });

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig, String> {
    let Some(path) = path else {
        return Ok(EngineConfig::default());
    };
    let text = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read '{}': {}", path.display(), e))?;
    let config = EngineConfig::from_json(&text).map_err(|e| format!("'{}': {}", path.display(), e))?;
    debug!("loaded config from {}", path.display());
    Ok(config)
}

fn load_list(store: &FileStore, config: &EngineConfig) -> Result<KeyList, String> {
    Ok(KeyList::load(store, &config.storage_key)
        .map_err(|e| e.to_string())?
        .unwrap_or_default())
}

fn print_list(list: &KeyList) {
    if list.is_empty() {
        println!("(no emotes)");
        return;
    }
    for (index, key) in list.keys().iter().enumerate() {
        println!("  [{}] {}", index, key);
    }
}

fn cmd_list(path: &Path, config: &EngineConfig) -> Result<(), String> {
    let store = FileStore::open(path).map_err(|e| e.to_string())?;
    print_list(&load_list(&store, config)?);
    Ok(())
}

fn edit_list(
    path: &Path,
    config: &EngineConfig,
    edit: impl FnOnce(&mut KeyList) -> ListChange,
) -> Result<ListChange, String> {
    let mut store = FileStore::open(path).map_err(|e| e.to_string())?;
    let mut list = load_list(&store, config)?;
    let change = edit(&mut list);
    if change.is_changed() {
        list.save(&mut store, &config.storage_key)
            .map_err(|e| e.to_string())?;
    }
    print_list(&list);
    Ok(change)
}

fn cmd_add(path: &Path, config: &EngineConfig, name: &str) -> Result<(), String> {
    match edit_list(path, config, |list| list.add(name))? {
        ListChange::Added(key) => println!("Added '{}'", key),
        _ => println!("'{}' not added (empty or already listed)", name.trim()),
    }
    Ok(())
}

fn cmd_remove(
    path: &Path,
    config: &EngineConfig,
    name: Option<&str>,
    index: Option<usize>,
) -> Result<(), String> {
    let change = edit_list(path, config, |list| match (name, index) {
        (_, Some(index)) => list.remove_at(index),
        (Some(name), None) => list.remove(name),
        (None, None) => ListChange::Unchanged,
    })?;
    match change {
        ListChange::Removed(key) => {
            println!("Removed '{}'", key);
            Ok(())
        }
        _ => Err("No such emote in the list".to_string()),
    }
}

fn cmd_clear(path: &Path, config: &EngineConfig) -> Result<(), String> {
    let mut store = FileStore::open(path).map_err(|e| e.to_string())?;
    let mut list = load_list(&store, config)?;
    let count = list.len();
    list.clear();
    list.save(&mut store, &config.storage_key)
        .map_err(|e| e.to_string())?;
    println!("Cleared {} emote(s)", count);
    Ok(())
}

fn cmd_simulate(
    path: &Path,
    config: EngineConfig,
    fixture_path: &Path,
    mut opts: SimulateOptions,
) -> Result<(), String> {
    let fixture = simulate::load_fixture(fixture_path)?;

    if opts.keys.is_empty() && !opts.bulk {
        let store = FileStore::open(path).map_err(|e| e.to_string())?;
        let keys = er_core::activation_keys(&store, &config).map_err(|e| e.to_string())?;
        opts.keys = keys.keys().iter().map(|k| k.to_string()).collect();
    }
    println!("Keys: {}", opts.keys.join(", "));

    let report = simulate::run(&fixture, config, &opts)?;
    simulate::print_report(&report);
    Ok(())
}
