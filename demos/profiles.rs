//! Manage saved profiles of Wiz lights from the command line.
//!
//! Run with: cargo run --example profiles -- --help

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use wiz_profiles::{
    Bulb, BulbItem, BulbRegistry, Profile, ProfileStore, ScanPolicy, StoreOptions, discover_bulbs,
};

#[derive(Parser)]
#[command(name = "wiz-profiles")]
#[command(about = "Save and restore groups of Wiz smart lights", long_about = None)]
struct Cli {
    /// Scan the network for bulbs that moved since the profile was saved
    #[arg(short, long, global = true)]
    scan: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Discover all Wiz lights on the network
    Discover {
        /// Discovery timeout in seconds (default: 5)
        #[arg(short, long, default_value = "5")]
        timeout: u64,
    },

    /// List profile documents in a directory
    List {
        /// Directory to search
        dir: PathBuf,
    },

    /// Load a profile and show which bulbs answered
    Show {
        /// Path of the profile document
        path: PathBuf,
    },

    /// Save every bulb found on the network as a new profile
    Save {
        /// Path of the profile document to write
        path: PathBuf,
        /// Profile name
        #[arg(short, long, default_value = "Discovered")]
        name: String,
        /// Discovery timeout in seconds (default: 5)
        #[arg(short, long, default_value = "5")]
        timeout: u64,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let options = StoreOptions {
        scan: if cli.scan { ScanPolicy::Scan } else { ScanPolicy::CacheOnly },
        ..Default::default()
    };

    match cli.command {
        Commands::Discover { timeout } => {
            println!(
                "Discovering Wiz lights on the network (timeout: {}s)...",
                timeout
            );
            let bulbs = discover_bulbs(Duration::from_secs(timeout)).await?;
            if bulbs.is_empty() {
                println!("No lights found on the network.");
            } else {
                println!("\nFound {} light(s):", bulbs.len());
                for bulb in bulbs {
                    println!("  IP: {:15}  MAC: {}", bulb.ip.to_string(), bulb.mac);
                }
            }
        }

        Commands::List { dir } => {
            let mut store = ProfileStore::default().with_options(options);
            let paths = store.enumerate(&dir)?;
            if paths.is_empty() {
                println!("No profiles in {}.", dir.display());
            }
            for path in paths {
                println!("  {}", path.display());
            }
        }

        Commands::Show { path } => {
            let store = ProfileStore::new(path).with_options(options);
            let registry = BulbRegistry::new();
            let profile = store.load(&registry).await?;

            println!("Profile: {} ({})", profile.name(), profile.id());
            for item in profile.bulbs() {
                let status = match item.bulb().and_then(|b| b.pilot()) {
                    Some(pilot) if pilot.is_on() => "ON",
                    Some(_) => "OFF",
                    None => "unreachable",
                };
                println!(
                    "  {:20} MAC: {}  IP: {:15}  {}",
                    item.name(),
                    item.mac(),
                    item.addr().to_string(),
                    status
                );
            }
        }

        Commands::Save {
            path,
            name,
            timeout,
        } => {
            let store = ProfileStore::new(path).with_options(options);
            let mut profile = Profile::new(&name);
            for found in discover_bulbs(Duration::from_secs(timeout)).await? {
                profile.add_bulb(BulbItem::new(found.mac, found.ip, Bulb::DEFAULT_PORT, ""));
            }
            store.save(&profile)?;
            println!("Saved {} light(s) to profile '{}'.", profile.bulbs().len(), name);
        }
    }

    Ok(())
}
