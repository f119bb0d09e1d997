//! Trust Lane CLI
//!
//! Entry point for the `trust-resolve` command-line tool. Exit status is 0
//! only when a verified target was produced; every trust failure is
//! non-zero.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;

use trust_lane::{
    ConfigOverrides, ImageReference, TrustConfig, TrustResolver, TrustRootStore,
};

#[derive(Parser)]
#[command(name = "trust-resolve")]
#[command(about = "Content-trust resolution against a notary service", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve an image reference to a verified digest
    Resolve {
        /// Image reference (e.g. registry:5000/app:latest)
        image: String,

        /// Configuration directory holding trust state
        #[arg(long, short = 'c')]
        config_dir: Option<PathBuf>,

        /// Trust service endpoint override
        #[arg(long)]
        server: Option<String>,

        /// Overall fetch timeout in seconds
        #[arg(long)]
        timeout: Option<u64>,

        /// Output the verified target as JSON
        #[arg(long)]
        json: bool,
    },

    /// Pinned trust root management
    Root {
        #[command(subcommand)]
        action: RootCommands,
    },
}

#[derive(Subcommand)]
enum RootCommands {
    /// Show the pinned trust root for a repository
    Show {
        /// Registry-qualified repository (e.g. registry:5000/app)
        repository: String,

        /// Configuration directory holding trust state
        #[arg(long, short = 'c')]
        config_dir: Option<PathBuf>,
    },

    /// Remove the pinned trust root for a repository
    Remove {
        /// Registry-qualified repository (e.g. registry:5000/app)
        repository: String,

        /// Configuration directory holding trust state
        #[arg(long, short = 'c')]
        config_dir: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();

    let code = match cli.command {
        Commands::Resolve {
            image,
            config_dir,
            server,
            timeout,
            json,
        } => run_resolve(&image, config_dir, server, timeout, json),
        Commands::Root { action } => match action {
            RootCommands::Show {
                repository,
                config_dir,
            } => run_root_show(&repository, config_dir),
            RootCommands::Remove {
                repository,
                config_dir,
            } => run_root_remove(&repository, config_dir),
        },
    };

    process::exit(code);
}

fn run_resolve(
    image: &str,
    config_dir: Option<PathBuf>,
    server: Option<String>,
    timeout: Option<u64>,
    json: bool,
) -> i32 {
    let reference = match ImageReference::parse(image) {
        Ok(reference) => reference,
        Err(e) => {
            eprintln!("invalid image reference: {}", e);
            return 2;
        }
    };

    let overrides = ConfigOverrides {
        server,
        timeout_seconds: timeout,
        root_threshold: None,
    };
    let config = match TrustConfig::load(&resolve_config_dir(config_dir), &overrides) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("configuration error: {}", e);
            return 2;
        }
    };

    let resolver = TrustResolver::new(&config);
    match resolver.resolve(&reference) {
        Ok(target) => {
            if json {
                match serde_json::to_string_pretty(&target) {
                    Ok(out) => println!("{}", out),
                    Err(e) => {
                        eprintln!("output error: {}", e);
                        return 2;
                    }
                }
            } else {
                println!("Tagging {}@{}", reference.repository(), target.digest);
            }
            0
        }
        Err(failure) => {
            eprintln!("{}: {}", failure.kind(), failure);
            failure.exit_code()
        }
    }
}

fn run_root_show(repository: &str, config_dir: Option<PathBuf>) -> i32 {
    let store = TrustRootStore::open(&resolve_config_dir(config_dir));
    match store.get(repository) {
        Ok(Some(root)) => match serde_json::to_string_pretty(&root) {
            Ok(out) => {
                println!("{}", out);
                0
            }
            Err(e) => {
                eprintln!("output error: {}", e);
                2
            }
        },
        Ok(None) => {
            eprintln!("no trust root pinned for {}", repository);
            1
        }
        Err(e) => {
            eprintln!("trust store error: {}", e);
            2
        }
    }
}

fn run_root_remove(repository: &str, config_dir: Option<PathBuf>) -> i32 {
    let store = TrustRootStore::open(&resolve_config_dir(config_dir));
    match store.remove(repository) {
        Ok(true) => {
            println!("removed trust root for {}", repository);
            0
        }
        Ok(false) => {
            eprintln!("no trust root pinned for {}", repository);
            1
        }
        Err(e) => {
            eprintln!("trust store error: {}", e);
            2
        }
    }
}

/// Default config directory: `$TRUST_LANE_CONFIG`, else `~/.config/trust-lane`.
fn resolve_config_dir(flag: Option<PathBuf>) -> PathBuf {
    if let Some(dir) = flag {
        return dir;
    }
    if let Ok(dir) = std::env::var("TRUST_LANE_CONFIG") {
        return PathBuf::from(dir);
    }
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(".config").join("trust-lane")
}
