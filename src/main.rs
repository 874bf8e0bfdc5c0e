use clap::{ArgAction, CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use tracing_subscriber::EnvFilter;

mod commands;

/// DreamAssembler - builds the client and server archives of a modpack
#[derive(Parser)]
#[command(name = "dreamassembler")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download every mod and the bulk archive, then pack both archives
    Build {
        /// Manifest file (defaults to paths.manifest)
        #[arg(short, long)]
        manifest: Option<String>,

        /// Staging root (defaults to paths.cache_dir)
        #[arg(short, long)]
        cache: Option<String>,
    },

    /// Register a GitHub repository of the organization as a mod
    AddMod {
        /// Repository name (e.g., NotEnoughItems)
        repo: String,

        /// Side the mod is needed on (CLIENT, SERVER or BOTH)
        #[arg(short, long, default_value = "BOTH")]
        side: String,

        /// Manifest file (defaults to paths.manifest)
        #[arg(short, long)]
        manifest: Option<String>,
    },

    /// Manage the staging cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// Show the staging root
    Path,

    /// Remove staging folders and built archives
    Clean {
        /// Show what would be removed without removing it
        #[arg(long)]
        dry_run: bool,

        /// Also remove downloaded mod releases, including superseded versions
        #[arg(long)]
        downloads: bool,
    },
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Set a configuration value
    Set {
        /// Configuration key (e.g., github.organization)
        key: String,

        /// Value to set
        value: String,
    },
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "dreamassembler=info",
        _ => "dreamassembler=debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Build { manifest, cache } => commands::build::run(manifest, cache),
        Commands::AddMod {
            repo,
            side,
            manifest,
        } => commands::add_mod::run(repo, side, manifest),
        Commands::Cache { action } => match action {
            CacheAction::Path => commands::cache::run_path(),
            CacheAction::Clean { dry_run, downloads } => {
                commands::cache::run_clean(dry_run, downloads)
            }
        },
        Commands::Config { action } => commands::config::run(&action),
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "dreamassembler", &mut std::io::stdout());
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
