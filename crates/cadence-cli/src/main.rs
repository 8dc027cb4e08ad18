mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::{
    cadence::CadenceSubcommand, config::ConfigSubcommand, group::GroupSubcommand,
    record::RecordSubcommand,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "cadence",
    about = "Keep long-baseline monitoring campaigns alive by renewing expired observation requests",
    version,
    propagate_version = true
)]
struct Cli {
    /// Project root (default: auto-detect from .cadence/)
    #[arg(long, global = true, env = "CADENCE_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create .cadence/ with a default config and an empty store
    Init,

    /// Manage observation records
    Record {
        #[command(subcommand)]
        subcommand: RecordSubcommand,
    },

    /// Manage observation groups
    Group {
        #[command(subcommand)]
        subcommand: GroupSubcommand,
    },

    /// Manage cadences (group + renewal parameters)
    Cadence {
        #[command(subcommand)]
        subcommand: CadenceSubcommand,
    },

    /// Run the renewal engine once for one cadence
    Run { slug: String },

    /// Run the renewal engine once for every active cadence
    Tick,

    /// Tick periodically until interrupted
    Daemon {
        /// Override tick_interval_secs from the config
        #[arg(long, value_name = "SECS")]
        interval: Option<u64>,
    },

    /// Refresh the status of in-flight observations from their facilities
    Sync,

    /// Validate the project configuration
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = match &cli.command {
        Commands::Tick | Commands::Daemon { .. } | Commands::Sync => tracing::Level::INFO,
        _ => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let root = root::resolve_root(cli.root.as_deref());

    let result = match cli.command {
        Commands::Init => cmd::init::run(&root),
        Commands::Record { subcommand } => cmd::record::run(&root, subcommand, cli.json),
        Commands::Group { subcommand } => cmd::group::run(&root, subcommand, cli.json),
        Commands::Cadence { subcommand } => cmd::cadence::run(&root, subcommand, cli.json),
        Commands::Run { slug } => cmd::run::run_one(&root, &slug, cli.json),
        Commands::Tick => cmd::run::tick(&root, cli.json),
        Commands::Daemon { interval } => cmd::run::daemon(&root, interval),
        Commands::Sync => cmd::sync::run(&root, cli.json),
        Commands::Config { subcommand } => cmd::config::run(&root, subcommand, cli.json),
    };

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
