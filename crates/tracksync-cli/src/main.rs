mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::{
    config::ConfigSubcommand, project::ProjectSubcommand, role::RoleSubcommand,
    status::StatusSubcommand,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "tracksync",
    about = "Keep tracker transition permissions in step with project task statuses",
    version,
    propagate_version = true
)]
struct Cli {
    /// Workspace root (default: auto-detect from .tracksync/)
    #[arg(long, global = true, env = "TRACKSYNC_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the workspace config and database
    Init {
        /// Id of the tracker whose transitions are managed
        #[arg(long)]
        tracker: u64,

        /// Default task status ids (repeat or comma-separate)
        #[arg(long = "default-status", value_delimiter = ',')]
        default_statuses: Vec<u64>,
    },

    /// Manage projects
    Project {
        #[command(subcommand)]
        subcommand: ProjectSubcommand,
    },

    /// Manage roles
    Role {
        #[command(subcommand)]
        subcommand: RoleSubcommand,
    },

    /// Inspect and set per-project task statuses
    Status {
        #[command(subcommand)]
        subcommand: StatusSubcommand,
    },

    /// List persisted transitions for the managed tracker
    Transitions {
        /// Only show transitions for this role id
        #[arg(long)]
        role: Option<u64>,
    },

    /// Show what a sync would insert and delete, without writing
    Plan,

    /// Insert missing and delete stale transitions
    Sync,

    /// Inspect and validate the workspace config
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let root = root::resolve_root(cli.root.as_deref());

    let result = match cli.command {
        Commands::Init {
            tracker,
            default_statuses,
        } => cmd::init::run(&root, tracker, default_statuses, cli.json),
        Commands::Project { subcommand } => cmd::project::run(&root, subcommand, cli.json),
        Commands::Role { subcommand } => cmd::role::run(&root, subcommand, cli.json),
        Commands::Status { subcommand } => cmd::status::run(&root, subcommand, cli.json),
        Commands::Transitions { role } => cmd::transitions::run(&root, role, cli.json),
        Commands::Plan => cmd::sync::plan(&root, cli.json),
        Commands::Sync => cmd::sync::run(&root, cli.json),
        Commands::Config { subcommand } => cmd::config::run(&root, subcommand, cli.json),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
