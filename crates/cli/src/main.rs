use arbor_cli::commands::{inspect, timeline, verify};
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "arbor")]
#[command(about = "Arbor offline tool: inspect and verify storage logs without a running node", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List every tree recorded in a storage log
    Inspect {
        storage_path: String,
    },
    /// List the committed roots of one tree
    Timeline {
        storage_path: String,

        /// Tree (log or map) id
        #[arg(long)]
        tree: i64,
    },
    /// Check root signatures and the revision chain of one tree
    Verify {
        storage_path: String,

        #[arg(long)]
        tree: i64,

        /// PEM-encoded (SPKI) Ed25519 public key of the tree
        #[arg(long)]
        public_key: String,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Inspect { storage_path } => inspect::run(&storage_path),
        Commands::Timeline { storage_path, tree } => timeline::run(&storage_path, tree),
        Commands::Verify {
            storage_path,
            tree,
            public_key,
        } => verify::run(&storage_path, tree, &public_key),
    }
}
