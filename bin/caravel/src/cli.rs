use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::level_filters::LevelFilter;

#[derive(Parser)]
#[command(name = "caravel")]
#[command(
    author,
    version,
    about = "Deploy, confirm and verify contracts from a manifest"
)]
pub struct Cli {
    /// The verbosity level.
    #[arg(short, long, env = "CARAVEL_VERBOSITY", default_value_t = LevelFilter::INFO)]
    pub verbosity: LevelFilter,

    /// Path to the deployment manifest (Caravel.toml) or the directory
    /// containing it.
    #[arg(long, alias = "conf", env = "CARAVEL_CONFIG", default_value = ".")]
    pub config: PathBuf,

    /// Verification API key. Overrides the manifest credential; when neither
    /// is set, verification is skipped.
    #[arg(long, env = "CARAVEL_ETHERSCAN_API_KEY")]
    pub etherscan_api_key: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Deploy manifest contracts and verify them where policy allows.
    Deploy {
        /// The target network name. All configured networks run concurrently
        /// when omitted.
        #[arg(long, env = "CARAVEL_NETWORK")]
        network: Option<String>,

        /// Only run contracts carrying one of these tags.
        #[arg(long = "tag", value_name = "TAG")]
        tags: Vec<String>,

        /// Redeploy even when an up-to-date deployment record exists.
        #[arg(long, env = "CARAVEL_REDEPLOY", default_value_t = false)]
        redeploy: bool,
    },

    /// Print the recorded deployments for one network.
    Records {
        /// The network whose record partition to print.
        #[arg(long, env = "CARAVEL_NETWORK")]
        network: String,
    },
}
