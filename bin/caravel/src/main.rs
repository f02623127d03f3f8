//! caravel is a CLI tool that deploys contracts from a manifest, waits for
//! confirmations and verifies them on a block-explorer service.

mod cli;

use anyhow::Result;
use clap::Parser;
use comfy_table::Table;

use caravel_deploy::{
    ContractReport, DEFAULT_VERIFIER_API_URL, DeploymentRecord, EtherscanVerifier, HttpChainClient,
    Manifest, Orchestrator, RecordStore, Verifier,
};
use cli::{Cli, Command};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize the logger.
    tracing_subscriber::fmt()
        .with_max_level(cli.verbosity)
        .init();

    let mut manifest = Manifest::load_from_file(&cli.config)?;

    // CLI credential takes precedence over the manifest one.
    if let Some(key) = cli.etherscan_api_key {
        manifest.verifier.api_key = Some(key);
    }

    match cli.command {
        Command::Deploy {
            network,
            tags,
            redeploy,
        } => {
            let store = RecordStore::open(manifest.records_dir())?;
            let api_url = manifest
                .verifier
                .api_url
                .clone()
                .unwrap_or_else(|| DEFAULT_VERIFIER_API_URL.to_string());
            let verifier = Verifier::new(
                EtherscanVerifier::new(api_url)?,
                manifest.verifier.clone(),
            );
            let orchestrator = Orchestrator::new(manifest, store, verifier);

            let reports = match network {
                Some(name) => {
                    let target = orchestrator.manifest().resolve_target(&name)?;
                    let chain = HttpChainClient::new(&target.rpc_url)?;
                    orchestrator
                        .run_target(&chain, &target, &tags, redeploy)
                        .await?
                }
                None => {
                    orchestrator
                        .run_all(|t| HttpChainClient::new(&t.rpc_url), &tags, redeploy)
                        .await?
                }
            };

            print_reports(&reports);
        }

        Command::Records { network } => {
            let store = RecordStore::open(manifest.records_dir())?;
            print_records(&network, &store.records_for_network(&network));
        }
    }

    Ok(())
}

fn print_reports(reports: &[ContractReport]) {
    if reports.is_empty() {
        tracing::info!("No contracts matched the run");
        return;
    }

    let mut table = Table::new();
    table.set_header(vec![
        "Contract", "Network", "Address", "Tx hash", "State", "Reused",
    ]);
    for report in reports {
        table.add_row(vec![
            report.contract_name.clone(),
            report.network_name.clone(),
            report.address.to_string(),
            report.tx_hash.clone(),
            report.state.to_string(),
            if report.reused { "yes" } else { "no" }.to_string(),
        ]);
    }
    println!("{table}");
}

fn print_records(network: &str, records: &[DeploymentRecord]) {
    if records.is_empty() {
        tracing::info!(network, "No deployment records");
        return;
    }

    let mut table = Table::new();
    table.set_header(vec![
        "Contract",
        "Address",
        "Tx hash",
        "Confirmed block",
        "Deployed at",
    ]);
    for record in records {
        table.add_row(vec![
            record.contract_name.clone(),
            record.address.to_string(),
            record.tx_hash.clone(),
            record.confirmed_block.to_string(),
            record.deployed_at.to_string(),
        ]);
    }
    println!("{table}");
}
