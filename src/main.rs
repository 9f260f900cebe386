//! swap-agent command line.
//!
//! ```text
//! swap-agent --config agent.toml execute --action fund.json
//! swap-agent --config agent.toml new-address [--internal]
//! swap-agent --config agent.toml balance
//! swap-agent generate-mnemonic
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use swap_agent::bitcoin::DerivationType;
use swap_agent::config::load_config;
use swap_agent::ethereum::Asset;
use swap_agent::observability::{init_logging, init_metrics};
use swap_agent::seed::generate_mnemonic;
use swap_agent::{Action, Agent};

#[derive(Parser)]
#[command(name = "swap-agent")]
#[command(about = "Counterparty agent for Bitcoin/Ethereum atomic swaps", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "swap-agent.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute one peer action read from a JSON file
    Execute {
        #[arg(short, long)]
        action: PathBuf,
    },
    /// Derive a fresh Bitcoin address
    NewAddress {
        /// Derive a change address instead of a receive address
        #[arg(long)]
        internal: bool,
    },
    /// Refresh outputs and print wallet balances
    Balance,
    /// Print a fresh 24-word mnemonic
    GenerateMnemonic,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if let Commands::GenerateMnemonic = cli.command {
        println!("{}", generate_mnemonic()?);
        return Ok(());
    }

    let config = load_config(&cli.config)?;
    init_logging(&config.observability.log_filter);

    tracing::info!(config = %cli.config.display(), "swap-agent v0.1.0 starting");

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => init_metrics(addr)?,
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let agent = Agent::from_config(&config).await?;

    match cli.command {
        Commands::Execute { action } => {
            let content = std::fs::read_to_string(&action)?;
            let action: Action = serde_json::from_str(&content)?;
            let outcome = agent.execute(&action).await?;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
        Commands::NewAddress { internal } => {
            let wallet = agent.bitcoin_wallet().ok_or("Bitcoin is not configured")?;
            // Derivation counters are rebuilt from the chain.
            wallet.refresh_utxos().await?;
            let derivation_type = if internal {
                DerivationType::Internal
            } else {
                DerivationType::External
            };
            println!("{}", wallet.new_address(derivation_type).await?);
        }
        Commands::Balance => {
            if let Some(wallet) = agent.bitcoin_wallet() {
                wallet.refresh_utxos().await?;
                println!("bitcoin:  {}", wallet.balance().await);
            }
            if let Some(wallet) = agent.ethereum_wallet() {
                println!("ethereum: {} wei ({})", wallet.balance(Asset::Ether).await?, wallet.address());
            }
        }
        Commands::GenerateMnemonic => {}
    }

    Ok(())
}
