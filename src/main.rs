//! SolPot wallet scanner CLI.
//!
//! Thin presentation layer: collects the scan parameters, runs one scan,
//! and renders the result. Diagnostics go to stderr via `tracing`; stdout
//! carries only the scan outcome.

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use solpot_scanner::config::{ScannerConfig, WalletRole, MAX_TX_LIMIT, MIN_TX_LIMIT};
use solpot_scanner::rpc::RpcClient;
use solpot_scanner::scanner::Scanner;
use solpot_scanner::transfer::MatchedTransfer;

#[derive(Parser, Debug)]
#[command(author, version, about = "Find the counterparty of a SolPot payout or deposit by amount", long_about = None)]
struct Args {
    /// Which treasury wallet to scan
    #[arg(short, long, value_enum)]
    role: WalletRole,

    /// Exact SOL amount shown by the pot (minimum 0.01)
    #[arg(short, long)]
    amount: f64,

    /// Recent transactions to scan, 10-1000 (default: 75)
    #[arg(short, long)]
    limit: Option<usize>,

    /// RPC endpoint URL override
    #[arg(long)]
    rpc_url: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,

    /// Print matches as JSON instead of text
    #[arg(long, default_value_t = false)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level);

    let mut config = ScannerConfig::default();
    if let Some(rpc_url) = args.rpc_url {
        config.rpc_endpoint = rpc_url;
    }
    config.validate().context("invalid configuration")?;

    if args.amount < 0.01 {
        anyhow::bail!("amount must be at least 0.01 SOL");
    }
    let limit = args.limit.unwrap_or(config.default_tx_limit);
    if limit < MIN_TX_LIMIT || limit > MAX_TX_LIMIT {
        anyhow::bail!("limit must be in [{}, {}]", MIN_TX_LIMIT, MAX_TX_LIMIT);
    }

    let wallet = config.wallet_for(args.role).to_string();
    tracing::info!(%wallet, amount = args.amount, limit, "starting scan");

    // One RPC session per scan, released before the result is rendered.
    let matches = {
        let client = RpcClient::new(&config)?;
        let scanner = Scanner::new(client, &config);
        scanner
            .scan(&wallet, args.amount, limit, args.role.direction())
            .await
            .context("scan aborted")?
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&matches)?);
        return Ok(());
    }

    if matches.is_empty() {
        println!(
            "No matching transaction found. Try increasing the transaction limit or adjusting the amount."
        );
        return Ok(());
    }

    for transfer in &matches {
        print_match(transfer);
    }

    Ok(())
}

fn print_match(transfer: &MatchedTransfer) {
    println!("Found matching transaction at {}", transfer.timestamp);
    println!("  Amount:       {:.4} SOL", transfer.amount);
    println!(
        "  Other wallet: {}  ({})",
        transfer.counterparty,
        transfer.counterparty_url()
    );
    println!(
        "  Signature:    {}  ({})",
        transfer.signature,
        transfer.signature_url()
    );
}

fn init_logging(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
