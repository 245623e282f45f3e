//! Scanner configuration.
//!
//! The endpoint, treasury wallets, tolerance and retry limit are fixed
//! deployment constants, but they live in an explicit struct (rather than
//! module-level statics) so tests can point the scanner at a stub node.

use anyhow::Result;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::transfer::ScanDirection;

/// Smallest accepted transaction-scan limit.
pub const MIN_TX_LIMIT: usize = 10;

/// Largest accepted transaction-scan limit (one RPC page).
pub const MAX_TX_LIMIT: usize = 1000;

/// Which treasury wallet a scan targets.
///
/// The role picks both the wallet address and the direction of the balance
/// change being hunted: a payout leaves the payouts wallet, a deposit lands
/// in the jackpot wallet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum WalletRole {
    /// Find the wallet the last jackpot was paid out to.
    Payout,
    /// Find a wallet that deposited into the current jackpot.
    Deposit,
}

impl WalletRole {
    pub fn direction(&self) -> ScanDirection {
        match self {
            WalletRole::Payout => ScanDirection::Payout,
            WalletRole::Deposit => ScanDirection::Deposit,
        }
    }
}

/// Scanner configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerConfig {
    /// JSON-RPC endpoint of the ledger node
    pub rpc_endpoint: String,

    /// Treasury wallet that pays jackpots out
    pub payouts_wallet: String,

    /// Treasury wallet that collects jackpot entries
    pub jackpot_wallet: String,

    /// Absolute tolerance around the target amount, in SOL
    pub amount_tolerance: f64,

    /// Attempts against HTTP 429 before giving up
    pub max_retries: u32,

    /// Signatures fetched when the caller does not specify a limit
    pub default_tx_limit: usize,

    /// Per-request HTTP timeout in seconds
    pub request_timeout_secs: u64,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            rpc_endpoint: "https://api.mainnet-beta.solana.com".to_string(),
            payouts_wallet: "F5YtngCQs6QCUdy2vqT6hMtFyNkLpkJSTQF2WZKV1y8e".to_string(),
            jackpot_wallet: "CC4524TTSUScbYFhAecjBXQumQcn627EpiDUauSyr3EY".to_string(),
            amount_tolerance: 0.01,
            max_retries: 6,
            default_tx_limit: 75,
            request_timeout_secs: 30,
        }
    }
}

impl ScannerConfig {
    /// The wallet address scanned for the given role.
    pub fn wallet_for(&self, role: WalletRole) -> &str {
        match role {
            WalletRole::Payout => &self.payouts_wallet,
            WalletRole::Deposit => &self.jackpot_wallet,
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.rpc_endpoint.is_empty() {
            anyhow::bail!("rpc_endpoint must not be empty");
        }

        if !is_valid_address(&self.payouts_wallet) {
            anyhow::bail!("payouts_wallet is not a valid address: {}", self.payouts_wallet);
        }
        if !is_valid_address(&self.jackpot_wallet) {
            anyhow::bail!("jackpot_wallet is not a valid address: {}", self.jackpot_wallet);
        }

        if self.amount_tolerance <= 0.0 {
            anyhow::bail!("amount_tolerance must be positive, got {}", self.amount_tolerance);
        }

        if self.default_tx_limit < MIN_TX_LIMIT || self.default_tx_limit > MAX_TX_LIMIT {
            anyhow::bail!(
                "default_tx_limit must be in [{}, {}], got {}",
                MIN_TX_LIMIT,
                MAX_TX_LIMIT,
                self.default_tx_limit
            );
        }

        Ok(())
    }
}

/// Check that a string is a base58-encoded 32-byte account address.
pub fn is_valid_address(address: &str) -> bool {
    bs58::decode(address)
        .into_vec()
        .map(|bytes| bytes.len() == 32)
        .unwrap_or(false)
}
