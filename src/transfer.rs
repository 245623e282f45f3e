use chrono::DateTime;
use serde::{Deserialize, Serialize};

/// Lamports per SOL (10^9).
pub const LAMPORTS_PER_SOL: f64 = 1_000_000_000.0;

/// Placeholder used when a counterparty or timestamp cannot be determined.
pub const UNKNOWN: &str = "unknown";

/// Which side of a transfer the scanned wallet is expected to be on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScanDirection {
    /// The wallet paid out: its balance decreased (pre - post).
    Payout,
    /// The wallet was paid: its balance increased (post - pre).
    Deposit,
}

impl ScanDirection {
    /// Signed lamport delta for the scanned account, oriented so that a
    /// transfer in the expected direction is positive.
    pub fn delta_lamports(&self, pre: u64, post: u64) -> i128 {
        match self {
            ScanDirection::Payout => pre as i128 - post as i128,
            ScanDirection::Deposit => post as i128 - pre as i128,
        }
    }
}

/// A transfer whose amount fell inside the scan's tolerance window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchedTransfer {
    pub signature: String,
    /// Block time rendered as `YYYY-MM-DD HH:MM:SS` UTC, or "unknown".
    pub timestamp: String,
    /// Transfer amount in SOL, always positive.
    pub amount: f64,
    /// Best-effort counterparty: the first account in the transaction
    /// that is not the scanned wallet.
    pub counterparty: String,
}

impl MatchedTransfer {
    /// Solscan link for the counterparty account.
    pub fn counterparty_url(&self) -> String {
        format!("https://solscan.io/account/{}", self.counterparty)
    }

    /// Solscan link for the transaction.
    pub fn signature_url(&self) -> String {
        format!("https://solscan.io/tx/{}", self.signature)
    }
}

pub fn lamports_to_sol(lamports: i128) -> f64 {
    lamports as f64 / LAMPORTS_PER_SOL
}

/// Render a Unix block time as `YYYY-MM-DD HH:MM:SS` UTC.
///
/// Unconfirmed or pruned transactions carry no block time; those render as
/// "unknown" so rescans of the same history stay byte-identical.
pub fn format_block_time(block_time: Option<i64>) -> String {
    block_time
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| UNKNOWN.to_string())
}
