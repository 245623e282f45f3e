//! SolPot wallet scanner
//!
//! Finds the counterparty of a SolPot jackpot payout or entry by
//! amount-matching a treasury wallet's recent transaction history:
//!
//! - fetch one page of recent signatures for the wallet,
//! - fetch each transaction (with backoff against rate limiting),
//! - compute the wallet's native balance delta,
//! - report the first transfer inside the tolerance window, newest first.
//!
//! The RPC layer retries HTTP 429 with exponential backoff and fails fast
//! on anything else; a scan either completes (possibly with no match) or
//! aborts with the RPC error. All diagnostics go to `tracing`; stdout is
//! reserved for results.

pub mod config;
pub mod rpc;
pub mod scanner;
pub mod transaction;
pub mod transfer;

pub use config::{ScannerConfig, WalletRole};
pub use rpc::{LedgerRpc, RpcClient, RpcError};
pub use scanner::Scanner;
pub use transfer::{MatchedTransfer, ScanDirection};
