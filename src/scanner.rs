//! The per-wallet scan loop.
//!
//! One scan walks a single page of recent signatures, newest first, fetching
//! each transaction in turn and comparing the wallet's balance delta against
//! the tolerance window. The first transfer inside the window wins; the scan
//! is hunting one specific payout or entry, not auditing the history, so
//! stopping early both matches intent and bounds RPC cost.

use tracing::{debug, info};

use crate::config::ScannerConfig;
use crate::rpc::{LedgerRpc, RpcError};
use crate::transfer::{
    format_block_time, lamports_to_sol, MatchedTransfer, ScanDirection, UNKNOWN,
};

/// Amount-matching scanner over one wallet's recent history.
pub struct Scanner<R: LedgerRpc> {
    rpc: R,
    tolerance: f64,
}

impl<R: LedgerRpc> Scanner<R> {
    /// Take ownership of the RPC session for the duration of one scan; the
    /// session is released when the scanner is dropped.
    pub fn new(rpc: R, config: &ScannerConfig) -> Self {
        Self {
            rpc,
            tolerance: config.amount_tolerance,
        }
    }

    /// Scan up to `tx_limit` recent transactions of `wallet` for a balance
    /// change of `target_amount` SOL (within tolerance, inclusive) in the
    /// given direction.
    ///
    /// Returns at most one match: the most recent transfer inside the
    /// window. RPC failures abort the scan and propagate unmodified; an
    /// empty result means the history held no such transfer, which is not
    /// an error.
    pub async fn scan(
        &self,
        wallet: &str,
        target_amount: f64,
        tx_limit: usize,
        direction: ScanDirection,
    ) -> Result<Vec<MatchedTransfer>, RpcError> {
        let min_amount = target_amount - self.tolerance;
        let max_amount = target_amount + self.tolerance;
        let mut matches = Vec::new();

        let signatures = self.rpc.get_signatures(wallet, tx_limit).await?;
        info!(wallet, count = signatures.len(), "fetched signature page");

        for sig_info in &signatures {
            let signature = sig_info.signature.as_str();

            let record = match self.rpc.get_transaction(signature).await? {
                Some(record) => record,
                None => {
                    debug!(signature, "node has no record, skipping");
                    continue;
                }
            };

            if record.is_failed() {
                debug!(signature, "failed on-chain, skipping");
                continue;
            }

            let index = match record.account_index(wallet) {
                Some(index) => index,
                None => {
                    debug!(signature, "wallet not among top-level accounts, skipping");
                    continue;
                }
            };

            let (pre, post) = match record.balances_at(index) {
                Some(balances) => balances,
                None => {
                    debug!(signature, index, "balance arrays too short, skipping");
                    continue;
                }
            };

            let amount = lamports_to_sol(direction.delta_lamports(pre, post));
            if amount < min_amount || amount > max_amount {
                continue;
            }

            let counterparty = record.counterparty(wallet).unwrap_or(UNKNOWN).to_string();
            info!(signature, amount, %counterparty, "found matching transfer");

            matches.push(MatchedTransfer {
                signature: signature.to_string(),
                timestamp: format_block_time(record.block_time),
                amount,
                counterparty,
            });
            // First (most recent) match wins.
            break;
        }

        Ok(matches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::{
        AccountKey, SignatureInfo, TransactionMessage, TransactionMeta, TransactionPayload,
        TransactionRecord,
    };
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Canned ledger: a signature page plus per-signature records, counting
    /// transaction fetches so tests can assert the scan stopped early.
    struct StubLedger {
        signatures: Vec<SignatureInfo>,
        records: HashMap<String, TransactionRecord>,
        tx_fetches: Arc<AtomicUsize>,
        fail_transactions: bool,
    }

    impl StubLedger {
        fn new(entries: Vec<(&str, TransactionRecord)>) -> (Self, Arc<AtomicUsize>) {
            let tx_fetches = Arc::new(AtomicUsize::new(0));
            let stub = Self {
                signatures: entries
                    .iter()
                    .map(|(sig, _)| sig_info(sig))
                    .collect(),
                records: entries
                    .into_iter()
                    .map(|(sig, record)| (sig.to_string(), record))
                    .collect(),
                tx_fetches: tx_fetches.clone(),
                fail_transactions: false,
            };
            (stub, tx_fetches)
        }
    }

    #[async_trait]
    impl LedgerRpc for StubLedger {
        async fn get_signatures(
            &self,
            _address: &str,
            limit: usize,
        ) -> Result<Vec<SignatureInfo>, RpcError> {
            Ok(self.signatures.iter().take(limit).cloned().collect())
        }

        async fn get_transaction(
            &self,
            signature: &str,
        ) -> Result<Option<TransactionRecord>, RpcError> {
            self.tx_fetches.fetch_add(1, Ordering::SeqCst);
            if self.fail_transactions {
                return Err(RpcError::Unauthorized);
            }
            Ok(self.records.get(signature).cloned())
        }
    }

    fn sig_info(signature: &str) -> SignatureInfo {
        SignatureInfo {
            signature: signature.to_string(),
            err: None,
            block_time: Some(1_700_000_000),
        }
    }

    fn record(accounts: &[&str], pre: &[u64], post: &[u64]) -> TransactionRecord {
        TransactionRecord {
            block_time: Some(1_700_000_000),
            meta: TransactionMeta {
                err: None,
                pre_balances: pre.to_vec(),
                post_balances: post.to_vec(),
            },
            transaction: TransactionPayload {
                message: TransactionMessage {
                    account_keys: accounts
                        .iter()
                        .map(|pubkey| AccountKey {
                            pubkey: pubkey.to_string(),
                        })
                        .collect(),
                },
            },
        }
    }

    fn failed_record(accounts: &[&str], pre: &[u64], post: &[u64]) -> TransactionRecord {
        let mut record = record(accounts, pre, post);
        record.meta.err = Some(json!({"InstructionError": [0, "Custom"]}));
        record
    }

    fn scanner(stub: StubLedger) -> Scanner<StubLedger> {
        Scanner::new(stub, &ScannerConfig::default())
    }

    const SOL: u64 = 1_000_000_000;

    #[tokio::test]
    async fn test_empty_signature_page_fetches_nothing() {
        let (stub, fetches) = StubLedger::new(vec![]);
        let matches = scanner(stub)
            .scan("W", 1.0, 75, ScanDirection::Payout)
            .await
            .unwrap();
        assert!(matches.is_empty());
        assert_eq!(fetches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_payout_match_identifies_counterparty() {
        let (stub, _) = StubLedger::new(vec![("sig1", record(&["W", "X"], &[SOL, 0], &[0, SOL]))]);
        let matches = scanner(stub)
            .scan("W", 1.0, 75, ScanDirection::Payout)
            .await
            .unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].amount, 1.0);
        assert_eq!(matches[0].counterparty, "X");
        assert_eq!(matches[0].signature, "sig1");
        assert_eq!(matches[0].timestamp, "2023-11-14 22:13:20");
    }

    #[tokio::test]
    async fn test_direction_is_not_symmetric() {
        // Wallet balance increased by exactly 5.0: a deposit, not a payout.
        let entries = || vec![("sig1", record(&["W", "X"], &[0, 5 * SOL], &[5 * SOL, 0]))];

        let (stub, _) = StubLedger::new(entries());
        let deposits = scanner(stub)
            .scan("W", 5.0, 75, ScanDirection::Deposit)
            .await
            .unwrap();
        assert_eq!(deposits.len(), 1);
        assert_eq!(deposits[0].amount, 5.0);

        let (stub, _) = StubLedger::new(entries());
        let payouts = scanner(stub)
            .scan("W", 5.0, 75, ScanDirection::Payout)
            .await
            .unwrap();
        assert!(payouts.is_empty());
    }

    #[tokio::test]
    async fn test_stops_at_first_match() {
        let (stub, fetches) = StubLedger::new(vec![
            ("newest", record(&["W", "X"], &[SOL, 0], &[0, SOL])),
            ("older", record(&["W", "Y"], &[SOL, 0], &[0, SOL])),
        ]);
        let matches = scanner(stub)
            .scan("W", 1.0, 75, ScanDirection::Payout)
            .await
            .unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].signature, "newest");
        // The older matching transaction was never fetched.
        assert_eq!(fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_transaction_never_matches() {
        let (stub, _) = StubLedger::new(vec![
            ("bad", failed_record(&["W", "X"], &[SOL, 0], &[0, SOL])),
            ("good", record(&["W", "Y"], &[SOL, 0], &[0, SOL])),
        ]);
        let matches = scanner(stub)
            .scan("W", 1.0, 75, ScanDirection::Payout)
            .await
            .unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].counterparty, "Y");
    }

    #[tokio::test]
    async fn test_tolerance_window_is_inclusive() {
        // 1.01 SOL is exactly on the upper edge of target 1.0 +/- 0.01.
        let (stub, _) = StubLedger::new(vec![(
            "edge",
            record(&["W", "X"], &[1_010_000_000, 0], &[0, 1_010_000_000]),
        )]);
        let matches = scanner(stub)
            .scan("W", 1.0, 75, ScanDirection::Payout)
            .await
            .unwrap();
        assert_eq!(matches.len(), 1);

        // 0.99 SOL sits on the lower edge.
        let (stub, _) = StubLedger::new(vec![(
            "edge",
            record(&["W", "X"], &[990_000_000, 0], &[0, 990_000_000]),
        )]);
        let matches = scanner(stub)
            .scan("W", 1.0, 75, ScanDirection::Payout)
            .await
            .unwrap();
        assert_eq!(matches.len(), 1);
    }

    #[tokio::test]
    async fn test_out_of_window_deltas_do_not_match() {
        let (stub, _) = StubLedger::new(vec![
            ("high", record(&["W", "X"], &[1_020_000_000, 0], &[0, 1_020_000_000])),
            ("low", record(&["W", "X"], &[980_000_000, 0], &[0, 980_000_000])),
        ]);
        let matches = scanner(stub)
            .scan("W", 1.0, 75, ScanDirection::Payout)
            .await
            .unwrap();
        assert!(matches.is_empty());
    }

    #[tokio::test]
    async fn test_skips_records_that_do_not_involve_the_wallet() {
        let (stub, _) = StubLedger::new(vec![
            ("foreign", record(&["A", "B"], &[SOL, 0], &[0, SOL])),
            ("ours", record(&["W", "X"], &[SOL, 0], &[0, SOL])),
        ]);
        let matches = scanner(stub)
            .scan("W", 1.0, 75, ScanDirection::Payout)
            .await
            .unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].signature, "ours");
    }

    #[tokio::test]
    async fn test_skips_missing_records_and_short_balance_arrays() {
        let mut entries = vec![
            ("truncated", record(&["X", "W"], &[0], &[0])),
            ("ours", record(&["W", "X"], &[SOL, 0], &[0, SOL])),
        ];
        // "pruned" has a signature entry but no record on the node.
        entries.insert(0, ("pruned", record(&[], &[], &[])));
        let (mut stub, _) = StubLedger::new(entries);
        stub.records.remove("pruned");

        let matches = scanner(stub)
            .scan("W", 1.0, 75, ScanDirection::Payout)
            .await
            .unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].signature, "ours");
    }

    #[tokio::test]
    async fn test_counterparty_falls_back_to_unknown() {
        let (stub, _) = StubLedger::new(vec![("solo", record(&["W"], &[SOL], &[0]))]);
        let matches = scanner(stub)
            .scan("W", 1.0, 75, ScanDirection::Payout)
            .await
            .unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].counterparty, UNKNOWN);
    }

    #[tokio::test]
    async fn test_rpc_failure_aborts_the_scan() {
        let (mut stub, _) = StubLedger::new(vec![(
            "sig1",
            record(&["W", "X"], &[SOL, 0], &[0, SOL]),
        )]);
        stub.fail_transactions = true;
        let result = scanner(stub).scan("W", 1.0, 75, ScanDirection::Payout).await;
        assert!(matches!(result, Err(RpcError::Unauthorized)));
    }

    #[tokio::test]
    async fn test_rescan_is_idempotent() {
        let entries = || {
            vec![
                ("miss", record(&["W", "X"], &[2 * SOL, 0], &[0, 2 * SOL])),
                ("hit", record(&["W", "X"], &[SOL, 0], &[0, SOL])),
            ]
        };
        let (stub, _) = StubLedger::new(entries());
        let scanner_one = scanner(stub);
        let first = scanner_one
            .scan("W", 1.0, 75, ScanDirection::Payout)
            .await
            .unwrap();
        let second = scanner_one
            .scan("W", 1.0, 75, ScanDirection::Payout)
            .await
            .unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_limit_bounds_the_page() {
        let (stub, fetches) = StubLedger::new(vec![
            ("a", record(&["W", "X"], &[2 * SOL, 0], &[0, 2 * SOL])),
            ("b", record(&["W", "X"], &[2 * SOL, 0], &[0, 2 * SOL])),
            ("c", record(&["W", "X"], &[SOL, 0], &[0, SOL])),
        ]);
        // A page of 2 never reaches the matching third entry.
        let matches = scanner(stub)
            .scan("W", 1.0, 2, ScanDirection::Payout)
            .await
            .unwrap();
        assert!(matches.is_empty());
        assert_eq!(fetches.load(Ordering::SeqCst), 2);
    }
}
