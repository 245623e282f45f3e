//! Wire types for `getSignaturesForAddress` and `getTransaction`.
//!
//! Mirrors the `jsonParsed` response shapes. Every nested field defaults,
//! so a pruned or oddly-shaped record deserializes to something the scanner
//! skips instead of failing the whole scan.

use serde::Deserialize;
use serde_json::Value;

/// One entry of a `getSignaturesForAddress` page, newest first.
#[derive(Debug, Clone, Deserialize)]
pub struct SignatureInfo {
    pub signature: String,
    /// On-chain execution error, if the transaction failed.
    #[serde(default)]
    pub err: Option<Value>,
    #[serde(rename = "blockTime", default)]
    pub block_time: Option<i64>,
}

/// A fetched transaction in `jsonParsed` encoding.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransactionRecord {
    #[serde(rename = "blockTime", default)]
    pub block_time: Option<i64>,
    #[serde(default)]
    pub meta: TransactionMeta,
    #[serde(default)]
    pub transaction: TransactionPayload,
}

/// Execution metadata: status plus the native balance snapshots.
///
/// `pre_balances` and `post_balances` are index-aligned with the message's
/// `account_keys`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransactionMeta {
    #[serde(default)]
    pub err: Option<Value>,
    #[serde(rename = "preBalances", default)]
    pub pre_balances: Vec<u64>,
    #[serde(rename = "postBalances", default)]
    pub post_balances: Vec<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransactionPayload {
    #[serde(default)]
    pub message: TransactionMessage,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransactionMessage {
    #[serde(rename = "accountKeys", default)]
    pub account_keys: Vec<AccountKey>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AccountKey {
    pub pubkey: String,
}

impl TransactionRecord {
    /// Whether the transaction failed on-chain. Balance deltas in a failed
    /// transaction are not meaningful transfers.
    pub fn is_failed(&self) -> bool {
        self.meta.err.is_some()
    }

    /// Position of `wallet` in the account list, if it was a top-level
    /// account of this transaction.
    pub fn account_index(&self, wallet: &str) -> Option<usize> {
        self.transaction
            .message
            .account_keys
            .iter()
            .position(|key| key.pubkey == wallet)
    }

    /// Pre/post native balance pair for the account at `index`.
    ///
    /// Returns `None` when either balance array is shorter than the account
    /// list claims; such a record is skipped, not an error.
    pub fn balances_at(&self, index: usize) -> Option<(u64, u64)> {
        let pre = *self.meta.pre_balances.get(index)?;
        let post = *self.meta.post_balances.get(index)?;
        Some((pre, post))
    }

    /// First account that is not `wallet` — the best-effort counterparty.
    pub fn counterparty(&self, wallet: &str) -> Option<&str> {
        self.transaction
            .message
            .account_keys
            .iter()
            .map(|key| key.pubkey.as_str())
            .find(|pubkey| *pubkey != wallet)
    }
}
