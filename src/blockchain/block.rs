use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::hash::hash_block;
use crate::transaction::{Transaction, UserRecord};

/// `previous_hash` carried by the genesis block.
pub const GENESIS_PREVIOUS_HASH: &str = "1";

/// Proof stored in the genesis block.
pub const GENESIS_PROOF: u64 = 100;

/// A single block in the chain holding the transactions and user
/// registrations that were pending when it was sealed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub index: u64,
    pub timestamp: f64, // seconds since the Unix epoch (UTC)
    pub transactions: Vec<Transaction>,
    #[serde(rename = "user")]
    pub users: Vec<UserRecord>,
    pub proof: u64,
    pub previous_hash: String,
}

impl Block {
    /// Create the genesis block (first block in the chain).
    pub fn genesis() -> Self {
        Self::new(
            1,
            Vec::new(),
            Vec::new(),
            GENESIS_PROOF,
            GENESIS_PREVIOUS_HASH.to_string(),
        )
    }

    /// Create a block stamped with the current time.
    pub fn new(
        index: u64,
        transactions: Vec<Transaction>,
        users: Vec<UserRecord>,
        proof: u64,
        previous_hash: String,
    ) -> Self {
        Self {
            index,
            timestamp: now_secs(),
            transactions,
            users,
            proof,
            previous_hash,
        }
    }

    /// SHA-256 of the canonical JSON form of this block.
    pub fn hash(&self) -> String {
        hash_block(self)
    }
}

fn now_secs() -> f64 {
    Utc::now().timestamp_micros() as f64 / 1_000_000.0
}
