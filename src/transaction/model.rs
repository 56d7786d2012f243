use serde::{Deserialize, Serialize};

use crate::error::{ChainError, Result};

/// A value transfer waiting in (or sealed into) a block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub sender: String,
    pub recipient: String,
    pub amount: f64,
}

impl Transaction {
    /// Build a transaction, coercing the raw `amount` into a finite number.
    pub fn new(sender: &str, recipient: &str, amount: &str) -> Result<Self> {
        Ok(Self {
            sender: sender.to_string(),
            recipient: recipient.to_string(),
            amount: parse_amount(amount)?,
        })
    }
}

/// A user registration recorded on chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: u64,
    pub name: String,
    pub surname: String,
    pub email: String,
}

/// Parse an amount as submitted by a client. NaN and infinities are
/// rejected since they cannot be carried through JSON.
pub fn parse_amount(raw: &str) -> Result<f64> {
    let trimmed = raw.trim();
    match trimmed.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(ChainError::InvalidAmount(raw.to_string())),
    }
}
