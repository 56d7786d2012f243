use thiserror::Error;

/// Errors raised by the ledger core.
#[derive(Debug, Error)]
pub enum ChainError {
    #[error("invalid node address: {0:?}")]
    InvalidAddress(String),

    #[error("invalid amount: {0:?}")]
    InvalidAmount(String),

    #[error("peer {peer} unreachable: {reason}")]
    PeerUnreachable { peer: String, reason: String },

    #[error("invalid chain: {0}")]
    ChainInvalid(String),

    #[error("chain has no blocks")]
    EmptyChain,

    #[error("block #{index} does not link to the hash of its predecessor")]
    BrokenLink { index: u64 },

    #[error("block #{index} carries an invalid proof of work")]
    InvalidProof { index: u64 },

    #[error("block at position {position} has index {index}")]
    IndexMismatch { position: usize, index: u64 },
}

impl ChainError {
    pub fn unreachable(peer: impl Into<String>, reason: impl ToString) -> Self {
        Self::PeerUnreachable {
            peer: peer.into(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ChainError>;
