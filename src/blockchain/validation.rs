use super::pow::valid_proof;
use super::{Block, hash_block};
use crate::error::{ChainError, Result};

/// Walk `chain` checking index sequence, hash linkage and proof of work.
///
/// Pure: used both to re-check the local chain and on untrusted peer data.
pub fn validate_chain(chain: &[Block], difficulty: u32) -> Result<()> {
    let first = chain.first().ok_or(ChainError::EmptyChain)?;
    if first.index != 1 {
        return Err(ChainError::IndexMismatch {
            position: 0,
            index: first.index,
        });
    }

    for (position, pair) in chain.windows(2).enumerate() {
        let (prev, block) = (&pair[0], &pair[1]);
        let position = position + 1;

        if block.index != position as u64 + 1 {
            return Err(ChainError::IndexMismatch {
                position,
                index: block.index,
            });
        }

        let prev_hash = hash_block(prev);
        if block.previous_hash != prev_hash {
            return Err(ChainError::BrokenLink { index: block.index });
        }

        if !valid_proof(prev.proof, block.proof, &prev_hash, difficulty) {
            return Err(ChainError::InvalidProof { index: block.index });
        }
    }

    Ok(())
}

pub fn is_valid_chain(chain: &[Block], difficulty: u32) -> bool {
    validate_chain(chain, difficulty).is_ok()
}
