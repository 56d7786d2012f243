use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use log::{debug, warn};
use tokio::task::JoinHandle;

use super::Block;
use super::hash::sha256_hex;

/// How many candidates are tried between two looks at the cancel flag.
const CANCEL_CHECK_INTERVAL: u64 = 1024;

/// A proof that satisfies the difficulty predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MinedProof {
    pub proof: u64,
    /// Number of candidates tested, including the winning one.
    pub attempts: u64,
}

/// Check a claimed proof: `sha256("{last_proof}{proof}{last_hash}")`
/// must start with `difficulty` zero hex digits.
pub fn valid_proof(last_proof: u64, proof: u64, last_hash: &str, difficulty: u32) -> bool {
    let guess = format!("{last_proof}{proof}{last_hash}");
    let digest = sha256_hex(guess.as_bytes());
    let zeros = difficulty as usize;
    digest.len() >= zeros && digest.bytes().take(zeros).all(|b| b == b'0')
}

/// Search for a proof, starting at 0 and counting up.
///
/// Returns `None` if `cancel` is raised before a proof is found.
pub fn mine(
    last_proof: u64,
    last_hash: &str,
    difficulty: u32,
    cancel: &AtomicBool,
) -> Option<MinedProof> {
    let mut proof: u64 = 0;
    loop {
        if proof % CANCEL_CHECK_INTERVAL == 0 && cancel.load(Ordering::Acquire) {
            debug!("POW - search cancelled after {proof} attempts");
            return None;
        }
        if valid_proof(last_proof, proof, last_hash, difficulty) {
            return Some(MinedProof {
                proof,
                attempts: proof + 1,
            });
        }
        proof = proof.wrapping_add(1);
    }
}

/// Blocking, uncancellable search for a proof following `last_block`.
pub fn proof_of_work(last_block: &Block, difficulty: u32) -> MinedProof {
    let never = AtomicBool::new(false);
    match mine(last_block.proof, &last_block.hash(), difficulty, &never) {
        Some(found) => found,
        None => unreachable!("search without a cancel signal always finds a proof"),
    }
}

/// How a mining job ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MiningOutcome {
    Found(MinedProof),
    Cancelled,
}

/// A proof search running on the blocking thread pool.
pub struct MiningJob {
    cancel: Arc<AtomicBool>,
    task: JoinHandle<Option<MinedProof>>,
}

impl MiningJob {
    /// Start searching for a proof following (`last_proof`, `last_hash`).
    pub fn spawn(last_proof: u64, last_hash: String, difficulty: u32) -> Self {
        let cancel = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&cancel);
        let task = tokio::task::spawn_blocking(move || {
            mine(last_proof, &last_hash, difficulty, &flag)
        });
        Self { cancel, task }
    }

    /// Flag shared with the search; raising it stops the job.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Release);
    }

    /// Wait for the search to finish.
    pub async fn join(self) -> MiningOutcome {
        match self.task.await {
            Ok(Some(found)) => MiningOutcome::Found(found),
            Ok(None) => MiningOutcome::Cancelled,
            Err(e) => {
                warn!("POW - mining task failed: {e}");
                MiningOutcome::Cancelled
            }
        }
    }
}
