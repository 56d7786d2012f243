//! In-process stand-ins for peers, used by tests.

use std::collections::HashMap;
use std::time::Duration;

use super::consensus::{ChainFetcher, FetchFuture, PeerChain};
use crate::blockchain::pow::proof_of_work;
use crate::blockchain::{Block, Ledger};
use crate::error::ChainError;

#[derive(Clone)]
pub enum MockReply {
    Chain(PeerChain),
    Unreachable,
    /// Never answers within any reasonable timeout.
    Hang,
}

impl MockReply {
    pub fn chain(chain: Vec<Block>) -> Self {
        Self::Chain(PeerChain {
            length: chain.len(),
            chain,
        })
    }
}

#[derive(Default)]
pub struct MockFetcher {
    replies: HashMap<String, MockReply>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, peer: &str, reply: MockReply) -> Self {
        self.replies.insert(peer.to_string(), reply);
        self
    }
}

impl ChainFetcher for MockFetcher {
    fn fetch_chain<'a>(&'a self, peer: &'a str) -> FetchFuture<'a> {
        Box::pin(async move {
            match self.replies.get(peer) {
                Some(MockReply::Chain(remote)) => Ok(remote.clone()),
                Some(MockReply::Hang) => {
                    tokio::time::sleep(Duration::from_secs(60)).await;
                    Err(ChainError::unreachable(peer, "hung"))
                }
                Some(MockReply::Unreachable) | None => {
                    Err(ChainError::unreachable(peer, "connection refused"))
                }
            }
        })
    }
}

/// A valid chain of `len` blocks (genesis included).
pub fn mined_chain(len: usize, difficulty: u32) -> Vec<Block> {
    let mut ledger = Ledger::new();
    for i in 1..len {
        ledger
            .new_transaction("miner", "peer", &i.to_string())
            .expect("numeric amount");
        let found = proof_of_work(ledger.last_block(), difficulty);
        ledger.new_block(found.proof, None);
    }
    ledger.chain().to_vec()
}
