use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use tokio::task::JoinSet;

use crate::blockchain::{Block, validate_chain};
use crate::error::{ChainError, Result};

/// What a peer reports from its chain endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerChain {
    pub length: usize,
    pub chain: Vec<Block>,
}

pub type FetchFuture<'a> = Pin<Box<dyn Future<Output = Result<PeerChain>> + Send + 'a>>;

/// Remote read of a peer's chain. Any failure is reported as
/// `ChainError::PeerUnreachable`.
pub trait ChainFetcher: Send + Sync {
    fn fetch_chain<'a>(&'a self, peer: &'a str) -> FetchFuture<'a>;
}

/// Fetches `GET http://{peer}/api/v1/chain/` from other nodes.
#[derive(Debug, Clone, Default)]
pub struct HttpChainFetcher {
    client: reqwest::Client,
}

impl HttpChainFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    fn chain_url(peer: &str) -> String {
        format!("http://{peer}/api/v1/chain/")
    }
}

impl ChainFetcher for HttpChainFetcher {
    fn fetch_chain<'a>(&'a self, peer: &'a str) -> FetchFuture<'a> {
        Box::pin(async move {
            let resp = self
                .client
                .get(Self::chain_url(peer))
                .send()
                .await
                .map_err(|e| ChainError::unreachable(peer, e))?;

            let status = resp.status();
            if !status.is_success() {
                return Err(ChainError::unreachable(peer, format!("HTTP {status}")));
            }

            resp.json::<PeerChain>()
                .await
                .map_err(|e| ChainError::unreachable(peer, e))
        })
    }
}

/// A peer chain that beat the local one.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub peer: String,
    pub chain: Vec<Block>,
}

/// Longest-valid-chain rule.
///
/// All `peers` are fetched concurrently, each bounded by `timeout`. Once
/// every fetch has finished, reports are examined in the order `peers` were
/// given: a peer wins if its chain is longer than the best seen so far
/// (starting at `local_len`) and validates. Equal lengths keep the earlier
/// peer. Peers that fail, time out or send an invalid chain are skipped.
pub async fn resolve_conflicts(
    local_len: usize,
    peers: Vec<String>,
    fetcher: Arc<dyn ChainFetcher>,
    timeout: Duration,
    difficulty: u32,
) -> Option<Candidate> {
    let reports = fetch_all(peers, fetcher, timeout).await;
    select_longest(local_len, reports, difficulty)
}

async fn fetch_all(
    peers: Vec<String>,
    fetcher: Arc<dyn ChainFetcher>,
    timeout: Duration,
) -> Vec<(String, Result<PeerChain>)> {
    let mut set = JoinSet::new();
    for (order, peer) in peers.into_iter().enumerate() {
        let fetcher = Arc::clone(&fetcher);
        set.spawn(async move {
            let result = match tokio::time::timeout(timeout, fetcher.fetch_chain(&peer)).await {
                Ok(result) => result,
                Err(_) => Err(ChainError::unreachable(
                    peer.as_str(),
                    format!("no answer within {timeout:?}"),
                )),
            };
            (order, peer, result)
        });
    }

    let mut reports = Vec::with_capacity(set.len());
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok(report) => reports.push(report),
            Err(e) => warn!("CONSENSUS - fetch task failed: {e}"),
        }
    }
    reports.sort_by_key(|(order, _, _)| *order);
    reports
        .into_iter()
        .map(|(_, peer, result)| (peer, result))
        .collect()
}

/// Pick the longest valid chain among `reports`, or `None` if no peer beats
/// `local_len`.
pub fn select_longest(
    local_len: usize,
    reports: Vec<(String, Result<PeerChain>)>,
    difficulty: u32,
) -> Option<Candidate> {
    let mut max_length = local_len;
    let mut best = None;

    for (peer, report) in reports {
        let remote = match report {
            Ok(remote) => remote,
            Err(e) => {
                warn!("CONSENSUS - skipping {peer}: {e}");
                continue;
            }
        };

        if remote.length <= max_length {
            debug!(
                "CONSENSUS - {peer} reports length {} (best so far {max_length})",
                remote.length
            );
            continue;
        }

        if let Err(e) = check_candidate(&remote, difficulty) {
            warn!("CONSENSUS - rejecting chain from {peer}: {e}");
            continue;
        }

        info!("CONSENSUS - {peer} offers a valid chain of length {}", remote.length);
        max_length = remote.length;
        best = Some(Candidate {
            peer,
            chain: remote.chain,
        });
    }

    best
}

fn check_candidate(remote: &PeerChain, difficulty: u32) -> Result<()> {
    if remote.length != remote.chain.len() {
        return Err(ChainError::ChainInvalid(format!(
            "reported length {} but sent {} blocks",
            remote.length,
            remote.chain.len()
        )));
    }
    validate_chain(&remote.chain, difficulty).map_err(|e| ChainError::ChainInvalid(e.to_string()))
}
