use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use log::{debug, info, warn};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::blockchain::pow::MinedProof;
use crate::blockchain::{Block, Ledger, MiningJob, MiningOutcome, Reassigned, is_valid_chain};
use crate::config::Config;
use crate::error::Result;
use crate::network::{self, ChainFetcher, HttpChainFetcher, PeerRegistry};
use crate::transaction::{Transaction, UserRecord};

/// Result of a mining request.
#[derive(Debug, Clone)]
pub enum MineOutcome {
    Sealed { block: Block, attempts: u64 },
    /// The job was cancelled before it found a proof.
    Cancelled,
    /// A proof was found but the chain tip moved in the meantime.
    Superseded,
}

/// Result of a conflict-resolution round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    NoChange,
    Replaced {
        peer: String,
        length: usize,
        /// Pending users whose ids were already taken on the adopted chain.
        reassigned: Vec<Reassigned>,
    },
}

/// One ledger node: the chain with its pending pools, the known peers and
/// the mining jobs in flight.
///
/// Every mutation of the chain (sealing a block or adopting a peer's chain)
/// happens under the ledger's write lock.
pub struct Node {
    id: Uuid,
    difficulty: u32,
    peer_timeout: Duration,
    ledger: RwLock<Ledger>,
    peers: RwLock<PeerRegistry>,
    fetcher: Arc<dyn ChainFetcher>,
    mining: Mutex<HashMap<Uuid, Arc<AtomicBool>>>,
}

impl Node {
    pub fn new(config: &Config) -> Self {
        Self::with_fetcher(
            config.difficulty,
            config.peer_timeout,
            Arc::new(HttpChainFetcher::new()),
        )
    }

    pub fn with_fetcher(
        difficulty: u32,
        peer_timeout: Duration,
        fetcher: Arc<dyn ChainFetcher>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            difficulty,
            peer_timeout,
            ledger: RwLock::new(Ledger::new()),
            peers: RwLock::new(PeerRegistry::new()),
            fetcher,
            mining: Mutex::new(HashMap::new()),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn difficulty(&self) -> u32 {
        self.difficulty
    }

    /// Shared access to the ledger, for readers that serialize in place.
    pub fn ledger(&self) -> &RwLock<Ledger> {
        &self.ledger
    }

    pub async fn new_transaction(&self, sender: &str, recipient: &str, amount: &str) -> Result<u64> {
        let mut ledger = self.ledger.write().await;
        let index = ledger.new_transaction(sender, recipient, amount)?;
        debug!("NODE - queued transaction {sender} -> {recipient} for block #{index}");
        Ok(index)
    }

    /// Queue a user registration; returns `(block index, user id)`.
    ///
    /// The id is kept when a peer's chain is adopted, unless that chain
    /// already holds a user with the same id. Such a user is moved to a fresh
    /// id and listed in [`Resolution::Replaced`].
    pub async fn new_user(&self, name: &str, surname: &str, email: &str) -> (u64, u64) {
        let mut ledger = self.ledger.write().await;
        let id = ledger.next_user_id();
        let index = ledger.new_user(name, surname, email);
        debug!("NODE - queued user #{id} for block #{index}");
        (index, id)
    }

    pub async fn pending(&self) -> (Vec<Transaction>, Vec<UserRecord>) {
        let ledger = self.ledger.read().await;
        (
            ledger.pending_transactions().to_vec(),
            ledger.pending_users().to_vec(),
        )
    }

    pub async fn is_valid(&self) -> bool {
        let ledger = self.ledger.read().await;
        is_valid_chain(ledger.chain(), self.difficulty)
    }

    /// Mine a proof on top of the current tip and seal the pending pools.
    ///
    /// The search runs off the async executor and can be stopped with
    /// [`Node::cancel_mining`]. Pending pools are only touched when the
    /// block is sealed.
    pub async fn mine(&self) -> MineOutcome {
        let (last_proof, last_hash) = self.tip().await;

        let job = MiningJob::spawn(last_proof, last_hash.clone(), self.difficulty);
        let guard = self.track(job.cancel_flag());
        info!("MINER - job {} started on top of {}", guard.id, last_hash);
        let outcome = job.join().await;
        drop(guard);

        match outcome {
            MiningOutcome::Found(found) => self.seal(found, last_hash).await,
            MiningOutcome::Cancelled => {
                info!("MINER - job cancelled, pending pools kept");
                MineOutcome::Cancelled
            }
        }
    }

    async fn tip(&self) -> (u64, String) {
        let ledger = self.ledger.read().await;
        let last = ledger.last_block();
        (last.proof, last.hash())
    }

    /// Seal the pools with a proof found on top of `last_hash`, unless the
    /// tip has moved since.
    async fn seal(&self, found: MinedProof, last_hash: String) -> MineOutcome {
        let mut ledger = self.ledger.write().await;
        if ledger.last_block().hash() != last_hash {
            warn!(
                "MINER - proof {} is stale, chain tip moved while mining",
                found.proof
            );
            return MineOutcome::Superseded;
        }
        let block = ledger.new_block(found.proof, Some(last_hash)).clone();
        info!(
            "MINER - sealed block #{} (proof={}, attempts={})",
            block.index, found.proof, found.attempts
        );
        MineOutcome::Sealed {
            block,
            attempts: found.attempts,
        }
    }

    /// Stop every mining job in flight; returns how many were signalled.
    pub fn cancel_mining(&self) -> usize {
        let jobs = self.mining.lock().expect("mutex poisoned");
        for flag in jobs.values() {
            flag.store(true, Ordering::Release);
        }
        jobs.len()
    }

    pub async fn register_node(&self, address: &str) -> Result<String> {
        let mut peers = self.peers.write().await;
        let node = peers.register_node(address)?;
        info!("PEERS - registered {node} ({} known)", peers.len());
        Ok(node)
    }

    /// Register every address or none of them.
    pub async fn register_nodes(&self, addresses: &[String]) -> Result<Vec<String>> {
        let mut peers = self.peers.write().await;
        let nodes = peers.register_nodes(addresses)?;
        info!("PEERS - registered {} ({} known)", nodes.join(", "), peers.len());
        Ok(nodes)
    }

    pub async fn peers(&self) -> Vec<String> {
        self.peers.read().await.nodes()
    }

    /// Adopt the longest valid chain among the peers if it beats ours.
    ///
    /// No lock is held while peers are queried. The swap re-checks length
    /// under the write lock. Mining jobs building on the discarded chain are
    /// signalled before the lock is released.
    pub async fn resolve_conflicts(&self) -> Resolution {
        let local_len = self.ledger.read().await.len();
        let peers = self.peers().await;
        debug!("CONSENSUS - asking {} peers, local length {local_len}", peers.len());

        let Some(candidate) = network::resolve_conflicts(
            local_len,
            peers,
            Arc::clone(&self.fetcher),
            self.peer_timeout,
            self.difficulty,
        )
        .await
        else {
            info!("CONSENSUS - our chain is authoritative");
            return Resolution::NoChange;
        };

        let mut ledger = self.ledger.write().await;
        let length = candidate.chain.len();
        if length <= ledger.len() {
            info!("CONSENSUS - local chain grew to {} meanwhile, keeping it", ledger.len());
            return Resolution::NoChange;
        }
        let reassigned = match ledger.replace_chain(candidate.chain, self.difficulty) {
            Ok(reassigned) => reassigned,
            Err(e) => {
                warn!("CONSENSUS - chain from {} rejected at swap: {e}", candidate.peer);
                return Resolution::NoChange;
            }
        };
        let cancelled = self.cancel_mining();
        drop(ledger);

        info!(
            "CONSENSUS - replaced chain with {length} blocks from {} ({cancelled} mining jobs cancelled)",
            candidate.peer
        );
        for r in &reassigned {
            warn!("CONSENSUS - pending user #{} was taken on the new chain, now #{}", r.from, r.to);
        }
        Resolution::Replaced {
            peer: candidate.peer,
            length,
            reassigned,
        }
    }

    fn track(&self, flag: Arc<AtomicBool>) -> JobGuard<'_> {
        let id = Uuid::new_v4();
        self.mining
            .lock()
            .expect("mutex poisoned")
            .insert(id, Arc::clone(&flag));
        JobGuard {
            node: self,
            id,
            flag,
        }
    }
}

/// Deregisters a mining job; if the waiting request goes away early the
/// job is stopped as well.
struct JobGuard<'a> {
    node: &'a Node,
    id: Uuid,
    flag: Arc<AtomicBool>,
}

impl Drop for JobGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(true, Ordering::Release);
        if let Ok(mut jobs) = self.node.mining.lock() {
            jobs.remove(&self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::hash_block;
    use crate::blockchain::pow::{mine, proof_of_work};
    use crate::network::mock::{MockFetcher, MockReply, mined_chain};

    const DIFFICULTY: u32 = 2;

    fn node_with(fetcher: MockFetcher) -> Node {
        Node::with_fetcher(DIFFICULTY, Duration::from_millis(300), Arc::new(fetcher))
    }

    async fn sealed(node: &Node) -> Block {
        match node.mine().await {
            MineOutcome::Sealed { block, .. } => block,
            other => panic!("expected a sealed block, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn end_to_end_register_transact_and_mine() {
        let node = node_with(MockFetcher::new());
        assert_eq!(node.ledger().read().await.len(), 1);

        node.register_node("192.168.0.5:5000").await.unwrap();
        assert_eq!(node.peers().await, vec!["192.168.0.5:5000"]);

        assert_eq!(node.new_transaction("A", "B", "10.5").await.unwrap(), 2);
        assert_eq!(node.pending().await.0.len(), 1);

        let block = sealed(&node).await;
        let ledger = node.ledger().read().await;
        assert_eq!(ledger.len(), 2);
        assert!(ledger.pending_transactions().is_empty());
        assert_eq!(block.previous_hash, hash_block(&ledger.chain()[0]));
        assert!(is_valid_chain(ledger.chain(), DIFFICULTY));
    }

    #[tokio::test]
    async fn invalid_input_surfaces_as_errors() {
        let node = node_with(MockFetcher::new());
        assert!(node.new_transaction("A", "B", "abc").await.is_err());
        assert!(node.register_node("http://").await.is_err());
        assert!(node.pending().await.0.is_empty());
        assert!(node.peers().await.is_empty());
    }

    #[tokio::test]
    async fn user_ids_are_reported() {
        let node = node_with(MockFetcher::new());
        assert_eq!(node.new_user("Ada", "Lovelace", "ada@x").await, (2, 1));
        assert_eq!(node.new_user("Alan", "Turing", "alan@x").await, (2, 2));
        sealed(&node).await;
        assert_eq!(node.new_user("Grace", "Hopper", "grace@x").await, (3, 3));
    }

    #[tokio::test]
    async fn cancelled_mining_keeps_pending_pools() {
        // No proof with 64 leading zeros will ever turn up.
        let node = Arc::new(Node::with_fetcher(
            64,
            Duration::from_millis(300),
            Arc::new(MockFetcher::new()),
        ));
        node.new_transaction("A", "B", "1").await.unwrap();

        let miner = {
            let node = Arc::clone(&node);
            tokio::spawn(async move { node.mine().await })
        };
        while node.cancel_mining() == 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        assert!(matches!(miner.await.unwrap(), MineOutcome::Cancelled));
        assert_eq!(node.pending().await.0.len(), 1);
        assert_eq!(node.ledger().read().await.len(), 1);
        assert_eq!(node.cancel_mining(), 0);
    }

    #[tokio::test]
    async fn resolve_adopts_longer_valid_chain() {
        let remote = mined_chain(5, DIFFICULTY);
        let mut forged = mined_chain(7, DIFFICULTY);
        forged[6].proof += 1;
        forged[2].transactions[0].amount = 1_000.0;

        let node = node_with(
            MockFetcher::new()
                .with("10.0.0.1:5000", MockReply::chain(remote.clone()))
                .with("10.0.0.2:5000", MockReply::chain(forged)),
        );
        node.register_node("http://10.0.0.1:5000").await.unwrap();
        node.register_node("http://10.0.0.2:5000").await.unwrap();
        node.new_transaction("A", "B", "1").await.unwrap();
        sealed(&node).await;
        node.new_transaction("C", "D", "2").await.unwrap();

        let resolution = node.resolve_conflicts().await;
        assert_eq!(
            resolution,
            Resolution::Replaced {
                peer: "10.0.0.1:5000".into(),
                length: 5,
                reassigned: vec![],
            }
        );
        let ledger = node.ledger().read().await;
        assert_eq!(ledger.chain(), remote.as_slice());
        // pending entries survive a swap
        assert_eq!(ledger.pending_transactions().len(), 1);
    }

    #[tokio::test]
    async fn resolve_never_installs_equal_or_shorter_chains() {
        let node = node_with(
            MockFetcher::new()
                .with("a:1", MockReply::chain(mined_chain(2, DIFFICULTY)))
                .with("b:1", MockReply::chain(mined_chain(1, DIFFICULTY))),
        );
        node.register_node("a:1").await.unwrap();
        node.register_node("b:1").await.unwrap();
        let local = sealed(&node).await;

        assert_eq!(node.resolve_conflicts().await, Resolution::NoChange);
        let ledger = node.ledger().read().await;
        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger.last_block(), &local);
    }

    /// A valid chain of three blocks whose first mined block seals users 1 and 2.
    fn chain_with_users() -> Vec<Block> {
        let mut ledger = Ledger::new();
        ledger.new_user("Alan", "Turing", "alan@x");
        ledger.new_user("Grace", "Hopper", "grace@x");
        for _ in 0..2 {
            let found = proof_of_work(ledger.last_block(), DIFFICULTY);
            ledger.new_block(found.proof, None);
        }
        ledger.chain().to_vec()
    }

    #[tokio::test]
    async fn adopting_a_chain_reports_users_whose_id_was_taken() {
        let node = node_with(MockFetcher::new().with("p:1", MockReply::chain(chain_with_users())));
        node.register_node("p:1").await.unwrap();
        assert_eq!(node.new_user("Ada", "Lovelace", "ada@x").await, (2, 1));

        assert_eq!(
            node.resolve_conflicts().await,
            Resolution::Replaced {
                peer: "p:1".into(),
                length: 3,
                reassigned: vec![Reassigned { from: 1, to: 3 }],
            }
        );
        let (_, users) = node.pending().await;
        assert_eq!(users[0].id, 3);
        assert_eq!(users[0].email, "ada@x");
        assert_eq!(node.new_user("Edsger", "Dijkstra", "ed@x").await, (4, 4));
    }

    #[tokio::test]
    async fn adopting_a_chain_keeps_ids_it_does_not_hold() {
        let node = node_with(
            MockFetcher::new().with("p:1", MockReply::chain(mined_chain(3, DIFFICULTY))),
        );
        node.register_node("p:1").await.unwrap();
        assert_eq!(node.new_user("Ada", "Lovelace", "ada@x").await, (2, 1));

        match node.resolve_conflicts().await {
            Resolution::Replaced { reassigned, .. } => assert!(reassigned.is_empty()),
            other => panic!("expected a replacement, got {other:?}"),
        }
        assert_eq!(node.pending().await.1[0].id, 1);
    }

    #[tokio::test]
    async fn rejected_batch_registers_no_peer() {
        let node = node_with(MockFetcher::new());
        let batch = vec!["a:1".to_string(), "http://".to_string()];
        assert!(node.register_nodes(&batch).await.is_err());
        assert!(node.peers().await.is_empty());

        let batch = vec!["http://b:1".to_string(), "a:1".to_string()];
        assert_eq!(node.register_nodes(&batch).await.unwrap(), vec!["b:1", "a:1"]);
        assert_eq!(node.peers().await, vec!["a:1", "b:1"]);
    }

    #[tokio::test]
    async fn adopting_a_chain_stops_mining_on_the_old_tip() {
        let remote = mined_chain(3, DIFFICULTY);
        let node = node_with(MockFetcher::new().with("p:1", MockReply::chain(remote.clone())));
        node.register_node("p:1").await.unwrap();
        node.new_transaction("A", "B", "1").await.unwrap();
        node.new_user("Ada", "Lovelace", "ada@x").await;

        // Same steps as `mine`, at a difficulty no search will ever satisfy.
        let (last_proof, last_hash) = node.tip().await;
        let job = MiningJob::spawn(last_proof, last_hash, 64);
        let guard = node.track(job.cancel_flag());

        assert!(matches!(
            node.resolve_conflicts().await,
            Resolution::Replaced { length: 3, .. }
        ));
        assert_eq!(job.join().await, MiningOutcome::Cancelled);
        drop(guard);
        assert_eq!(node.cancel_mining(), 0);

        let ledger = node.ledger().read().await;
        assert_eq!(ledger.chain(), remote.as_slice());
        assert_eq!(ledger.pending_transactions().len(), 1);
        assert_eq!(ledger.pending_users().len(), 1);
    }

    #[tokio::test]
    async fn proof_for_a_replaced_tip_is_not_sealed() {
        let remote = mined_chain(3, DIFFICULTY);
        let node = node_with(MockFetcher::new().with("p:1", MockReply::chain(remote.clone())));
        node.register_node("p:1").await.unwrap();
        node.new_transaction("A", "B", "1").await.unwrap();
        node.new_user("Ada", "Lovelace", "ada@x").await;

        let (last_proof, last_hash) = node.tip().await;
        let never = AtomicBool::new(false);
        let found = mine(last_proof, &last_hash, DIFFICULTY, &never).unwrap();

        assert!(matches!(
            node.resolve_conflicts().await,
            Resolution::Replaced { .. }
        ));
        assert!(matches!(
            node.seal(found, last_hash).await,
            MineOutcome::Superseded
        ));

        let ledger = node.ledger().read().await;
        assert_eq!(ledger.chain(), remote.as_slice());
        assert_eq!(ledger.pending_transactions().len(), 1);
        assert_eq!(ledger.pending_users().len(), 1);
        assert!(is_valid_chain(ledger.chain(), DIFFICULTY));
    }

    #[tokio::test]
    async fn resolve_without_peers_is_a_no_op() {
        let node = node_with(MockFetcher::new());
        assert_eq!(node.resolve_conflicts().await, Resolution::NoChange);
    }
}
