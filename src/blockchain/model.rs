use std::collections::HashSet;

use log::debug;
use serde::Serialize;

use super::Block;
use super::validation::validate_chain;
use crate::error::Result;
use crate::transaction::{Transaction, UserRecord};

/// In-memory chain plus the pools waiting for the next block.
#[derive(Debug)]
pub struct Ledger {
    chain: Vec<Block>,
    current_transactions: Vec<Transaction>,
    current_users: Vec<UserRecord>,
    /// Id handed to the next queued user. Only ever moves forward.
    next_user_id: u64,
}

/// A pending user whose id was taken by a user on an adopted chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Reassigned {
    pub from: u64,
    pub to: u64,
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}

impl Ledger {
    /// Initialize a new ledger holding only the genesis block.
    pub fn new() -> Self {
        Self {
            chain: vec![Block::genesis()],
            current_transactions: Vec::new(),
            current_users: Vec::new(),
            next_user_id: 1,
        }
    }

    /// Seal the pending pools into a new block and append it.
    ///
    /// `previous_hash` defaults to the hash of the current last block when
    /// absent or empty.
    pub fn new_block(&mut self, proof: u64, previous_hash: Option<String>) -> &Block {
        let previous_hash = previous_hash
            .filter(|h| !h.is_empty())
            .unwrap_or_else(|| self.last_block().hash());

        let transactions = std::mem::take(&mut self.current_transactions);
        let users = std::mem::take(&mut self.current_users);

        let block = Block::new(
            self.chain.len() as u64 + 1,
            transactions,
            users,
            proof,
            previous_hash,
        );
        debug!(
            "LEDGER - sealed block #{} ({} txs, {} users)",
            block.index,
            block.transactions.len(),
            block.users.len()
        );
        self.chain.push(block);
        self.last_block()
    }

    /// Queue a transaction; returns the index of the block it will land in.
    pub fn new_transaction(&mut self, sender: &str, recipient: &str, amount: &str) -> Result<u64> {
        let tx = Transaction::new(sender, recipient, amount)?;
        self.current_transactions.push(tx);
        Ok(self.next_index())
    }

    /// Queue a user registration; returns the index of the block it will
    /// land in. Ids are unique across the whole chain.
    pub fn new_user(&mut self, name: &str, surname: &str, email: &str) -> u64 {
        let id = self.next_user_id;
        self.next_user_id += 1;
        self.current_users.push(UserRecord {
            id,
            name: name.to_string(),
            surname: surname.to_string(),
            email: email.to_string(),
        });
        self.next_index()
    }

    /// Replace the whole chain after validating it. Pending pools are kept.
    ///
    /// Pending users keep the ids they were given unless the adopted chain
    /// already sealed a user under the same id; those get a fresh id and are
    /// returned so the caller can report the change.
    pub fn replace_chain(&mut self, chain: Vec<Block>, difficulty: u32) -> Result<Vec<Reassigned>> {
        validate_chain(&chain, difficulty)?;

        let sealed: HashSet<u64> = chain
            .iter()
            .flat_map(|b| b.users.iter().map(|u| u.id))
            .collect();
        let highest = sealed.iter().copied().max().unwrap_or(0);
        self.next_user_id = self.next_user_id.max(highest.saturating_add(1));

        let mut reassigned = Vec::new();
        for user in self.current_users.iter_mut().filter(|u| sealed.contains(&u.id)) {
            let to = self.next_user_id;
            self.next_user_id += 1;
            reassigned.push(Reassigned { from: user.id, to });
            user.id = to;
        }

        self.chain = chain;
        Ok(reassigned)
    }

    /// Return the last block in the chain.
    pub fn last_block(&self) -> &Block {
        self.chain
            .last()
            .expect("ledger always holds at least the genesis block")
    }

    pub fn next_user_id(&self) -> u64 {
        self.next_user_id
    }

    pub fn chain(&self) -> &[Block] {
        &self.chain
    }

    pub fn len(&self) -> usize {
        self.chain.len()
    }

    pub fn pending_transactions(&self) -> &[Transaction] {
        &self.current_transactions
    }

    pub fn pending_users(&self) -> &[UserRecord] {
        &self.current_users
    }

    fn next_index(&self) -> u64 {
        self.last_block().index + 1
    }
}
