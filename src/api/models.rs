use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::blockchain::{Block, Reassigned};
use crate::transaction::{Transaction, UserRecord};

/* ---------- Chain API Models ---------- */

#[derive(Serialize)]
pub struct ChainResponse<'a> {
    pub length: usize,
    pub chain: &'a [Block],
}

#[derive(Serialize)]
pub struct ValidateResponse {
    pub valid: bool,
    pub length: usize,
    pub difficulty: u32,
}

#[derive(Serialize)]
pub struct MineResponse {
    pub message: &'static str,
    pub node_id: String,
    pub index: u64,
    pub transactions: Vec<Transaction>,
    pub user: Vec<UserRecord>,
    pub proof: u64,
    pub previous_hash: String,
    pub attempts: u64,
}

#[derive(Serialize)]
pub struct CancelResponse {
    pub cancelled: usize,
}

#[derive(Serialize)]
pub struct PendingResponse {
    pub transactions: Vec<Transaction>,
    pub users: Vec<UserRecord>,
}

/* ---------- TX / User API Models ---------- */

#[derive(Deserialize)]
pub struct NewTxRequest {
    pub sender: String,
    pub recipient: String,
    /// Number or numeric string; anything else is rejected.
    pub amount: Value,
}

impl NewTxRequest {
    pub fn raw_amount(&self) -> String {
        match &self.amount {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

#[derive(Serialize)]
pub struct NewTxResponse {
    pub message: String,
    pub index: u64,
}

#[derive(Deserialize)]
pub struct NewUserRequest {
    pub name: String,
    pub surname: String,
    pub email: String,
}

#[derive(Serialize)]
pub struct NewUserResponse {
    pub message: String,
    pub index: u64,
    pub id: u64,
}

/* ---------- Node API Models ---------- */

#[derive(Deserialize)]
pub struct RegisterNodesRequest {
    pub nodes: Vec<String>,
}

#[derive(Serialize)]
pub struct RegisterNodesResponse {
    pub message: &'static str,
    pub total_nodes: Vec<String>,
}

#[derive(Serialize)]
pub struct NodesResponse {
    pub nodes: Vec<String>,
}

#[derive(Serialize)]
pub struct ResolveResponse<'a> {
    pub message: String,
    pub replaced: bool,
    /// Pending users moved to a new id because the adopted chain already used theirs.
    pub reassigned_users: Vec<Reassigned>,
    pub chain: &'a [Block],
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}
