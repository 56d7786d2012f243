use actix_web::{HttpResponse, Responder, get, post, web};
use log::info;

use super::models::{CancelResponse, ChainResponse, ErrorResponse, MineResponse, ValidateResponse};
use crate::node::{MineOutcome, Node};

/// Get the full blockchain. Peers read this during conflict resolution.
#[get("/chain/")]
pub async fn get_chain(state: web::Data<Node>) -> impl Responder {
    let ledger = state.ledger().read().await;
    HttpResponse::Ok().json(ChainResponse {
        length: ledger.len(),
        chain: ledger.chain(),
    })
}

/// Validate the whole chain.
#[get("/validate/")]
pub async fn validate_chain(state: web::Data<Node>) -> impl Responder {
    let valid = state.is_valid().await;
    let length = state.ledger().read().await.len();
    HttpResponse::Ok().json(ValidateResponse {
        valid,
        length,
        difficulty: state.difficulty(),
    })
}

/// Mine a proof on top of the current tip and seal the pending pools
/// into a new block.
#[post("/mine/")]
pub async fn mine_block(state: web::Data<Node>) -> impl Responder {
    match state.mine().await {
        MineOutcome::Sealed { block, attempts } => {
            info!(
                "POST /mine/ - block #{} forged after {} attempts",
                block.index, attempts
            );
            HttpResponse::Ok().json(MineResponse {
                message: "New Block Forged",
                node_id: state.id().to_string(),
                index: block.index,
                transactions: block.transactions,
                user: block.users,
                proof: block.proof,
                previous_hash: block.previous_hash,
                attempts,
            })
        }
        MineOutcome::Cancelled => HttpResponse::Conflict().json(ErrorResponse {
            error: "mining was cancelled".into(),
        }),
        MineOutcome::Superseded => HttpResponse::Conflict().json(ErrorResponse {
            error: "chain changed while mining; retry".into(),
        }),
    }
}

/// Stop any mining in progress.
#[post("/mine/cancel/")]
pub async fn cancel_mining(state: web::Data<Node>) -> impl Responder {
    HttpResponse::Ok().json(CancelResponse {
        cancelled: state.cancel_mining(),
    })
}
