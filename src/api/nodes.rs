use actix_web::{HttpResponse, Responder, get, post, web};
use log::warn;

use super::models::{
    ErrorResponse, NodesResponse, RegisterNodesRequest, RegisterNodesResponse, ResolveResponse,
};
use crate::node::{Node, Resolution};

#[get("/nodes/")]
pub async fn get_nodes(state: web::Data<Node>) -> impl Responder {
    HttpResponse::Ok().json(NodesResponse {
        nodes: state.peers().await,
    })
}

/// Register a list of peers. One malformed address rejects the whole list.
#[post("/nodes/register/")]
pub async fn register_nodes(
    state: web::Data<Node>,
    body: web::Json<RegisterNodesRequest>,
) -> impl Responder {
    if body.nodes.is_empty() {
        return HttpResponse::BadRequest().json(ErrorResponse {
            error: "Please supply a valid list of nodes".into(),
        });
    }

    if let Err(e) = state.register_nodes(&body.nodes).await {
        warn!("POST /nodes/register/ - rejected: {e}");
        return HttpResponse::BadRequest().json(ErrorResponse {
            error: e.to_string(),
        });
    }

    HttpResponse::Created().json(RegisterNodesResponse {
        message: "New nodes have been added",
        total_nodes: state.peers().await,
    })
}

/// Run the longest-valid-chain rule against all known peers.
#[get("/nodes/resolve/")]
pub async fn resolve_nodes(state: web::Data<Node>) -> impl Responder {
    let resolution = state.resolve_conflicts().await;
    let (message, replaced, reassigned_users) = match resolution {
        Resolution::Replaced {
            peer,
            length,
            reassigned,
        } => (
            format!("Our chain was replaced by {length} blocks from {peer}"),
            true,
            reassigned,
        ),
        Resolution::NoChange => ("Our chain is authoritative".to_string(), false, Vec::new()),
    };

    let ledger = state.ledger().read().await;
    HttpResponse::Ok().json(ResolveResponse {
        message,
        replaced,
        reassigned_users,
        chain: ledger.chain(),
    })
}
