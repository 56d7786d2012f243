use actix_web::{HttpResponse, Responder, get, post, web};
use log::{debug, warn};

use super::models::{
    ErrorResponse, NewTxRequest, NewTxResponse, NewUserRequest, NewUserResponse, PendingResponse,
};
use crate::node::Node;

/// Queue a transaction for the next block.
#[post("/transactions/new/")]
pub async fn post_transaction(
    state: web::Data<Node>,
    body: web::Json<NewTxRequest>,
) -> impl Responder {
    let amount = body.raw_amount();
    match state
        .new_transaction(&body.sender, &body.recipient, &amount)
        .await
    {
        Ok(index) => HttpResponse::Created().json(NewTxResponse {
            message: format!("Transaction will be added to Block {index}"),
            index,
        }),
        Err(e) => {
            warn!("POST /transactions/new/ - rejected: {e}");
            HttpResponse::BadRequest().json(ErrorResponse {
                error: e.to_string(),
            })
        }
    }
}

/// Queue a user registration for the next block.
#[post("/users/new/")]
pub async fn post_user(state: web::Data<Node>, body: web::Json<NewUserRequest>) -> impl Responder {
    let (index, id) = state.new_user(&body.name, &body.surname, &body.email).await;
    debug!("POST /users/new/ - user #{id} queued");
    HttpResponse::Created().json(NewUserResponse {
        message: format!("User will be added to Block {index}"),
        index,
        id,
    })
}

/// Entries waiting for the next block.
#[get("/pending/")]
pub async fn get_pending(state: web::Data<Node>) -> impl Responder {
    let (transactions, users) = state.pending().await;
    HttpResponse::Ok().json(PendingResponse {
        transactions,
        users,
    })
}
