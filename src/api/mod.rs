mod chain;
mod health;
pub mod models;
mod nodes;
mod tx;

use actix_web::web::{self, ServiceConfig};

pub fn init_routes(cfg: &mut ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .service(health::health_check)
            .service(chain::get_chain)
            .service(chain::validate_chain)
            .service(chain::mine_block)
            .service(chain::cancel_mining)
            .service(tx::post_transaction)
            .service(tx::post_user)
            .service(tx::get_pending)
            .service(nodes::get_nodes)
            .service(nodes::register_nodes)
            .service(nodes::resolve_nodes),
    );
}
