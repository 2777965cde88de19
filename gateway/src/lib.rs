use axum::{routing::get, Router};
use nearfs_castore::blockservice::BlockService;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

mod ipfs;
mod listing;
mod mime;

#[derive(Clone)]
pub struct AppState {
    block_service: Arc<dyn BlockService>,
}

impl AppState {
    pub fn new(block_service: Arc<dyn BlockService>) -> Self {
        Self { block_service }
    }
}

pub fn gen_router() -> Router<AppState> {
    Router::new()
        .route("/", get(root))
        .route("/ipfs/*rest", get(ipfs::get))
        .layer(TraceLayer::new_for_http())
}

async fn root() -> &'static str {
    "Hello from nearfs, an IPFS gateway for content stored on NEAR.\n\
     See https://github.com/vgrichina/nearfs\n"
}
