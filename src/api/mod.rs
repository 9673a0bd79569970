//! HTTP surface: save and read snapshots, health, static mounts

mod router;
mod server;

pub use router::{AppState, FAILED_STORE_HEADER, create_router};
pub use server::Server;
