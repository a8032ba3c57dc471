//! Network Module
//!
//! HTTP JSON façade over the engine.
//!
//! ## Architecture
//! - axum router, one route per `CommandType` (with and without `/`)
//! - Handlers parse into a `Command` and run it on tokio's blocking pool
//! - Permissive CORS and request tracing layers

mod handlers;
mod server;

pub use handlers::ApiError;
pub use server::{router, Server};
