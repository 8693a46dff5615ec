//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! client POST { "query": ... }
//!     → server.rs (Axum setup, middleware, handler)
//!     → request.rs (request ID, body decoding, length cap)
//!     → query validator
//!     → upstream executor (selection, failover)
//!     → response.rs (status mapping, cache headers)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{InputError, X_REQUEST_ID};
pub use response::X_UPSTREAM_ENDPOINT;
pub use server::{HttpServer, ServerError};
