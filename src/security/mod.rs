//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → RequestBodyLimitLayer (size cap, configured in http::server)
//!     → rate_limit.rs (per-IP token bucket, optional)
//!     → proxy handler (input checks, query validation)
//! ```
//!
//! # Design Decisions
//! - Reject before any upstream call is made
//! - No trust in client input

pub mod rate_limit;
