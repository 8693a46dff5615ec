//! Upstream subsystem.
//!
//! # Data Flow
//! ```text
//! Validated query
//!     → executor.rs (bounded attempt loop)
//!         → load_balancer::Selector picks an untried endpoint
//!         → transport.rs POSTs `data=<query>` under a deadline
//!         → outcome classified, health registry updated
//!     → UpstreamOutcome::{Succeeded, Exhausted}
//! ```
//!
//! # Design Decisions
//! - Failover, not fan-out: one call in flight per client request
//! - Transport is a trait so the loop is testable without sockets
//! - A malformed 2xx body is treated like a failed status

pub mod endpoint;
pub mod executor;
pub mod transport;

pub use endpoint::{Endpoint, EndpointError};
pub use executor::{Executor, UpstreamOutcome};
pub use transport::{AttemptError, HttpTransport, UpstreamReply, UpstreamTransport};
