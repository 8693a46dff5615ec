//! Health tracking subsystem.
//!
//! # Data Flow
//! ```text
//! Upstream attempt fails (status, timeout, transport, bad body)
//!     → registry.mark_failed(endpoint)
//!
//! Upstream attempt succeeds
//!     → registry.mark_healthy(endpoint)   (record removed)
//!
//! Selector asks is_healthy(endpoint, now)
//!     → healthy if no record or record older than the window
//! ```
//!
//! # Design Decisions
//! - Passive only: health is learned from real traffic, never probed
//! - Registry is injected, so a shared store can replace the in-memory one
//! - Best effort: each process keeps its own view, with no replication

pub mod registry;

pub use registry::{HealthRegistry, InMemoryHealthRegistry};
