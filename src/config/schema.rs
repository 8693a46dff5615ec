//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration for the query proxy.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address, route path).
    pub listener: ListenerConfig,

    /// Upstream mirrors and the failover policy applied to them.
    pub upstream: UpstreamConfig,

    /// Limits enforced by the query validator.
    pub query: QueryConfig,

    /// Cache directives attached to outbound responses.
    pub cache: CacheConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Rate limiting configuration.
    pub rate_limit: RateLimitConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Request size hardening.
    pub security: SecurityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Path the proxy route is mounted on.
    pub path: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            path: "/proxy".to_string(),
        }
    }
}

/// Endpoint selection strategy among healthy mirrors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SelectionStrategy {
    /// Uniformly random choice.
    #[default]
    Random,
    /// Rotate through the candidates.
    RoundRobin,
}

/// Upstream endpoint configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Ordered list of upstream interpreter URLs.
    pub endpoints: Vec<String>,

    /// Deadline for a single upstream attempt in milliseconds.
    /// Should sit roughly 5s under the hosting platform's execution ceiling.
    pub attempt_timeout_ms: u64,

    /// Maximum upstream attempts per client request.
    pub max_attempts: u32,

    /// How long an endpoint counts as recently failed, in seconds.
    pub health_window_secs: u64,

    /// How to choose among healthy endpoints.
    pub selection: SelectionStrategy,

    /// User-Agent sent upstream.
    pub user_agent: String,

    /// Largest upstream response body accepted, in bytes.
    pub max_response_bytes: usize,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            endpoints: vec![
                "https://overpass-api.de/api/interpreter".to_string(),
                "https://overpass.kumi.systems/api/interpreter".to_string(),
                "https://overpass.private.coffee/api/interpreter".to_string(),
            ],
            attempt_timeout_ms: 25_000,
            max_attempts: 3,
            health_window_secs: 300,
            selection: SelectionStrategy::Random,
            user_agent: concat!("overpass-proxy/", env!("CARGO_PKG_VERSION")).to_string(),
            max_response_bytes: 64 * 1024 * 1024,
        }
    }
}

impl UpstreamConfig {
    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_millis(self.attempt_timeout_ms)
    }

    pub fn health_window(&self) -> Duration {
        Duration::from_secs(self.health_window_secs)
    }
}

/// Query validation limits.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Maximum query length in characters.
    pub max_length: usize,

    /// Maximum number of `;`-separated statements.
    pub max_statements: usize,

    /// Maximum `around:` radius in meters.
    pub max_around_radius_m: u64,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            max_length: 10_000,
            max_statements: 50,
            max_around_radius_m: 50_000,
        }
    }
}

/// Cache directives for shaped responses.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Shared cache lifetime of successful responses.
    pub s_maxage_secs: u64,

    /// Window in which a stale response may be served while revalidating.
    pub stale_while_revalidate_secs: u64,

    /// Retry-After advice when every upstream failed.
    pub retry_after_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            s_maxage_secs: 3600,
            stale_while_revalidate_secs: 7200,
            retry_after_secs: 60,
        }
    }
}

/// Timeout configuration for inbound requests.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Whole-request ceiling in seconds, covering every upstream attempt.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 90 }
    }
}

/// Rate limiting configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting.
    pub enabled: bool,

    /// Maximum requests per second per IP.
    pub requests_per_second: u32,

    /// Burst capacity.
    pub burst_size: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            requests_per_second: 5,
            burst_size: 10,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Security hardening configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Maximum request body size in bytes.
    pub max_body_size: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_body_size: 128 * 1024,
        }
    }
}
