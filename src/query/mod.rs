//! Query validation subsystem.
//!
//! # Data Flow
//! ```text
//! Raw query text (length already checked by the caller)
//!     → rules.rs predicates, evaluated in a fixed order
//!     → first failing rule becomes the QueryRejection
//!     → Ok(()) when every rule passes
//! ```
//!
//! # Design Decisions
//! - Pure and synchronous: no I/O, no allocation beyond the rejection
//! - Pattern matching only, never a grammar parse (cheap abuse prevention)
//! - Rule order is part of the contract: it decides which reason is reported

pub mod rules;

use thiserror::Error;

pub use crate::config::schema::QueryConfig as QueryLimits;

/// Reason a query was refused before reaching any upstream.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryRejection {
    #[error("missing output format declaration")]
    MissingOutputFormat,

    #[error("no query statements found")]
    NoQueryStatements,

    #[error("missing output statement")]
    MissingOutputStatement,

    #[error("too many statements: {count} (maximum {max})")]
    TooManyStatements { count: usize, max: usize },

    #[error("queries must include geographic constraints")]
    MissingGeographicConstraint,

    #[error("recursive expansions require timeout setting")]
    UnboundedRecursion,

    #[error("around radius {radius}m exceeds maximum of {max}m")]
    RadiusTooLarge { radius: u64, max: u64 },
}

impl QueryRejection {
    /// Stable label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingOutputFormat => "output_format",
            Self::NoQueryStatements => "no_statements",
            Self::MissingOutputStatement => "output_statement",
            Self::TooManyStatements { .. } => "too_many_statements",
            Self::MissingGeographicConstraint => "geographic_constraint",
            Self::UnboundedRecursion => "unbounded_recursion",
            Self::RadiusTooLarge { .. } => "radius_too_large",
        }
    }
}

/// Accept or reject a query. The first failing rule decides the reason.
pub fn validate(query: &str, limits: &QueryLimits) -> Result<(), QueryRejection> {
    if !rules::has_output_declaration(query) {
        return Err(QueryRejection::MissingOutputFormat);
    }

    if !rules::has_query_statement(query) {
        return Err(QueryRejection::NoQueryStatements);
    }

    if !rules::has_output_statement(query) {
        return Err(QueryRejection::MissingOutputStatement);
    }

    let count = rules::statement_count(query);
    if count > limits.max_statements {
        return Err(QueryRejection::TooManyStatements {
            count,
            max: limits.max_statements,
        });
    }

    if rules::uses_filtered_selector(query) && !rules::has_geographic_constraint(query) {
        return Err(QueryRejection::MissingGeographicConstraint);
    }

    if rules::has_recursive_expansion(query) && !rules::has_timeout_setting(query) {
        return Err(QueryRejection::UnboundedRecursion);
    }

    if let Some(radius) = rules::around_radii(query).find(|r| *r > limits.max_around_radius_m) {
        return Err(QueryRejection::RadiusTooLarge {
            radius,
            max: limits.max_around_radius_m,
        });
    }

    Ok(())
}
