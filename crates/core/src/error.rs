//! Errors raised by catalog, cart, checkout and order rules.

use thiserror::Error;

pub type DomainResult<T> = Result<T, DomainError>;

/// A storefront rule rejected the input or the requested change.
///
/// Every variant carries a message naming the offending field or record.
/// Database and serialization failures are `atomic_infra::RepositoryError`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Bad shopper or admin input: a short title, a malformed e-mail, a
    /// quantity below one, a discount code that cannot be applied.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Order status change outside the allowed lifecycle.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// Product, variant or order id that is not a UUID.
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// Referenced product, variant or order does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The order is already in the requested status.
    #[error("conflict: {0}")]
    Conflict(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_failure() {
        assert_eq!(
            DomainError::validation("email must be a valid e-mail address").to_string(),
            "validation failed: email must be a valid e-mail address"
        );
        assert_eq!(DomainError::not_found("variant 42").to_string(), "not found: variant 42");
    }
}
