use thiserror::Error;

/// Result type for billing domain operations
pub type BillingResult<T> = Result<T, BillingError>;

#[derive(Debug, Error)]
pub enum BillingError {
    #[error("Not found: {entity} with {field}={value}")]
    NotFound {
        entity: &'static str,
        field: &'static str,
        value: String,
    },

    #[error("Validation: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Business rule violated: {0}")]
    BusinessRule(String),

    #[error("Invalid or expired OTP")]
    InvalidOrExpiredOtp,

    #[error("Upstream service unavailable: {service}")]
    Unavailable { service: &'static str },

    #[error("Storage error: {0}")]
    Storage(String),
}

impl BillingError {
    /// Whether this error is likely transient and the operation may
    /// succeed if retried (collaborator outage, storage hiccup).
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            BillingError::Unavailable { .. } | BillingError::Storage(_)
        )
    }

    /// Shorthand for a missing-entity error.
    pub fn not_found(entity: &'static str, field: &'static str, value: impl Into<String>) -> Self {
        BillingError::NotFound {
            entity,
            field,
            value: value.into(),
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────
