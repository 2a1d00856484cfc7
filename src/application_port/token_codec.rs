use crate::domain_model::*;
use chrono::{DateTime, Utc};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    #[error("token is malformed")]
    Malformed,
    #[error("token signature is invalid")]
    SignatureInvalid,
    #[error("token has expired")]
    Expired,
    #[error("token algorithm {0} is not allowed")]
    UnsupportedAlgorithm(String),
    #[error("internal error: {0}")]
    InternalError(String),
}

/// Signs and verifies bearer tokens. Pure CPU work, never touches the network.
pub trait TokenCodec: Send + Sync {
    /// Returns the token and its embedded expiry (`now + ttl`).
    fn issue(
        &self,
        claims: &ClaimsInput,
        ttl: Duration,
    ) -> Result<(String, DateTime<Utc>), CodecError>;

    /// Checks the algorithm allow-list, then the signature, then expiry.
    fn verify(&self, token: &str) -> Result<IdentityClaims, CodecError>;

    /// Same as [`TokenCodec::verify`] minus the expiry check.
    fn verify_ignoring_expiry(&self, token: &str) -> Result<IdentityClaims, CodecError>;
}
