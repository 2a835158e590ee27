use thiserror::Error;

/// Errors surfaced by voucher issuance.
///
/// Business-rule rejections (duplicate uid, sale phase, funds) belong to the verifying contract
/// and never appear here.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum VoucherError {
    /// Seller, buyer or verifying contract is not a well-formed address.
    #[error("invalid {field} address `{value}`: {reason}")]
    InvalidAddress {
        field: &'static str,
        value: String,
        reason: String,
    },

    /// No key is configured, or the key material could not be read or parsed.
    #[error("signing key unavailable: {0}")]
    SigningKeyUnavailable(String),

    /// The ECDSA operation failed, or the signing backend errored or timed out.
    #[error("signing failed: {0}")]
    SigningFailure(String),

    /// Verification only: the signature bytes are malformed or recover to no key.
    #[error("invalid signature: {0}")]
    InvalidSignature(String),
}

impl VoucherError {
    pub(crate) fn invalid_address(
        field: &'static str,
        value: &str,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidAddress {
            field,
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}
