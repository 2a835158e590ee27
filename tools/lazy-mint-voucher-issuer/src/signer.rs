//! Signing backends.
//!
//! The issuer only sees [`VoucherSigner`]; a local k256 key is one implementation, a remote
//! custody service would be another.

use std::{
    fmt, fs,
    path::{Path, PathBuf},
};

use alloy_primitives::{Address, FixedBytes};
use async_trait::async_trait;
use k256::{
    ecdsa::{SigningKey, VerifyingKey},
    elliptic_curve::sec1::ToEncodedPoint,
};
use lazy_mint_voucher_types::schema::SIGNATURE_LEN;

use crate::{digest::keccak256_bytes, errors::VoucherError};

/// Signs 32-byte EIP-712 digests on behalf of an authorised minter.
#[async_trait]
pub trait VoucherSigner: Send + Sync {
    /// Address the verifying contract must have on its signer allow-list.
    fn address(&self) -> Address;

    /// Return `r || s || v` with `v` in `{27, 28}`.
    async fn sign_digest(&self, digest: FixedBytes<32>) -> Result<[u8; SIGNATURE_LEN], VoucherError>;
}

/// Where to find the signing key. Exactly one source must be set.
#[derive(Clone, Default)]
pub struct SignerConfig {
    /// Hex private key, with or without `0x`.
    pub private_key: Option<String>,
    /// File whose (trimmed) contents are the hex private key.
    pub private_key_path: Option<PathBuf>,
}

impl fmt::Debug for SignerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignerConfig")
            .field("private_key", &self.private_key.as_ref().map(|_| "<redacted>"))
            .field("private_key_path", &self.private_key_path)
            .finish()
    }
}

/// In-process secp256k1 signer. Signatures are deterministic (RFC 6979).
#[derive(Clone)]
pub struct LocalSigner {
    key: SigningKey,
    address: Address,
}

impl LocalSigner {
    pub fn from_signing_key(key: SigningKey) -> Self {
        let address = address_of(key.verifying_key());
        Self { key, address }
    }

    pub fn from_hex(hex_key: &str) -> Result<Self, VoucherError> {
        let trimmed = hex_key.trim();
        let digits = trimmed.strip_prefix("0x").unwrap_or(trimmed);
        let bytes = hex::decode(digits).map_err(|e| {
            VoucherError::SigningKeyUnavailable(format!("private key is not valid hex: {e}"))
        })?;
        if bytes.len() != 32 {
            return Err(VoucherError::SigningKeyUnavailable(format!(
                "private key must be 32 bytes, got {}",
                bytes.len()
            )));
        }
        let key = SigningKey::from_slice(&bytes).map_err(|_| {
            VoucherError::SigningKeyUnavailable("private key is not a valid secp256k1 scalar".into())
        })?;
        Ok(Self::from_signing_key(key))
    }

    pub fn from_file(path: &Path) -> Result<Self, VoucherError> {
        let contents = fs::read_to_string(path).map_err(|e| {
            VoucherError::SigningKeyUnavailable(format!("failed reading {}: {e}", path.display()))
        })?;
        Self::from_hex(&contents)
    }

    pub fn from_config(config: &SignerConfig) -> Result<Self, VoucherError> {
        match (&config.private_key, &config.private_key_path) {
            (Some(key), None) => Self::from_hex(key),
            (None, Some(path)) => Self::from_file(path),
            (Some(_), Some(_)) => Err(VoucherError::SigningKeyUnavailable(
                "both a private key and a private key path are configured".into(),
            )),
            (None, None) => Err(VoucherError::SigningKeyUnavailable(
                "no signing key configured: provide a private key or a private key path".into(),
            )),
        }
    }
}

impl fmt::Debug for LocalSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalSigner")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl VoucherSigner for LocalSigner {
    fn address(&self) -> Address {
        self.address
    }

    async fn sign_digest(&self, digest: FixedBytes<32>) -> Result<[u8; SIGNATURE_LEN], VoucherError> {
        let (signature, recovery_id) = self
            .key
            .sign_prehash_recoverable(digest.as_slice())
            .map_err(|e| VoucherError::SigningFailure(e.to_string()))?;

        let mut out = [0u8; SIGNATURE_LEN];
        out[..64].copy_from_slice(&signature.to_bytes());
        out[64] = 27 + recovery_id.to_byte();
        Ok(out)
    }
}

/// Ethereum address of a secp256k1 public key: last 20 bytes of `keccak256(x || y)`.
pub fn address_of(key: &VerifyingKey) -> Address {
    let point = key.as_affine().to_encoded_point(false);
    let hash = keccak256_bytes(&point.as_bytes()[1..]);
    Address::from_slice(&hash[12..])
}
