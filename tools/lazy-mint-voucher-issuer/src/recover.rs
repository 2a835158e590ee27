//! Off-chain counterpart of the verifying contract's signer check.
//!
//! Purpose: confirm a signed voucher recovers to the expected minter before it is handed out,
//! and let tooling inspect vouchers received from elsewhere.

use alloy_primitives::{Address, FixedBytes};
use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};
use lazy_mint_voucher_types::{schema::SIGNATURE_LEN, SignedVoucher, SigningDomain};

use crate::{digest::voucher_digest, errors::VoucherError, signer::address_of};

fn split_signature(sig: &[u8]) -> Result<(Signature, u8), VoucherError> {
    if sig.len() != SIGNATURE_LEN {
        return Err(VoucherError::InvalidSignature(format!(
            "signature must be {SIGNATURE_LEN} bytes, got {}",
            sig.len()
        )));
    }
    let signature = Signature::from_slice(&sig[..64])
        .map_err(|e| VoucherError::InvalidSignature(format!("malformed signature: {e}")))?;
    Ok((signature, sig[64]))
}

fn recover_with(
    digest: &FixedBytes<32>,
    signature: &Signature,
    parity: u8,
) -> Result<Address, VoucherError> {
    let recovery_id = RecoveryId::from_byte(parity).ok_or_else(|| {
        VoucherError::InvalidSignature(format!("bad recovery parity {parity}"))
    })?;
    VerifyingKey::recover_from_prehash(digest.as_slice(), signature, recovery_id)
        .map(|key| address_of(&key))
        .map_err(|_| {
            VoucherError::InvalidSignature("signature does not recover to a public key".into())
        })
}

/// Recover the signer address from a 32-byte digest and an `r || s || v` signature.
///
/// `v` must be one of {0, 1, 27, 28}. Any other value names no parity, so there is no single
/// signer to report; use [`recover_candidates`] for those.
pub fn recover_address(digest: FixedBytes<32>, sig: &[u8]) -> Result<Address, VoucherError> {
    let (signature, v) = split_signature(sig)?;
    match v {
        0 | 1 | 27 | 28 => recover_with(&digest, &signature, v % 27),
        other => Err(VoucherError::InvalidSignature(format!(
            "unrecognised recovery byte v={other}"
        ))),
    }
}

/// Every address `sig` could have been produced by.
///
/// One address for a recognised `v`; for anything else both parities are tried and each that
/// recovers is returned.
pub fn recover_candidates(digest: FixedBytes<32>, sig: &[u8]) -> Result<Vec<Address>, VoucherError> {
    let (signature, v) = split_signature(sig)?;
    if matches!(v, 0 | 1 | 27 | 28) {
        return recover_with(&digest, &signature, v % 27).map(|addr| vec![addr]);
    }

    let candidates: Vec<Address> = [0u8, 1]
        .into_iter()
        .filter_map(|parity| recover_with(&digest, &signature, parity).ok())
        .collect();
    if candidates.is_empty() {
        return Err(VoucherError::InvalidSignature(
            "signature does not recover to a public key".into(),
        ));
    }
    Ok(candidates)
}

/// Recompute the voucher digest under `domain` and recover who signed it.
pub fn recover_signer(domain: &SigningDomain, signed: &SignedVoucher) -> Result<Address, VoucherError> {
    let digest = voucher_digest(domain, &signed.voucher);
    recover_address(digest, &signed.signature)
}

/// `true` when `signed` recovers to `expected` under `domain`.
///
/// With an unrecognised `v` either parity matching `expected` is enough.
pub fn is_signed_by(domain: &SigningDomain, signed: &SignedVoucher, expected: Address) -> bool {
    let digest = voucher_digest(domain, &signed.voucher);
    matches!(
        recover_candidates(digest, &signed.signature),
        Ok(candidates) if candidates.contains(&expected)
    )
}
