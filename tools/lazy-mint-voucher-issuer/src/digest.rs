//! EIP-712 digest construction for `LazyMintExternalNftData`.
//!
//! Must stay identical to what the verifying contract computes with `_hashTypedDataV4`.

use alloy_primitives::{FixedBytes, U256};
use lazy_mint_voucher_types::{
    schema::{EIP712_DOMAIN_TYPE, VOUCHER_TYPE},
    SigningDomain, Voucher,
};
use sha3::{Digest, Keccak256};

pub(crate) fn keccak256_bytes(bytes: &[u8]) -> FixedBytes<32> {
    let mut h = Keccak256::new();
    h.update(bytes);
    let out = h.finalize();
    let mut b = [0u8; 32];
    b.copy_from_slice(out.as_slice());
    FixedBytes(b)
}

fn address_word(address: &alloy_primitives::Address) -> [u8; 32] {
    let mut padded = [0u8; 32];
    padded[12..32].copy_from_slice(address.as_slice());
    padded
}

/// `keccak256(typeHash || name || version || chainId || verifyingContract)`.
pub fn domain_separator(domain: &SigningDomain) -> FixedBytes<32> {
    let domain_type_hash = keccak256_bytes(EIP712_DOMAIN_TYPE.as_bytes());
    let domain_name_hash = keccak256_bytes(domain.name.as_bytes());
    let domain_version_hash = keccak256_bytes(domain.version.as_bytes());

    let mut domain_buf = Vec::with_capacity(32 * 5);
    domain_buf.extend_from_slice(domain_type_hash.as_slice());
    domain_buf.extend_from_slice(domain_name_hash.as_slice());
    domain_buf.extend_from_slice(domain_version_hash.as_slice());
    domain_buf.extend_from_slice(&U256::from(domain.chain_id).to_be_bytes::<32>());
    domain_buf.extend_from_slice(&address_word(&domain.verifying_contract));
    keccak256_bytes(&domain_buf)
}

/// `hashStruct(voucher)`. Dynamic `string` members are encoded as the hash of their bytes.
pub fn voucher_struct_hash(voucher: &Voucher) -> FixedBytes<32> {
    let msg_type_hash = keccak256_bytes(VOUCHER_TYPE.as_bytes());

    let mut struct_buf = Vec::with_capacity(32 * 6);
    struct_buf.extend_from_slice(msg_type_hash.as_slice());
    struct_buf.extend_from_slice(&address_word(&voucher.seller));
    struct_buf.extend_from_slice(&address_word(&voucher.buyer));
    struct_buf.extend_from_slice(keccak256_bytes(voucher.currency.as_bytes()).as_slice());
    struct_buf.extend_from_slice(&voucher.price.to_be_bytes::<32>());
    struct_buf.extend_from_slice(keccak256_bytes(voucher.uid.as_bytes()).as_slice());
    keccak256_bytes(&struct_buf)
}

/// Final digest: `keccak256("\x19\x01" || domainSeparator || structHash)`.
pub fn voucher_digest(domain: &SigningDomain, voucher: &Voucher) -> FixedBytes<32> {
    let mut final_buf = Vec::with_capacity(2 + 32 + 32);
    final_buf.extend_from_slice(b"\x19\x01");
    final_buf.extend_from_slice(domain_separator(domain).as_slice());
    final_buf.extend_from_slice(voucher_struct_hash(voucher).as_slice());
    keccak256_bytes(&final_buf)
}
