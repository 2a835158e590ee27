//! Off-chain issuance of EIP-712 signed lazy-mint vouchers.
//!
//! A voucher authorises `buyer` to redeem an NFT from `seller` at `price` in `currency`. The
//! verifying contract recomputes the same digest, recovers the signer and checks it against its
//! allow-list; it also tracks consumed uids. This crate only builds and signs.

pub mod abi;
pub mod address;
pub mod digest;
pub mod errors;
pub mod issuer;
pub mod recover;
pub mod signer;
pub mod uid;

#[cfg(test)]
mod tests;

pub use errors::VoucherError;
pub use issuer::{IssuerConfig, VoucherIssuer};
pub use lazy_mint_voucher_types::{SignedVoucher, SigningDomain, Voucher};
pub use signer::{LocalSigner, SignerConfig, VoucherSigner};
pub use uid::UidStrategy;
