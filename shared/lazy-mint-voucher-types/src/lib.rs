//! Shared types for lazy-mint vouchers.
//!
//! These types are used by the off-chain issuer and by any tooling that needs to read or
//! forward signed vouchers without pulling in signing code.

pub mod domain;
pub mod schema;
pub mod voucher;

pub use domain::SigningDomain;
pub use voucher::{SignedVoucher, Voucher};
