//! Solidity-side view of the voucher.

use alloy_sol_types::{sol, SolValue};
use lazy_mint_voucher_types::{SignedVoucher, Voucher};

sol! {
    /// Struct declared by the verifying contract and hashed under EIP-712.
    #[derive(Debug, PartialEq, Eq)]
    struct LazyMintExternalNftData {
        address seller;
        address buyer;
        string currency;
        uint256 price;
        string uid;
    }
}

impl From<&Voucher> for LazyMintExternalNftData {
    fn from(v: &Voucher) -> Self {
        Self {
            seller: v.seller,
            buyer: v.buyer,
            currency: v.currency.clone(),
            price: v.price,
            uid: v.uid.clone(),
        }
    }
}

/// ABI parameter encoding of `(address seller, address buyer, string currency, uint256 price,
/// string uid, bytes signature)`, i.e. the redemption call arguments without a selector.
pub fn abi_encode_redeem_args(signed: &SignedVoucher) -> Vec<u8> {
    let v = &signed.voucher;
    (
        v.seller,
        v.buyer,
        v.currency.clone(),
        v.price,
        v.uid.clone(),
        signed.signature.clone(),
    )
        .abi_encode_params()
}
