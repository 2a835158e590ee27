//! EIP-712 type declarations.
//!
//! Field order and type tags are hashed into every signature, so these strings must match the
//! verifying contract's declarations byte for byte.

/// Domain type string (fields in the order ethers emits them for a four-field domain).
pub const EIP712_DOMAIN_TYPE: &str =
    "EIP712Domain(string name,string version,uint256 chainId,address verifyingContract)";

/// Primary type name of the voucher struct.
pub const VOUCHER_PRIMARY_TYPE: &str = "LazyMintExternalNftData";

/// Encoded voucher type string.
pub const VOUCHER_TYPE: &str =
    "LazyMintExternalNftData(address seller,address buyer,string currency,uint256 price,string uid)";

/// Voucher members as `(name, solidity type)` pairs, in declaration order.
pub const VOUCHER_FIELDS: [(&str, &str); 5] = [
    ("seller", "address"),
    ("buyer", "address"),
    ("currency", "string"),
    ("price", "uint256"),
    ("uid", "string"),
];

/// Domain members as `(name, solidity type)` pairs, in declaration order.
pub const DOMAIN_FIELDS: [(&str, &str); 4] = [
    ("name", "string"),
    ("version", "string"),
    ("chainId", "uint256"),
    ("verifyingContract", "address"),
];

/// Length of an `r || s || v` signature.
pub const SIGNATURE_LEN: usize = 65;
