use std::fmt;

use alloy_primitives::{hex, Address, Bytes, U256};
use serde::{Deserialize, Serialize};

/// Unsigned lazy-mint authorisation (`LazyMintExternalNftData`).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voucher {
    pub seller: Address,
    pub buyer: Address,
    /// Payment currency ticker; may be a sentinel such as `"X"` meaning none.
    pub currency: String,
    /// Amount in the currency's smallest unit.
    #[serde(with = "decimal_u256")]
    pub price: U256,
    pub uid: String,
}

impl Voucher {
    pub fn into_signed(self, signature: impl Into<Bytes>) -> SignedVoucher {
        SignedVoucher {
            voucher: self,
            signature: signature.into(),
        }
    }
}

/// Voucher plus the ECDSA signature (`r || s || v`) over its EIP-712 digest.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedVoucher {
    #[serde(flatten)]
    pub voucher: Voucher,
    pub signature: Bytes,
}

impl SignedVoucher {
    /// Redemption call arguments in contract order:
    /// `[seller, buyer, currency, price, uid, signature]`.
    pub fn call_args(&self) -> [String; 6] {
        let v = &self.voucher;
        [
            v.seller.to_checksum(None),
            v.buyer.to_checksum(None),
            v.currency.clone(),
            v.price.to_string(),
            v.uid.clone(),
            hex::encode_prefixed(&self.signature),
        ]
    }
}

/// Renders the argument list the way it is pasted into a contract call form:
/// `["0x..", "0x..", "X", "0", "uid", "0x.."]`.
impl fmt::Display for SignedVoucher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, arg) in self.call_args().iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "\"{arg}\"")?;
        }
        f.write_str("]")
    }
}

/// `uint256` as a decimal string; also accepts JSON numbers and `0x` hex on input.
mod decimal_u256 {
    use std::{fmt, str::FromStr};

    use alloy_primitives::U256;
    use serde::{de, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &U256, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<U256, D::Error> {
        deserializer.deserialize_any(DecimalVisitor)
    }

    struct DecimalVisitor;

    impl de::Visitor<'_> for DecimalVisitor {
        type Value = U256;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a non-negative integer or numeric string")
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<U256, E> {
            Ok(U256::from(v))
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<U256, E> {
            U256::from_str(v.trim()).map_err(|e| E::custom(format!("invalid uint256 `{v}`: {e}")))
        }
    }
}
