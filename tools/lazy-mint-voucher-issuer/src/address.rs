//! Address parsing for caller-supplied strings.

use std::sync::LazyLock;

use alloy_primitives::Address;
use regex::Regex;

use crate::errors::VoucherError;

static ADDRESS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^0x[a-fA-F0-9]{40}$").expect("address pattern is valid"));

/// Parse a `0x`-prefixed, 40-hex-digit address.
///
/// Mixed-case input must carry a valid EIP-55 checksum; all-lower or all-upper input is
/// taken as-is.
pub fn parse_address(field: &'static str, value: &str) -> Result<Address, VoucherError> {
    if !ADDRESS_RE.is_match(value) {
        return Err(VoucherError::invalid_address(
            field,
            value,
            "expected 0x followed by 40 hex digits",
        ));
    }

    let digits = &value[2..];
    let has_lower = digits.bytes().any(|b| b.is_ascii_lowercase());
    let has_upper = digits.bytes().any(|b| b.is_ascii_uppercase());

    if has_lower && has_upper {
        Address::parse_checksummed(value, None)
            .map_err(|_| VoucherError::invalid_address(field, value, "bad EIP-55 checksum"))
    } else {
        value
            .parse::<Address>()
            .map_err(|e| VoucherError::invalid_address(field, value, e.to_string()))
    }
}
