use alloy_primitives::Address;
use serde::{Deserialize, Serialize};

/// EIP-712 domain the verifying contract was deployed with.
///
/// Deserialises from the same object shape ethers uses for `_signTypedData`:
/// `{ "name", "version", "chainId", "verifyingContract" }`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SigningDomain {
    /// Protocol name; must equal the contract's `SIGNING_DOMAIN`.
    pub name: String,
    /// Protocol version; must equal the contract's `SIGNATURE_VERSION`.
    pub version: String,
    pub chain_id: u64,
    pub verifying_contract: Address,
}

impl SigningDomain {
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        chain_id: u64,
        verifying_contract: Address,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            chain_id,
            verifying_contract,
        }
    }
}
