use std::time::Duration;

use alloy_primitives::{Address, U256};
use lazy_mint_voucher_types::{SignedVoucher, SigningDomain, Voucher};
use log::{debug, info, warn};

use crate::{
    address::parse_address,
    digest::voucher_digest,
    errors::VoucherError,
    recover::recover_address,
    signer::{LocalSigner, SignerConfig, VoucherSigner},
    uid::UidStrategy,
};

/// Default upper bound on a single signing call.
pub const DEFAULT_SIGNING_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone, Debug)]
pub struct IssuerConfig {
    /// Used by [`VoucherIssuer::issue_with_generated_uid`].
    pub uid_strategy: UidStrategy,
    pub signing_timeout: Duration,
}

impl Default for IssuerConfig {
    fn default() -> Self {
        Self {
            uid_strategy: UidStrategy::default(),
            signing_timeout: DEFAULT_SIGNING_TIMEOUT,
        }
    }
}

/// Builds and signs lazy-mint vouchers for one domain with one signer.
///
/// Holds no mutable state: `issue` can be called concurrently from many tasks. Signing goes
/// through a `tokio` timer, so calls must run inside a tokio runtime.
#[derive(Debug)]
pub struct VoucherIssuer<S> {
    domain: SigningDomain,
    signer: S,
    config: IssuerConfig,
}

impl VoucherIssuer<LocalSigner> {
    /// Load a local key from `signer` and build an issuer around it.
    pub fn from_config(
        domain: SigningDomain,
        signer: &SignerConfig,
        config: IssuerConfig,
    ) -> Result<Self, VoucherError> {
        let signer = LocalSigner::from_config(signer)?;
        Ok(Self::with_config(domain, signer, config))
    }
}

impl<S: VoucherSigner> VoucherIssuer<S> {
    pub fn new(domain: SigningDomain, signer: S) -> Self {
        Self::with_config(domain, signer, IssuerConfig::default())
    }

    pub fn with_config(domain: SigningDomain, signer: S, config: IssuerConfig) -> Self {
        Self {
            domain,
            signer,
            config,
        }
    }

    pub fn domain(&self) -> &SigningDomain {
        &self.domain
    }

    pub fn config(&self) -> &IssuerConfig {
        &self.config
    }

    /// Address the verifying contract must recognise as an authorised signer.
    pub fn signer_address(&self) -> Address {
        self.signer.address()
    }

    /// Build a voucher from raw inputs and sign it.
    ///
    /// Addresses are validated before the signer is touched.
    pub async fn issue(
        &self,
        seller: &str,
        buyer: &str,
        currency: impl Into<String>,
        price: U256,
        uid: impl Into<String>,
    ) -> Result<SignedVoucher, VoucherError> {
        let voucher = Voucher {
            seller: parse_address("seller", seller)?,
            buyer: parse_address("buyer", buyer)?,
            currency: currency.into(),
            price,
            uid: uid.into(),
        };
        self.sign(voucher).await
    }

    /// Same as [`issue`](Self::issue) with a uid drawn from the configured strategy.
    pub async fn issue_with_generated_uid(
        &self,
        seller: &str,
        buyer: &str,
        currency: impl Into<String>,
        price: U256,
    ) -> Result<SignedVoucher, VoucherError> {
        let uid = self.config.uid_strategy.generate();
        debug!("generated {} uid {uid}", self.config.uid_strategy);
        self.issue(seller, buyer, currency, price, uid).await
    }

    /// Sign an already-typed voucher.
    pub async fn sign(&self, voucher: Voucher) -> Result<SignedVoucher, VoucherError> {
        let digest = voucher_digest(&self.domain, &voucher);
        debug!("voucher {} digest {digest}", voucher.uid);

        let signature = tokio::time::timeout(
            self.config.signing_timeout,
            self.signer.sign_digest(digest),
        )
        .await
        .map_err(|_| {
            warn!(
                "signing voucher {} timed out after {:?}",
                voucher.uid, self.config.signing_timeout
            );
            VoucherError::SigningFailure(format!(
                "signer did not respond within {:?}",
                self.config.signing_timeout
            ))
        })?
        .inspect_err(|e| warn!("signing voucher {} failed: {e}", voucher.uid))?;

        // The signature must recover to the configured signer.
        let expected = self.signer.address();
        match recover_address(digest, &signature) {
            Ok(recovered) if recovered == expected => {}
            Ok(recovered) => {
                return Err(VoucherError::SigningFailure(format!(
                    "signature recovers to {recovered}, expected {expected}"
                )))
            }
            Err(e) => return Err(VoucherError::SigningFailure(e.to_string())),
        }

        info!(
            "issued voucher {} ({} -> {}, {} {}) signed by {expected}",
            voucher.uid, voucher.seller, voucher.buyer, voucher.price, voucher.currency
        );
        Ok(voucher.into_signed(signature.to_vec()))
    }
}
