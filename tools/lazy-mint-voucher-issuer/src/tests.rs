use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use alloy_primitives::{address, Address, Bytes, FixedBytes, U256};
use alloy_sol_types::{eip712_domain, SolStruct, SolValue};
use async_trait::async_trait;
use k256::ecdsa::SigningKey;
use lazy_mint_voucher_types::schema::{SIGNATURE_LEN, VOUCHER_FIELDS, VOUCHER_TYPE};

use crate::{
    abi::{abi_encode_redeem_args, LazyMintExternalNftData},
    digest::voucher_digest,
    recover::{is_signed_by, recover_candidates, recover_signer},
    IssuerConfig, LocalSigner, SignedVoucher, SigningDomain, UidStrategy, VoucherError,
    VoucherIssuer, VoucherSigner,
};

// Hardhat's first default account.
const MINTER_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
// Hardhat's second default account.
const OTHER_KEY: &str = "59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d";

const SELLER: &str = "0x5B38Da6a701c568545dCfcB03FcB875f56beddC4";
const BUYER: &str = "0xAb8483F64d9C6d1EcF9b849Ae677dD3315835cb2";

fn tbc_domain() -> SigningDomain {
    SigningDomain::new(
        "tbc",
        "1",
        1,
        address!("7EF2e0048f5bAeDe046f6BF797943daF4ED8CB47"),
    )
}

fn minter() -> LocalSigner {
    LocalSigner::from_hex(MINTER_KEY).unwrap()
}

fn issuer() -> VoucherIssuer<LocalSigner> {
    VoucherIssuer::new(tbc_domain(), minter())
}

async fn sample_voucher() -> SignedVoucher {
    issuer()
        .issue(SELLER, BUYER, "X", U256::ZERO, "1700000000000.123")
        .await
        .unwrap()
}

/// Counts calls and delegates to a local key.
struct CountingSigner {
    inner: LocalSigner,
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl VoucherSigner for CountingSigner {
    fn address(&self) -> Address {
        self.inner.address()
    }

    async fn sign_digest(&self, digest: FixedBytes<32>) -> Result<[u8; SIGNATURE_LEN], VoucherError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.sign_digest(digest).await
    }
}

/// Remote backend that never answers in time.
struct StalledSigner(Address);

#[async_trait]
impl VoucherSigner for StalledSigner {
    fn address(&self) -> Address {
        self.0
    }

    async fn sign_digest(&self, _digest: FixedBytes<32>) -> Result<[u8; SIGNATURE_LEN], VoucherError> {
        tokio::time::sleep(Duration::from_secs(60)).await;
        Err(VoucherError::SigningFailure("unreachable".into()))
    }
}

/// Remote backend that refuses access to the key.
struct DeniedSigner(Address);

#[async_trait]
impl VoucherSigner for DeniedSigner {
    fn address(&self) -> Address {
        self.0
    }

    async fn sign_digest(&self, _digest: FixedBytes<32>) -> Result<[u8; SIGNATURE_LEN], VoucherError> {
        Err(VoucherError::SigningKeyUnavailable("custody: access denied".into()))
    }
}

/// Claims one address but signs with a different key.
struct MismatchedSigner {
    claimed: Address,
    actual: LocalSigner,
}

#[async_trait]
impl VoucherSigner for MismatchedSigner {
    fn address(&self) -> Address {
        self.claimed
    }

    async fn sign_digest(&self, digest: FixedBytes<32>) -> Result<[u8; SIGNATURE_LEN], VoucherError> {
        self.actual.sign_digest(digest).await
    }
}

#[tokio::test]
async fn test_reference_scenario() {
    let signed = sample_voucher().await;

    assert_eq!(signed.voucher.seller.to_checksum(None), SELLER);
    assert_eq!(signed.voucher.buyer.to_checksum(None), BUYER);
    assert_eq!(signed.voucher.currency, "X");
    assert_eq!(signed.voucher.price, U256::ZERO);
    assert_eq!(signed.voucher.uid, "1700000000000.123");

    let sig_hex = &signed.call_args()[5];
    assert!(sig_hex.starts_with("0x"));
    assert_eq!(sig_hex.len(), 2 + 2 * SIGNATURE_LEN);
    assert!(matches!(signed.signature[64], 27 | 28));
}

#[tokio::test]
async fn test_signature_length_independent_of_inputs() {
    let issuer = issuer();
    let long_currency = "C".repeat(500);
    let long_uid = "u".repeat(1000);
    let a = issuer.issue(SELLER, BUYER, "", U256::ZERO, "").await.unwrap();
    let b = issuer
        .issue(SELLER, BUYER, long_currency, U256::MAX, long_uid)
        .await
        .unwrap();
    assert_eq!(a.signature.len(), SIGNATURE_LEN);
    assert_eq!(b.signature.len(), SIGNATURE_LEN);
}

#[tokio::test]
async fn test_signature_recovers_to_signer() {
    let issuer = issuer();
    let cases = [
        ("X", U256::ZERO, "1700000000000.123"),
        ("ETH", U256::from(10u64).pow(U256::from(18u64)), "a3f1"),
        ("USDC", U256::MAX, "ünïcødé-uid"),
        ("", U256::from(1u64), ""),
    ];
    for (currency, price, uid) in cases {
        let signed = issuer.issue(SELLER, BUYER, currency, price, uid).await.unwrap();
        assert_eq!(recover_signer(issuer.domain(), &signed).unwrap(), issuer.signer_address());
        assert!(is_signed_by(issuer.domain(), &signed, issuer.signer_address()));
    }
}

#[tokio::test]
async fn test_any_mutation_breaks_signature() {
    let signed = sample_voucher().await;
    let domain = tbc_domain();
    let minter = minter().address();

    let mut mutations: Vec<SignedVoucher> = Vec::new();

    let mut m = signed.clone();
    m.voucher.seller = m.voucher.buyer;
    mutations.push(m);

    let mut m = signed.clone();
    m.voucher.buyer = m.voucher.seller;
    mutations.push(m);

    let mut m = signed.clone();
    m.voucher.currency = "Y".into();
    mutations.push(m);

    let mut m = signed.clone();
    m.voucher.price = U256::from(1u64);
    mutations.push(m);

    let mut m = signed.clone();
    m.voucher.uid.push('4');
    mutations.push(m);

    for tampered in &mutations {
        assert_ne!(recover_signer(&domain, tampered).ok(), Some(minter));
        assert!(!is_signed_by(&domain, tampered, minter));
    }

    // Same voucher presented under a different domain.
    let other_domains = [
        SigningDomain::new("tbc2", "1", 1, domain.verifying_contract),
        SigningDomain::new("tbc", "2", 1, domain.verifying_contract),
        SigningDomain::new("tbc", "1", 5, domain.verifying_contract),
        SigningDomain::new("tbc", "1", 1, Address::ZERO),
    ];
    for other in &other_domains {
        assert!(!is_signed_by(other, &signed, minter));
    }
}

#[tokio::test]
async fn test_issuance_is_deterministic() {
    let a = sample_voucher().await;
    let b = sample_voucher().await;
    assert_eq!(a.signature, b.signature);
}

#[tokio::test]
async fn test_uid_is_bound_into_signature() {
    let issuer = issuer();
    let a = issuer.issue(SELLER, BUYER, "X", U256::ZERO, "uid-1").await.unwrap();
    let b = issuer.issue(SELLER, BUYER, "X", U256::ZERO, "uid-2").await.unwrap();
    assert_ne!(a.signature, b.signature);
}

#[tokio::test]
async fn test_invalid_address_rejected_before_signing() {
    let calls = Arc::new(AtomicUsize::new(0));
    let signer = CountingSigner {
        inner: minter(),
        calls: Arc::clone(&calls),
    };
    let issuer = VoucherIssuer::new(tbc_domain(), signer);

    let bad_seller = issuer
        .issue("0x5B38Da6a701c568545dCfcB03FcB875f56bedd", BUYER, "X", U256::ZERO, "1")
        .await
        .unwrap_err();
    assert!(matches!(bad_seller, VoucherError::InvalidAddress { field: "seller", .. }));

    let bad_buyer = issuer
        .issue(SELLER, "0xAb8483F64d9C6d1EcF9b849Ae677dD3315835cbG", "X", U256::ZERO, "1")
        .await
        .unwrap_err();
    assert!(matches!(bad_buyer, VoucherError::InvalidAddress { field: "buyer", .. }));

    assert_eq!(calls.load(Ordering::SeqCst), 0);

    issuer.issue(SELLER, BUYER, "X", U256::ZERO, "1").await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_signer_timeout_is_signing_failure() {
    let config = IssuerConfig {
        signing_timeout: Duration::from_millis(20),
        ..IssuerConfig::default()
    };
    let issuer = VoucherIssuer::with_config(tbc_domain(), StalledSigner(Address::ZERO), config);
    let err = issuer.issue(SELLER, BUYER, "X", U256::ZERO, "1").await.unwrap_err();
    assert!(matches!(err, VoucherError::SigningFailure(_)), "{err:?}");
}

#[tokio::test]
async fn test_backend_errors_surface_unmodified() {
    let issuer = VoucherIssuer::new(tbc_domain(), DeniedSigner(Address::ZERO));
    let err = issuer.issue(SELLER, BUYER, "X", U256::ZERO, "1").await.unwrap_err();
    assert_eq!(
        err,
        VoucherError::SigningKeyUnavailable("custody: access denied".into())
    );
}

#[tokio::test]
async fn test_signature_from_wrong_key_is_rejected() {
    let signer = MismatchedSigner {
        claimed: minter().address(),
        actual: LocalSigner::from_hex(OTHER_KEY).unwrap(),
    };
    let issuer = VoucherIssuer::new(tbc_domain(), signer);
    let err = issuer.issue(SELLER, BUYER, "X", U256::ZERO, "1").await.unwrap_err();
    assert!(matches!(err, VoucherError::SigningFailure(_)), "{err:?}");
}

#[tokio::test]
async fn test_generated_uids() {
    for strategy in [UidStrategy::Random, UidStrategy::Timestamp] {
        let config = IssuerConfig {
            uid_strategy: strategy,
            ..IssuerConfig::default()
        };
        let issuer = VoucherIssuer::with_config(tbc_domain(), minter(), config);
        let a = issuer
            .issue_with_generated_uid(SELLER, BUYER, "X", U256::ZERO)
            .await
            .unwrap();
        let b = issuer
            .issue_with_generated_uid(SELLER, BUYER, "X", U256::ZERO)
            .await
            .unwrap();
        assert!(is_signed_by(issuer.domain(), &a, issuer.signer_address()));
        match strategy {
            UidStrategy::Random => {
                assert_ne!(a.voucher.uid, b.voucher.uid);
                assert_ne!(a.signature, b.signature);
            }
            UidStrategy::Timestamp => {
                assert!(a.voucher.uid.parse::<f64>().is_ok());
                assert!(b.voucher.uid.parse::<f64>().is_ok());
            }
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_issuance() {
    let issuer = Arc::new(issuer());
    let handles: Vec<_> = (0..16)
        .map(|i| {
            let issuer = Arc::clone(&issuer);
            tokio::spawn(async move {
                issuer
                    .issue(SELLER, BUYER, "X", U256::from(i as u64), format!("uid-{i}"))
                    .await
            })
        })
        .collect();

    for handle in handles {
        let signed = handle.await.unwrap().unwrap();
        assert!(is_signed_by(issuer.domain(), &signed, issuer.signer_address()));
    }
}

#[test]
fn test_digest_matches_sol_struct_hash() {
    let domain = tbc_domain();
    let voucher = lazy_mint_voucher_types::Voucher {
        seller: SELLER.parse().unwrap(),
        buyer: BUYER.parse().unwrap(),
        currency: "X".into(),
        price: U256::from(42u64),
        uid: "1700000000000.123".into(),
    };

    let sol_domain = eip712_domain! {
        name: domain.name.clone(),
        version: domain.version.clone(),
        chain_id: domain.chain_id,
        verifying_contract: domain.verifying_contract,
    };
    let sol_voucher = LazyMintExternalNftData::from(&voucher);

    assert_eq!(LazyMintExternalNftData::eip712_encode_type(), VOUCHER_TYPE);
    assert_eq!(
        sol_voucher.eip712_signing_hash(&sol_domain),
        voucher_digest(&domain, &voucher)
    );
}

#[tokio::test]
async fn test_matches_ethers_sign_typed_data() {
    use ethers::{
        signers::{LocalWallet, Signer},
        types::transaction::eip712::{Eip712, TypedData},
    };
    use serde_json::json;

    let signed = issuer()
        .issue(SELLER, BUYER, "X", U256::from(1_000u64), "1700000000000.123")
        .await
        .unwrap();
    let domain = tbc_domain();

    let voucher_fields: Vec<_> = VOUCHER_FIELDS
        .iter()
        .map(|(name, ty)| json!({ "name": name, "type": ty }))
        .collect();
    let typed: TypedData = serde_json::from_value(json!({
        "types": {
            "EIP712Domain": [
                { "name": "name", "type": "string" },
                { "name": "version", "type": "string" },
                { "name": "chainId", "type": "uint256" },
                { "name": "verifyingContract", "type": "address" }
            ],
            "LazyMintExternalNftData": voucher_fields
        },
        "primaryType": "LazyMintExternalNftData",
        "domain": {
            "name": domain.name,
            "version": domain.version,
            "chainId": domain.chain_id,
            "verifyingContract": domain.verifying_contract.to_checksum(None)
        },
        "message": {
            "seller": SELLER,
            "buyer": BUYER,
            "currency": "X",
            "price": "1000",
            "uid": "1700000000000.123"
        }
    }))
    .unwrap();

    let hash = typed.encode_eip712().unwrap();
    assert_eq!(hash, voucher_digest(&domain, &signed.voucher).0);

    let wallet: LocalWallet = MINTER_KEY.parse().unwrap();
    let reference = wallet.sign_typed_data(&typed).await.unwrap();
    assert_eq!(reference.to_vec(), signed.signature.to_vec());

    let recovered = reference.recover(hash).unwrap();
    assert_eq!(recovered.as_bytes(), minter().address().as_slice());
}

#[tokio::test]
async fn test_abi_encoded_redeem_args_decode() {
    let signed = sample_voucher().await;
    let encoded = abi_encode_redeem_args(&signed);

    let (seller, buyer, currency, price, uid, signature) =
        <(Address, Address, String, U256, String, Bytes)>::abi_decode_params(&encoded, true)
            .unwrap();
    assert_eq!(seller, signed.voucher.seller);
    assert_eq!(buyer, signed.voucher.buyer);
    assert_eq!(currency, signed.voucher.currency);
    assert_eq!(price, signed.voucher.price);
    assert_eq!(uid, signed.voucher.uid);
    assert_eq!(signature, signed.signature);
}

#[tokio::test]
async fn test_recover_handles_each_v_encoding() {
    let issuer = issuer();
    let minter = minter().address();
    let domain = tbc_domain();
    let mut seen = [false; 2];

    for i in 0..20 {
        let mut signed = issuer
            .issue(SELLER, BUYER, "X", U256::ZERO, format!("u{i}"))
            .await
            .unwrap();
        let v = signed.signature[64];
        assert!(v == 27 || v == 28, "v = {v}");
        seen[usize::from(v - 27)] = true;

        signed.signature = with_v(&signed.signature, v - 27);
        assert_eq!(recover_signer(&domain, &signed).unwrap(), minter);
        assert!(is_signed_by(&domain, &signed, minter));

        // Unknown v: no single signer, but either parity may match.
        signed.signature = with_v(&signed.signature, 99);
        assert!(is_signed_by(&domain, &signed, minter), "uid u{i}, original v = {v}");
        assert!(matches!(
            recover_signer(&domain, &signed),
            Err(VoucherError::InvalidSignature(_))
        ));
        let candidates =
            recover_candidates(voucher_digest(&domain, &signed.voucher), &signed.signature).unwrap();
        assert!(candidates.contains(&minter));
        assert!(!is_signed_by(&domain, &signed, Address::ZERO));
    }

    assert_eq!(seen, [true, true], "both recovery parities should occur over 20 uids");
}

fn with_v(sig: &Bytes, v: u8) -> Bytes {
    let mut raw = sig.to_vec();
    raw[64] = v;
    raw.into()
}

#[test]
fn test_recover_rejects_wrong_length() {
    let voucher = lazy_mint_voucher_types::Voucher {
        seller: Address::ZERO,
        buyer: Address::ZERO,
        currency: String::new(),
        price: U256::ZERO,
        uid: String::new(),
    }
    .into_signed(vec![0u8; 64]);
    assert!(matches!(
        recover_signer(&tbc_domain(), &voucher),
        Err(VoucherError::InvalidSignature(_))
    ));
}

#[test]
fn test_random_key_round_trip_address() {
    let key = SigningKey::random(&mut rand::rngs::OsRng);
    let signer = LocalSigner::from_signing_key(key.clone());
    let from_hex = LocalSigner::from_hex(&hex::encode(key.to_bytes())).unwrap();
    assert_eq!(signer.address(), from_hex.address());
}
