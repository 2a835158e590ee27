use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use alloy_primitives::U256;
use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use lazy_mint_voucher_issuer::{
    abi::abi_encode_redeem_args, address::parse_address, digest::voucher_digest,
    recover::recover_candidates, IssuerConfig, LocalSigner, SignedVoucher, SignerConfig,
    SigningDomain, UidStrategy, VoucherIssuer, VoucherSigner,
};
use log::{info, warn};
use serde_json::{json, Value};
use time::{format_description::well_known::Rfc3339, OffsetDateTime};

/// Issue and verify EIP-712 lazy-mint vouchers.
///
/// Key material and domain parameters come from flags, environment variables or a `.env` file;
/// nothing is hard-coded. Logs go to stderr, results to stdout.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build and sign a voucher.
    Issue(IssueArgs),
    /// Recover the signer of a voucher JSON file.
    Verify(VerifyArgs),
    /// Print the address of the configured signing key.
    Signer(KeyArgs),
}

#[derive(Args, Debug)]
struct KeyArgs {
    /// Private key (hex string, 0x...).
    #[arg(long, env = "PKEY", hide_env_values = true, conflicts_with = "private_key_path")]
    private_key: Option<String>,

    /// Path to a file containing the signer private key.
    #[arg(long, env = "PRIV_KEY_PATH", conflicts_with = "private_key")]
    private_key_path: Option<PathBuf>,
}

impl KeyArgs {
    fn signer_config(&self) -> SignerConfig {
        SignerConfig {
            private_key: self.private_key.clone(),
            private_key_path: self.private_key_path.clone(),
        }
    }
}

#[derive(Args, Debug)]
struct DomainArgs {
    /// JSON file with `{ name, version, chainId, verifyingContract }`.
    #[arg(
        long,
        conflicts_with_all = ["domain_name", "domain_version", "chain_id", "verifying_contract"]
    )]
    domain_file: Option<PathBuf>,

    /// EIP-712 domain name; must match the contract exactly.
    #[arg(long, env = "DOMAIN_NAME")]
    domain_name: Option<String>,

    /// EIP-712 domain version; must match the contract exactly.
    #[arg(long, env = "DOMAIN_VERSION")]
    domain_version: Option<String>,

    #[arg(long, env = "CHAIN_ID")]
    chain_id: Option<u64>,

    /// Address of the contract that verifies the voucher.
    #[arg(long, env = "VERIFYING_CONTRACT")]
    verifying_contract: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// `["seller", "buyer", "currency", "price", "uid", "signature"]`
    Args,
    /// Field-tagged JSON record.
    Json,
    /// ABI-encoded redemption arguments (no selector).
    Calldata,
}

#[derive(Args, Debug)]
struct IssueArgs {
    #[command(flatten)]
    domain: DomainArgs,

    #[command(flatten)]
    key: KeyArgs,

    #[arg(long)]
    seller: String,

    #[arg(long)]
    buyer: String,

    /// Currency ticker; the contract decides which sentinel means "none".
    #[arg(long)]
    currency: String,

    /// Price in the currency's smallest unit (decimal).
    #[arg(long, default_value = "0")]
    price: String,

    /// Explicit uid. When omitted one is generated with `--uid-strategy`.
    #[arg(long)]
    uid: Option<String>,

    #[arg(long, default_value_t = UidStrategy::Random)]
    uid_strategy: UidStrategy,

    #[arg(long, value_enum, default_value_t = OutputFormat::Args)]
    format: OutputFormat,

    /// Record the issued voucher under its uid in this JSON file (eg, vouchers.json).
    #[arg(long)]
    out: Option<PathBuf>,

    /// Upper bound on the signing call, in milliseconds.
    #[arg(long, env = "SIGNING_TIMEOUT_MS", default_value_t = 30_000)]
    timeout_ms: u64,
}

#[derive(Args, Debug)]
struct VerifyArgs {
    #[command(flatten)]
    domain: DomainArgs,

    /// Voucher JSON as printed by `issue --format json`.
    voucher: PathBuf,

    /// Fail unless the voucher recovers to this address.
    #[arg(long)]
    expected_signer: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match cli.command {
        Command::Issue(args) => issue(args).await,
        Command::Verify(args) => verify(args),
        Command::Signer(args) => {
            let signer = LocalSigner::from_config(&args.signer_config())?;
            println!("{}", signer.address().to_checksum(None));
            Ok(())
        }
    }
}

async fn issue(args: IssueArgs) -> Result<()> {
    let domain = resolve_domain(&args.domain)?;
    let price = U256::from_str_radix(args.price.trim(), 10)
        .map_err(|e| anyhow!("invalid price `{}`: {e}", args.price))?;

    let config = IssuerConfig {
        uid_strategy: args.uid_strategy,
        signing_timeout: Duration::from_millis(args.timeout_ms),
    };
    let issuer = VoucherIssuer::from_config(domain, &args.key.signer_config(), config)?;
    info!(
        "signing for {} v{} on chain {} ({}) as {}",
        issuer.domain().name,
        issuer.domain().version,
        issuer.domain().chain_id,
        issuer.domain().verifying_contract,
        issuer.signer_address()
    );

    let signed = match args.uid {
        Some(uid) => {
            issuer
                .issue(&args.seller, &args.buyer, args.currency, price, uid)
                .await?
        }
        None => {
            issuer
                .issue_with_generated_uid(&args.seller, &args.buyer, args.currency, price)
                .await?
        }
    };
    info!("uid {}", signed.voucher.uid);

    if let Some(path) = &args.out {
        let signer = issuer.signer_address().to_checksum(None);
        write_voucher_record(path, issuer.domain(), &signed, &signer)?;
        info!("recorded voucher {} in {}", signed.voucher.uid, path.display());
    }

    println!("{}", render(&signed, args.format)?);
    Ok(())
}

fn verify(args: VerifyArgs) -> Result<()> {
    let domain = resolve_domain(&args.domain)?;
    let raw = fs::read_to_string(&args.voucher)
        .with_context(|| format!("failed reading {}", args.voucher.display()))?;
    let signed: SignedVoucher = serde_json::from_str(&raw)
        .with_context(|| format!("failed parsing voucher JSON in {}", args.voucher.display()))?;

    // A recognised v yields one address; anything else yields one per parity.
    let candidates = recover_candidates(voucher_digest(&domain, &signed.voucher), &signed.signature)?;
    for candidate in &candidates {
        println!("{}", candidate.to_checksum(None));
    }

    if let Some(expected) = &args.expected_signer {
        let expected = parse_address("expected signer", expected)?;
        if !candidates.contains(&expected) {
            warn!("voucher {} is not signed by {expected}", signed.voucher.uid);
            return Err(anyhow!(
                "voucher {} recovers to {candidates:?}, expected {expected}",
                signed.voucher.uid
            ));
        }
    }
    Ok(())
}

fn resolve_domain(args: &DomainArgs) -> Result<SigningDomain> {
    if let Some(path) = &args.domain_file {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed reading {}", path.display()))?;
        return serde_json::from_str(&raw)
            .with_context(|| format!("failed parsing domain JSON in {}", path.display()));
    }

    let name = args.domain_name.clone().ok_or_else(|| {
        anyhow!("missing domain name: provide --domain-name or --domain-file (or set DOMAIN_NAME)")
    })?;
    let version = args.domain_version.clone().ok_or_else(|| {
        anyhow!("missing domain version: provide --domain-version or --domain-file (or set DOMAIN_VERSION)")
    })?;
    let chain_id = args.chain_id.ok_or_else(|| {
        anyhow!("missing chain id: provide --chain-id or --domain-file (or set CHAIN_ID)")
    })?;
    let contract = args.verifying_contract.as_deref().ok_or_else(|| {
        anyhow!("missing verifying contract: provide --verifying-contract or --domain-file (or set VERIFYING_CONTRACT)")
    })?;
    let verifying_contract = parse_address("verifying contract", contract)?;

    Ok(SigningDomain::new(name, version, chain_id, verifying_contract))
}

fn render(signed: &SignedVoucher, format: OutputFormat) -> Result<String> {
    Ok(match format {
        OutputFormat::Args => signed.to_string(),
        OutputFormat::Json => {
            serde_json::to_string_pretty(signed).context("failed serialising voucher JSON")?
        }
        OutputFormat::Calldata => format!("0x{}", hex::encode(abi_encode_redeem_args(signed))),
    })
}

/// Add `signed` to the `vouchers` map of the JSON file at `path`, keyed by uid.
///
/// Each entry carries the domain it was signed under. A uid already present in the file is
/// refused; the contract remains the real replay guard.
fn write_voucher_record(
    path: &Path,
    domain: &SigningDomain,
    signed: &SignedVoucher,
    signer: &str,
) -> Result<()> {
    let now = OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| "unknown".to_string());

    let existing = if path.exists() {
        fs::read_to_string(path).with_context(|| format!("failed reading {}", path.display()))?
    } else {
        String::new()
    };

    let mut root: Value = if existing.trim().is_empty() {
        json!({})
    } else {
        serde_json::from_str(&existing)
            .with_context(|| format!("failed parsing voucher record in {}", path.display()))?
    };

    if !root.is_object() {
        root = json!({});
    }

    root["updated_at"] = json!(now);

    if root.get("vouchers").and_then(Value::as_object).is_none() {
        root["vouchers"] = json!({});
    }

    let uid = &signed.voucher.uid;
    if root["vouchers"].get(uid).is_some() {
        return Err(anyhow!("uid `{uid}` is already recorded in {}", path.display()));
    }

    let mut entry = serde_json::to_value(signed).context("failed serialising voucher")?;
    entry["domain"] = serde_json::to_value(domain).context("failed serialising domain")?;
    entry["signer"] = json!(signer);
    entry["issued_at"] = json!(now);
    root["vouchers"][uid] = entry;

    write_record_atomic(path, &root)
}

fn write_record_atomic(path: &Path, record: &Value) -> Result<()> {
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    if !parent.exists() {
        fs::create_dir_all(parent)
            .with_context(|| {
                format!("failed creating voucher record directory {}", parent.display())
            })?;
    }

    let serialised =
        serde_json::to_string_pretty(record).context("failed serialising voucher record")?;
    let staging = staging_path_for(path);
    fs::write(&staging, serialised.as_bytes())
        .with_context(|| format!("failed staging voucher record at {}", staging.display()))?;
    fs::rename(&staging, path)
        .with_context(|| format!("failed replacing voucher record {}", path.display()))?;
    Ok(())
}

fn staging_path_for(path: &Path) -> PathBuf {
    let mut tmp = path.as_os_str().to_os_string();
    tmp.push(".staging");
    PathBuf::from(tmp)
}
