//! Voucher uid generation.
//!
//! Uniqueness here is probabilistic; the verifying contract's consumed-uid tracking is what
//! actually rejects replays.

use std::{fmt, str::FromStr};

use rand::{rngs::OsRng, Rng, RngCore};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UidStrategy {
    /// 128 bits from the OS RNG, lowercase hex (32 chars).
    #[default]
    Random,
    /// Unix milliseconds plus a random fraction in `[0, 1)`, as a decimal float string
    /// (e.g. `1700000000000.123`). Kept for contracts that were fed uids in this shape.
    Timestamp,
}

impl UidStrategy {
    pub fn generate(&self) -> String {
        match self {
            UidStrategy::Random => random_uid(),
            UidStrategy::Timestamp => timestamp_uid(),
        }
    }
}

impl fmt::Display for UidStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UidStrategy::Random => f.write_str("random"),
            UidStrategy::Timestamp => f.write_str("timestamp"),
        }
    }
}

impl FromStr for UidStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "random" => Ok(UidStrategy::Random),
            "timestamp" => Ok(UidStrategy::Timestamp),
            other => Err(format!("unknown uid strategy `{other}` (expected random|timestamp)")),
        }
    }
}

fn random_uid() -> String {
    let mut bytes = [0u8; 16];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

fn timestamp_uid() -> String {
    let millis = OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000;
    let fraction: f64 = OsRng.gen();
    (millis as f64 + fraction).to_string()
}
