//! # Universal Asset Locator
//!
//! A UAL ties an on-chain token to an off-chain graph asset:
//!
//! ```text
//! did:dkg:<chain>/<contract>/<tokenId>
//! ```
//!
//! Chain and contract are lower-cased on encode. Chain names starting with the
//! reserved `otp` prefix are collapsed to `otp`.
//!
//! Decoding accepts chain identifiers carrying one extra `:` (for example
//! `otp:2043`). The four colon-separated pieces are reassembled into the
//! canonical three-field shape with the inner colon kept, so the chain comes
//! back exactly as it was written. The reserved-prefix collapse is applied by
//! [`encode`] and [`Ual::new`] only; formatting a decoded `Ual` reproduces
//! the original locator.

use crate::DkgError;
use std::fmt;
use std::str::FromStr;

/// Scheme prefix of every UAL.
pub const UAL_PREFIX: &str = "did:dkg:";

/// Chain names starting with this prefix are encoded as the prefix alone.
pub const RESERVED_CHAIN_PREFIX: &str = "otp";

/// A decoded Universal Asset Locator.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Ual {
    /// Chain identifier, lower-case.
    pub chain: String,
    /// Registry contract address, lower-case.
    pub contract: String,
    /// On-chain token id.
    pub token_id: u64,
}

impl Ual {
    /// Build a UAL, applying the same normalization as [`encode`].
    #[must_use]
    pub fn new(chain: &str, contract: &str, token_id: u64) -> Self {
        Self {
            chain: normalize_chain(chain),
            contract: contract.to_lowercase(),
            token_id,
        }
    }

    /// Parse a UAL string. See [`decode`].
    pub fn parse(ual: &str) -> Result<Self, DkgError> {
        decode(ual)
    }
}

impl fmt::Display for Ual {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{UAL_PREFIX}{}/{}/{}",
            self.chain.to_lowercase(),
            self.contract.to_lowercase(),
            self.token_id
        )
    }
}

impl FromStr for Ual {
    type Err = DkgError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        decode(s)
    }
}

/// Lower-case a chain name and collapse reserved-prefix chains.
#[must_use]
pub fn normalize_chain(chain: &str) -> String {
    let lower = chain.to_lowercase();
    if lower.starts_with(RESERVED_CHAIN_PREFIX) {
        RESERVED_CHAIN_PREFIX.to_string()
    } else {
        lower
    }
}

/// Encode a UAL string.
#[must_use]
pub fn encode(chain: &str, contract: &str, token_id: u64) -> String {
    Ual::new(chain, contract, token_id).to_string()
}

/// Decode a UAL string into its chain, contract and token id.
///
/// Fails with [`DkgError::Format`] when the scheme is not `did:dkg`, when the
/// locator has more than one extra `:`, or when the path does not split into
/// exactly three non-empty `/` segments with a numeric token id.
pub fn decode(ual: &str) -> Result<Ual, DkgError> {
    let colon: Vec<&str> = ual.split(':').collect();

    let path = match colon.as_slice() {
        ["did", "dkg", path] => (*path).to_string(),
        ["did", "dkg", chain_head, rest] => format!("{chain_head}:{rest}"),
        _ => {
            return Err(DkgError::Format(format!(
                "UAL doesn't have correct format: {ual}"
            )));
        }
    };

    let segments: Vec<&str> = path.split('/').collect();
    let [chain, contract, token_id] = segments.as_slice() else {
        return Err(DkgError::Format(format!(
            "UAL must have exactly 3 path segments, found {}: {ual}",
            segments.len()
        )));
    };

    if chain.is_empty() || contract.is_empty() {
        return Err(DkgError::Format(format!("UAL has an empty segment: {ual}")));
    }

    let token_id = parse_token_id(token_id)
        .map_err(|_| DkgError::Format(format!("UAL token id is not an integer: {ual}")))?;

    Ok(Ual {
        chain: chain.to_lowercase(),
        contract: contract.to_lowercase(),
        token_id,
    })
}

/// Parse a decimal token id as written in a UAL or an event log.
///
/// Only plain digits are accepted, without sign or leading zeros, so a
/// parsed id always formats back to the same text. Ids above `u64::MAX`
/// are rejected.
pub fn parse_token_id(raw: &str) -> Result<u64, DkgError> {
    let canonical = !raw.is_empty()
        && raw.bytes().all(|b| b.is_ascii_digit())
        && (raw == "0" || !raw.starts_with('0'));
    if !canonical {
        return Err(DkgError::Format(format!(
            "Token id is not a decimal integer: '{raw}'"
        )));
    }
    raw.parse()
        .map_err(|_| DkgError::Format(format!("Token id '{raw}' exceeds {}", u64::MAX)))
}

// =============================================================================
// TESTS
// =============================================================================
