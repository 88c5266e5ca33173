//! # Merkle Proofs
//!
//! SHA-256 Merkle tree over assertion triples.
//!
//! - Leaf: `sha256(triple)`
//! - Parent: `sha256(left || right)`
//! - An odd trailing node is promoted to the next level unchanged
//!
//! Proofs are lists of sibling hashes tagged with the side the sibling sits
//! on, in leaf-to-root order. This is the shape nodes return from the proofs
//! endpoint.

use crate::DkgError;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

pub type Hash32 = [u8; 32];

/// Side of the sibling hash relative to the running hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Position {
    Left,
    Right,
}

/// One level of an inclusion proof.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofStep {
    pub position: Position,
    /// Sibling hash, hex encoded (optional `0x`).
    pub data: String,
}

impl ProofStep {
    #[must_use]
    pub fn new(position: Position, hash: &Hash32) -> Self {
        Self {
            position,
            data: to_hex(hash),
        }
    }
}

fn sha256(bytes: &[u8]) -> Hash32 {
    let mut h = Sha256::new();
    h.update(bytes);
    h.finalize().into()
}

/// Hash of a single triple.
pub fn leaf_hash(triple: &str) -> Hash32 {
    sha256(triple.as_bytes())
}

pub fn node_hash(left: &Hash32, right: &Hash32) -> Hash32 {
    let mut buf = [0u8; 64];
    buf[..32].copy_from_slice(left);
    buf[32..].copy_from_slice(right);
    sha256(&buf)
}

/// `0x`-prefixed lower-case hex.
pub fn to_hex(hash: &Hash32) -> String {
    format!("0x{}", hex::encode(hash))
}

/// Parse a 32-byte hash from hex, with or without `0x`.
pub fn parse_hash(value: &str) -> Result<Hash32, DkgError> {
    let trimmed = value.strip_prefix("0x").unwrap_or(value);
    let bytes = hex::decode(trimmed)
        .map_err(|e| DkgError::Format(format!("Invalid hash '{value}': {e}")))?;
    bytes
        .try_into()
        .map_err(|_| DkgError::Format(format!("Hash '{value}' is not 32 bytes")))
}

fn next_level(level: &[Hash32]) -> Vec<Hash32> {
    level
        .chunks(2)
        .map(|pair| match pair {
            [left, right] => node_hash(left, right),
            _ => pair[0],
        })
        .collect()
}

/// Root over the given leaf hashes. The empty tree hashes the empty string.
pub fn merkle_root(leaves: &[Hash32]) -> Hash32 {
    if leaves.is_empty() {
        return sha256(b"");
    }
    let mut level = leaves.to_vec();
    while level.len() > 1 {
        level = next_level(&level);
    }
    level[0]
}

/// Root over a list of triples.
pub fn triples_root(triples: &[String]) -> Hash32 {
    let leaves: Vec<Hash32> = triples.iter().map(|t| leaf_hash(t)).collect();
    merkle_root(&leaves)
}

/// Content address of an assertion: `sha256` over its canonical triples
/// joined by newlines.
pub fn assertion_id(triples: &[String]) -> Hash32 {
    sha256(triples.join("\n").as_bytes())
}

/// Build the inclusion proof for `leaves[index]`.
pub fn inclusion_proof(leaves: &[Hash32], index: usize) -> Result<Vec<ProofStep>, DkgError> {
    if index >= leaves.len() {
        return Err(DkgError::Format(format!(
            "Leaf index {index} out of range for {} leaves",
            leaves.len()
        )));
    }

    let mut proof = Vec::new();
    let mut level = leaves.to_vec();
    let mut idx = index;

    while level.len() > 1 {
        let sibling = idx ^ 1;
        if let Some(hash) = level.get(sibling) {
            let position = if idx % 2 == 1 {
                Position::Left
            } else {
                Position::Right
            };
            proof.push(ProofStep::new(position, hash));
        }
        level = next_level(&level);
        idx /= 2;
    }

    Ok(proof)
}

/// Fold `proof` over `leaf` and compare with `root`.
///
/// Returns `Ok(false)` for a well-formed proof that does not reach the root,
/// and a format error when a sibling hash cannot be parsed.
pub fn verify_inclusion(leaf: &Hash32, proof: &[ProofStep], root: &Hash32) -> Result<bool, DkgError> {
    let mut hash = *leaf;
    for step in proof {
        let sibling = parse_hash(&step.data)?;
        hash = match step.position {
            Position::Left => node_hash(&sibling, &hash),
            Position::Right => node_hash(&hash, &sibling),
        };
    }
    Ok(&hash == root)
}

// =============================================================================
// TESTS
// =============================================================================
