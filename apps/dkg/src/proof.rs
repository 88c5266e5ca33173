//! # Proof Validator
//!
//! Checks per-triple Merkle inclusion proofs returned by a node against the
//! root hash recorded for their assertion.
//!
//! Root hashes come from a [`RootHashSource`]. The client resolves them
//! through the node; tests supply them directly.

use async_trait::async_trait;
use dkg_core::{DkgError, Hash32, ProofStep, leaf_hash, verify_inclusion};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Supplies the root hash an assertion was anchored with.
#[async_trait]
pub trait RootHashSource: Send + Sync {
    async fn root_hash(&self, assertion_id: &str) -> Result<Hash32, DkgError>;
}

/// Proof for one triple; `proof` is null when the node has nothing to prove.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TripleProof {
    pub triple: String,
    #[serde(default)]
    pub proof: Option<Vec<ProofStep>>,
}

/// All triple proofs the node returned for one assertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssertionProofs {
    pub assertion_id: String,
    #[serde(default)]
    pub proofs: Vec<TripleProof>,
}

impl AssertionProofs {
    /// Parse the payload of a completed `proofs:get` operation.
    pub fn from_payload(payload: &Value) -> Result<Vec<Self>, DkgError> {
        serde_json::from_value(payload.clone())
            .map_err(|e| DkgError::Serialization(format!("Invalid proofs payload: {e}")))
    }
}

/// Outcome for one non-null proof.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofValidation {
    pub assertion_id: String,
    pub triple: String,
    pub valid: bool,
}

/// Verify every non-null proof in `assertions`.
///
/// One root hash lookup per assertion. Null proofs produce no record; a
/// proof with an undecodable step is recorded as invalid.
pub async fn validate_proofs(
    source: &dyn RootHashSource,
    assertions: &[AssertionProofs],
) -> Result<Vec<ProofValidation>, DkgError> {
    let mut results = Vec::new();

    for assertion in assertions {
        let root = source.root_hash(&assertion.assertion_id).await?;

        for entry in &assertion.proofs {
            let Some(proof) = &entry.proof else {
                continue;
            };
            let valid = verify_inclusion(&leaf_hash(&entry.triple), proof, &root)
                .unwrap_or_else(|err| {
                    tracing::debug!(error = %err, "Undecodable proof step");
                    false
                });
            if !valid {
                tracing::warn!(assertion = %assertion.assertion_id, triple = %entry.triple, "Proof rejected");
            }
            results.push(ProofValidation {
                assertion_id: assertion.assertion_id.clone(),
                triple: entry.triple.clone(),
                valid,
            });
        }
    }

    Ok(results)
}
