//! # Canonicalization
//!
//! Assertion content must reach the chain and the node as the same ordered
//! list of triples, otherwise assertion ids and root hashes disagree.
//! [`Canonicalizer`] is the seam for that conversion.
//!
//! [`NQuadsCanonicalizer`] accepts content that is already N-Quads. Full
//! JSON-LD canonicalization belongs to an external implementation.

use dkg_core::DkgError;
use serde_json::{Map, Value, json};

/// Deterministic conversion between assertion content and canonical triples.
pub trait Canonicalizer: Send + Sync {
    /// Canonical, order-stable triples for `content`.
    fn to_canonical_triples(&self, content: &str) -> Result<Vec<String>, DkgError>;

    /// Graph view of canonical triples.
    fn to_graph(&self, triples: &[String]) -> Result<Value, DkgError>;
}

/// Pass-through for N-Quads input: trims, drops blanks and comments, sorts, dedups.
#[derive(Debug, Clone, Copy, Default)]
pub struct NQuadsCanonicalizer;

impl Canonicalizer for NQuadsCanonicalizer {
    fn to_canonical_triples(&self, content: &str) -> Result<Vec<String>, DkgError> {
        let mut triples: Vec<String> = content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(str::to_string)
            .collect();

        if let Some(bad) = triples.iter().find(|t| !t.ends_with('.')) {
            return Err(DkgError::Format(format!("Not an N-Quads statement: {bad}")));
        }

        triples.sort();
        triples.dedup();
        Ok(triples)
    }

    fn to_graph(&self, triples: &[String]) -> Result<Value, DkgError> {
        let mut subjects: Map<String, Value> = Map::new();

        for triple in triples {
            let body = triple.trim().trim_end_matches('.').trim_end();
            let mut parts = body.splitn(3, char::is_whitespace);
            let (Some(subject), Some(predicate), Some(object)) =
                (parts.next(), parts.next(), parts.next())
            else {
                return Err(DkgError::Format(format!("Malformed triple: {triple}")));
            };

            let entry = subjects
                .entry(subject.to_string())
                .or_insert_with(|| json!({ "@id": subject }));
            if let Some(node) = entry.as_object_mut() {
                let values = node
                    .entry(predicate.to_string())
                    .or_insert_with(|| Value::Array(Vec::new()));
                if let Some(list) = values.as_array_mut() {
                    list.push(Value::String(object.trim().to_string()));
                }
            }
        }

        Ok(json!({ "@graph": subjects.into_iter().map(|(_, v)| v).collect::<Vec<_>>() }))
    }
}
