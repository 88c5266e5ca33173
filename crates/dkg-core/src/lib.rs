//! # dkg-core
//!
//! The deterministic core of the DKG client - THE LOGIC.
//!
//! This crate holds everything about the DKG client that does not need a
//! network: the identifiers that correlate on-chain and off-chain state, the
//! error taxonomy shared by every layer, and the Merkle primitives used to
//! check proofs returned by a node.
//!
//! ## Architectural Constraints
//!
//! - No async, no network dependencies (pure Rust)
//! - UAL strings and Merkle hashes are byte-stable across implementations
//! - Chain configuration is handed out as owned snapshots, never shared

// =============================================================================
// MODULES
// =============================================================================

pub mod blockchain;
pub mod merkle;
pub mod types;
pub mod ual;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{DkgError, OperationHandle, OperationKind, OperationStatus};

// =============================================================================
// RE-EXPORTS: Identifiers & Proofs
// =============================================================================

pub use merkle::{
    Hash32, Position, ProofStep, assertion_id, inclusion_proof, leaf_hash, merkle_root, parse_hash, to_hex,
    triples_root, verify_inclusion,
};
pub use ual::{Ual, decode as decode_ual, encode as encode_ual, parse_token_id};

// =============================================================================
// RE-EXPORTS: Blockchain
// =============================================================================

pub use blockchain::{
    BlockchainConfig, BlockchainTable, ChainErrorKind, ContractHandle, ContractName, ContractSet,
    DEFAULT_GAS_PRICE, GAS_LIMIT_FLOOR,
};
