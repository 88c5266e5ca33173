//! # dkg
//!
//! Client library for a Decentralized Knowledge Graph node - THE CLIENT.
//!
//! ## Modules
//!
//! - `node` - reqwest client for the node REST API
//! - `operation` - result resolver and streaming search poller
//! - `chain` - chain provider seam, retry policy, executors, contract registry
//! - `asset` - create, update, transfer and inspect knowledge assets
//! - `proof` - Merkle inclusion proof validation
//! - `canon` - canonical triple conversion
//! - `config` - TOML and environment configuration
//! - `cli` - the `dkg` command line
//!
//! ## Flow
//!
//! ```text
//!  request ─▶ NodeClient ─▶ handle ─▶ OperationResultResolver ─▶ result
//!                                  └▶ SearchPoller ─▶ callback* ─▶ result
//!
//!  asset ─▶ ContractRegistryResolver ─▶ TransactionExecutor ─▶ UAL ─▶ publish
//! ```

pub mod asset;
pub mod canon;
pub mod chain;
pub mod cli;
pub mod client;
pub mod config;
pub mod node;
pub mod operation;
pub mod proof;

pub use asset::{AssetOptions, AssetResult, AssetService};
pub use client::DkgClient;
pub use config::ClientConfig;
