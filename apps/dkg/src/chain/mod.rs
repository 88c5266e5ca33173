//! # Chain Layer
//!
//! Contract resolution and execution on top of a [`ChainProvider`].
//!
//! - `provider` - the RPC/signing seam and its call/receipt types
//! - `retry` - retry policy shared by reads and writes
//! - `executor` - transaction and read executors
//! - `registry` - hub-based contract resolution

pub mod executor;
pub mod provider;
pub mod registry;
pub mod retry;

#[cfg(test)]
pub(crate) mod mock;

pub use executor::{ReadExecutor, TransactionExecutor};
pub use provider::{
    CallArg, ChainError, ChainProvider, ContractCall, ReceiptLog, SignedTransaction,
    TransactionReceipt, UnsignedTransaction,
};
pub use registry::ContractRegistryResolver;
pub use retry::{Classifier, RetryDecision, RetryPolicy, retry_transient};
