//! # Node Module
//!
//! REST client for a DKG node and the wire types it exchanges.

mod client;
mod types;

pub use client::NodeClient;
pub use types::{
    HandleResponse, NodeInfo, OperationResponse, ProofsRequest, PublishRequest, QueryRequest,
    QueryType, SearchRequest, Visibility,
};
