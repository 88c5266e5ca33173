//! # DKG CLI Module
//!
//! This module implements the CLI interface for the DKG client.
//!
//! ## Available Commands
//!
//! - `info` - Show node version
//! - `ual encode` / `ual decode` - Build or parse a UAL
//! - `resolve` - Resolve assertion ids or UALs
//! - `get` - Resolve one asset, optionally as a graph
//! - `search` - Stream entity or assertion search results
//! - `query` - Run a SPARQL query
//! - `proofs` - Fetch inclusion proofs for N-Quads
//! - `validate` - Fetch and verify inclusion proofs
//! - `publish` - Publish an assertion

mod commands;

use crate::config::ClientConfig;
use clap::{Parser, Subcommand};
use dkg_core::DkgError;
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// DKG client
///
/// Publish, resolve, search and verify knowledge assets on a DKG node.
#[derive(Parser, Debug)]
#[command(name = "dkg")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to a TOML config file (defaults to $DKG_CONFIG)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Node URL, overrides config and $DKG_NODE_URL
    #[arg(short, long, global = true)]
    pub node: Option<String>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Suppress progress output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show node version and settings
    Info,

    /// Encode or decode a UAL
    Ual {
        #[command(subcommand)]
        action: UalAction,
    },

    /// Resolve assertion ids or UALs
    Resolve {
        /// Ids to resolve
        #[arg(required = true)]
        ids: Vec<String>,
    },

    /// Resolve one asset by UAL
    Get {
        /// Asset UAL
        ual: String,

        /// Print the assertion grouped by subject
        #[arg(long)]
        graph: bool,
    },

    /// Search entities or assertions
    Search {
        /// Search text
        query: String,

        /// Search assertions instead of entities
        #[arg(long)]
        assertions: bool,

        /// Entity type filter
        #[arg(short = 't', long)]
        result_type: Option<String>,

        /// Results per node
        #[arg(short, long, default_value = "20")]
        limit: u32,

        /// Stop after this many seconds
        #[arg(long)]
        timeout: Option<u64>,

        /// Stop after this many results
        #[arg(long)]
        results: Option<usize>,
    },

    /// Run a SPARQL query
    Query {
        /// SPARQL text
        sparql: String,

        /// Query form (construct, select)
        #[arg(short = 't', long, default_value = "construct")]
        query_type: String,
    },

    /// Fetch inclusion proofs for the triples in a file
    Proofs {
        /// N-Quads file
        #[arg(short, long)]
        file: PathBuf,

        /// Restrict to these assertion ids
        #[arg(short, long)]
        assertion: Vec<String>,
    },

    /// Fetch and verify inclusion proofs for the triples in a file
    Validate {
        /// N-Quads file
        #[arg(short, long)]
        file: PathBuf,

        /// Restrict to these assertion ids
        #[arg(short, long)]
        assertion: Vec<String>,
    },

    /// Publish an assertion
    Publish {
        /// N-Quads file
        #[arg(short, long)]
        file: PathBuf,

        /// Keywords (repeatable)
        #[arg(short, long)]
        keyword: Vec<String>,

        /// Related asset UALs (repeatable)
        #[arg(long)]
        asset: Vec<String>,

        /// Visibility (public, private)
        #[arg(long, default_value = "public")]
        visibility: String,

        /// UAL of the anchoring asset
        #[arg(long)]
        ual: Option<String>,
    },
}

/// UAL subcommands.
#[derive(Subcommand, Debug)]
pub enum UalAction {
    /// Build a UAL
    Encode {
        #[arg(long)]
        chain: String,
        #[arg(long)]
        contract: String,
        #[arg(long)]
        token_id: u64,
    },
    /// Parse a UAL
    Decode { ual: String },
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub async fn execute(cli: Cli) -> Result<(), DkgError> {
    let json_mode = cli.json_mode;
    let quiet = cli.quiet;

    // UAL handling needs no config or node.
    if let Commands::Ual { action } = &cli.command {
        return match action {
            UalAction::Encode {
                chain,
                contract,
                token_id,
            } => cmd_ual_encode(json_mode, chain, contract, *token_id),
            UalAction::Decode { ual } => cmd_ual_decode(json_mode, ual),
        };
    }

    let mut config = ClientConfig::load(cli.config.as_deref(), |key| std::env::var(key).ok())?;
    if let Some(node) = cli.node {
        config.node.url = node;
    }
    let client = crate::DkgClient::new(config);

    match cli.command {
        Commands::Info => cmd_info(&client, json_mode).await,
        Commands::Ual { .. } => Ok(()),
        Commands::Resolve { ids } => cmd_resolve(&client, &ids).await,
        Commands::Get { ual, graph } => cmd_get(&client, &ual, graph).await,
        Commands::Search {
            query,
            assertions,
            result_type,
            limit,
            timeout,
            results,
        } => {
            let search = SearchArgs {
                query,
                assertions,
                result_type,
                limit,
                timeout,
                results,
            };
            cmd_search(&client, json_mode, quiet, search).await
        }
        Commands::Query { sparql, query_type } => cmd_query(&client, &sparql, &query_type).await,
        Commands::Proofs { file, assertion } => cmd_proofs(&client, &file, assertion).await,
        Commands::Validate { file, assertion } => {
            cmd_validate(&client, json_mode, &file, assertion).await
        }
        Commands::Publish {
            file,
            keyword,
            asset,
            visibility,
            ual,
        } => {
            let publish = PublishArgs {
                file,
                keywords: keyword,
                assets: asset,
                visibility,
                ual,
            };
            cmd_publish(&client, publish).await
        }
    }
}
