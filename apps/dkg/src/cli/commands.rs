//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.
//! Results go to stdout; progress goes to stderr.

use crate::DkgClient;
use crate::node::{ProofsRequest, PublishRequest, QueryRequest, SearchRequest};
use crate::operation::result_count;
use dkg_core::{DkgError, Ual};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Duration;

// =============================================================================
// FILE INPUT
// =============================================================================

/// Maximum size of an assertion file (100 MB).
const MAX_INPUT_FILE_SIZE: u64 = 100 * 1024 * 1024;

/// Read an input file after checking it is a regular file of bounded size.
fn read_input(path: &Path) -> Result<String, DkgError> {
    let canonical = path
        .canonicalize()
        .map_err(|e| DkgError::Io(format!("Invalid file path '{}': {e}", path.display())))?;

    let metadata = std::fs::metadata(&canonical)
        .map_err(|e| DkgError::Io(format!("Cannot read file metadata: {e}")))?;
    if !metadata.is_file() {
        return Err(DkgError::Io(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }
    if metadata.len() > MAX_INPUT_FILE_SIZE {
        return Err(DkgError::Io(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            MAX_INPUT_FILE_SIZE
        )));
    }

    std::fs::read_to_string(&canonical).map_err(|e| DkgError::Io(format!("Read file: {e}")))
}

fn print_json(value: &Value) {
    println!("{}", serde_json::to_string_pretty(value).unwrap_or_default());
}

// =============================================================================
// INFO COMMAND
// =============================================================================

/// Show node version.
pub async fn cmd_info(client: &DkgClient, json_mode: bool) -> Result<(), DkgError> {
    let info = client.node_info().await?;

    if json_mode {
        let output = serde_json::to_value(&info).map_err(|e| DkgError::Serialization(e.to_string()))?;
        print_json(&output);
        return Ok(());
    }

    println!("DKG Node");
    println!("========");
    println!("URL:     {}", client.node().base_url());
    println!("Version: {}", info.version);
    for (key, value) in &info.details {
        println!("{key}: {value}");
    }
    Ok(())
}

// =============================================================================
// UAL COMMANDS
// =============================================================================

/// Build a UAL from its parts.
pub fn cmd_ual_encode(
    json_mode: bool,
    chain: &str,
    contract: &str,
    token_id: u64,
) -> Result<(), DkgError> {
    let ual = dkg_core::encode_ual(chain, contract, token_id);
    if json_mode {
        print_json(&serde_json::json!({ "ual": ual }));
    } else {
        println!("{ual}");
    }
    Ok(())
}

/// Split a UAL into its parts.
pub fn cmd_ual_decode(json_mode: bool, ual: &str) -> Result<(), DkgError> {
    let parsed = Ual::parse(ual)?;
    if json_mode {
        print_json(&serde_json::json!({
            "chain": parsed.chain,
            "contract": parsed.contract,
            "token_id": parsed.token_id,
        }));
        return Ok(());
    }

    println!("Chain:    {}", parsed.chain);
    println!("Contract: {}", parsed.contract);
    println!("Token ID: {}", parsed.token_id);
    Ok(())
}

// =============================================================================
// RESOLVE / QUERY COMMANDS
// =============================================================================

/// Resolve ids and print the result.
pub async fn cmd_resolve(client: &DkgClient, ids: &[String]) -> Result<(), DkgError> {
    tracing::info!("Resolving {} id(s)", ids.len());
    let result = client.resolve(ids, None).await?;
    print_json(&result);
    Ok(())
}

/// Resolve one asset and print it, or its assertion graph.
pub async fn cmd_get(client: &DkgClient, ual: &str, graph: bool) -> Result<(), DkgError> {
    let result = if graph {
        client.get_graph(ual, None).await?
    } else {
        client.get(ual, None).await?
    };
    print_json(&result);
    Ok(())
}

/// Run a SPARQL query and print the result.
pub async fn cmd_query(client: &DkgClient, sparql: &str, query_type: &str) -> Result<(), DkgError> {
    let request = QueryRequest {
        sparql: sparql.to_string(),
        query_type: query_type.parse()?,
    };
    let result = client.query(&request, None).await?;
    print_json(&result);
    Ok(())
}

// =============================================================================
// SEARCH COMMAND
// =============================================================================

/// Arguments of the `search` command.
#[derive(Debug)]
pub struct SearchArgs {
    pub query: String,
    pub assertions: bool,
    pub result_type: Option<String>,
    pub limit: u32,
    pub timeout: Option<u64>,
    pub results: Option<usize>,
}

/// Stream search results, printing the final payload.
pub async fn cmd_search(
    client: &DkgClient,
    json_mode: bool,
    quiet: bool,
    args: SearchArgs,
) -> Result<(), DkgError> {
    let request = SearchRequest {
        query: args.query,
        result_type: args.result_type,
        limit: args.limit,
    };

    let mut options = client.config().search_options();
    if let Some(secs) = args.timeout {
        options.timeout = Duration::from_secs(secs);
    }
    if let Some(results) = args.results {
        options.number_of_results = results;
    }

    let progress = |payload: &Value| {
        if !quiet {
            eprintln!("... {} result(s)", result_count(payload));
        }
    };

    let payload = if args.assertions {
        client
            .search_assertions(&request, Some(options), progress)
            .await?
    } else {
        client
            .search_entities(&request, Some(options), progress)
            .await?
    };

    if json_mode {
        print_json(&payload);
        return Ok(());
    }

    let items = payload
        .get("itemListElement")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    println!("Found {} result(s)", items.len());
    for item in items {
        let id = item
            .pointer("/result/@id")
            .or_else(|| item.get("@id"))
            .and_then(Value::as_str)
            .unwrap_or("<unnamed>");
        println!("  {id}");
    }
    Ok(())
}

// =============================================================================
// PROOF COMMANDS
// =============================================================================

/// Fetch proofs for the triples in `file`.
pub async fn cmd_proofs(
    client: &DkgClient,
    file: &Path,
    assertions: Vec<String>,
) -> Result<(), DkgError> {
    let content = read_input(file)?;
    let nquads = client.canonicalizer().to_canonical_triples(&content)?;
    let request = ProofsRequest { nquads, assertions };
    let proofs = client.get_proofs(&request, None).await?;
    let output = serde_json::to_value(&proofs).map_err(|e| DkgError::Serialization(e.to_string()))?;
    print_json(&output);
    Ok(())
}

/// Fetch and verify proofs for the triples in `file`.
pub async fn cmd_validate(
    client: &DkgClient,
    json_mode: bool,
    file: &Path,
    assertions: Vec<String>,
) -> Result<(), DkgError> {
    let content = read_input(file)?;
    let results = client.validate(&content, assertions).await?;

    if json_mode {
        let output =
            serde_json::to_value(&results).map_err(|e| DkgError::Serialization(e.to_string()))?;
        print_json(&output);
        return Ok(());
    }

    let valid = results.iter().filter(|r| r.valid).count();
    println!("Proofs checked: {}", results.len());
    println!("Valid:          {valid}");
    for result in results.iter().filter(|r| !r.valid) {
        println!("  INVALID [{}] {}", result.assertion_id, result.triple);
    }
    Ok(())
}

// =============================================================================
// PUBLISH COMMAND
// =============================================================================

/// Arguments of the `publish` command.
#[derive(Debug)]
pub struct PublishArgs {
    pub file: PathBuf,
    pub keywords: Vec<String>,
    pub assets: Vec<String>,
    pub visibility: String,
    pub ual: Option<String>,
}

/// Publish an assertion file.
pub async fn cmd_publish(client: &DkgClient, args: PublishArgs) -> Result<(), DkgError> {
    if let Some(ual) = &args.ual {
        Ual::parse(ual)?;
    }
    let content = read_input(&args.file)?;
    let triples = client.canonicalizer().to_canonical_triples(&content)?;

    let request = PublishRequest {
        content: triples.join("\n"),
        assets: args.assets,
        keywords: args.keywords,
        visibility: args.visibility.parse()?,
        ual: args.ual,
    };

    tracing::info!("Publishing {} triple(s)", triples.len());
    let result = client.publish(&request, None).await?;
    print_json(&result);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn read_input_accepts_regular_file() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        writeln!(file, "<urn:a> <urn:p> <urn:b> .").expect("write");
        let content = read_input(file.path()).expect("read");
        assert!(content.starts_with("<urn:a>"));
    }

    #[test]
    fn read_input_rejects_directory_and_missing() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(matches!(read_input(dir.path()), Err(DkgError::Io(_))));
        assert!(matches!(
            read_input(&dir.path().join("missing.nq")),
            Err(DkgError::Io(_))
        ));
    }

    #[test]
    fn ual_commands_validate_input() {
        assert!(cmd_ual_encode(true, "otp::testnet", "0xAB", 1).is_ok());
        assert!(cmd_ual_decode(false, "did:dkg:otp/0xab/1").is_ok());
        assert!(matches!(
            cmd_ual_decode(false, "did:dkg:otp/0xab"),
            Err(DkgError::Format(_))
        ));
    }
}
