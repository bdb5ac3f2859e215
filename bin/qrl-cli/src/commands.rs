use anyhow::{Context, Result};
use serde::Serialize;
use std::fmt::Write as _;

use qrl_common::TransferRequest;
use qrl_rpc::schema;
use qrl_rpc::{Compatibility, NodeApi, SavedSchema, TransferReceipt};

use crate::cli::Commands;

#[derive(Debug, Serialize)]
struct NodeInfoReport {
    version: String,
    schema_fingerprint: String,
    local_fingerprint: String,
    compatibility: Compatibility,
}

#[derive(Debug, Serialize)]
struct SchemaReport {
    path: String,
    #[serde(flatten)]
    saved: SavedSchema,
}

#[derive(Debug, Serialize)]
struct TransferReport {
    submitted: bool,
    echoed: bool,
    #[serde(flatten)]
    transaction: Option<TransferReceipt>,
}

/// Runs one subcommand and returns what should be printed to stdout.
pub async fn execute(api: &dyn NodeApi, command: &Commands, json: bool) -> Result<String> {
    match command {
        Commands::NodeInfo => {
            let info = api.node_info().await.context("GetNodeInfo failed")?;
            let report = NodeInfoReport {
                schema_fingerprint: schema::fingerprint(&info.grpc_proto),
                local_fingerprint: schema::local_fingerprint(),
                compatibility: schema::check_compatibility(&info.grpc_proto),
                version: info.version,
            };
            render(&report, json, |out| {
                writeln!(out, "version:       {}", report.version)?;
                writeln!(out, "schema:        {}", report.schema_fingerprint)?;
                writeln!(out, "local schema:  {}", report.local_fingerprint)?;
                write!(out, "compatibility: {}", report.compatibility)
            })
        }
        Commands::NodeState => {
            let state = api.node_state().await.context("GetNodeState failed")?;
            render(&state, json, |out| {
                writeln!(out, "version:      {}", state.version)?;
                writeln!(out, "state:        {:?}", state.state)?;
                writeln!(out, "connections:  {}", state.num_connections)?;
                writeln!(out, "known peers:  {}", state.num_known_peers)?;
                writeln!(out, "uptime:       {}s", state.uptime_secs)?;
                write!(out, "block height: {}", state.block_height)
            })
        }
        Commands::Peers => {
            let peers = api.known_peers().await.context("GetKnownPeers failed")?;
            render(&peers, json, |out| {
                if peers.peers.is_empty() {
                    return write!(out, "no known peers");
                }
                write!(out, "{}", peers.peers.join("\n"))
            })
        }
        Commands::Address { address } => {
            let state = api
                .address_state(address)
                .await
                .with_context(|| format!("GetAddressState failed for {}", address))?;
            render(&state, json, |out| {
                writeln!(out, "address: {}", state.address)?;
                writeln!(out, "balance: {}", state.balance)?;
                writeln!(out, "nonce:   {}", state.nonce)?;
                write!(out, "used OTS keys: {}", state.pubhashes.len())
            })
        }
        Commands::Transfer { from, to, amount, fee, xmss_pk, ots_index } => {
            let request = TransferRequest::new(
                from.clone(),
                to.clone(),
                *amount,
                *fee,
                xmss_pk.0.clone(),
                *ots_index,
            )?;
            let receipt = api.transfer_coins(&request).await.context("TransferCoins failed")?;
            let report = TransferReport {
                submitted: true,
                echoed: receipt.is_some(),
                transaction: receipt,
            };
            render(&report, json, |out| {
                let Some(tx) = &report.transaction else {
                    return write!(out, "submitted; node returned no transaction");
                };
                writeln!(out, "tx hash:   {}", tx.tx_hash)?;
                writeln!(out, "from:      {}", tx.address_from)?;
                writeln!(out, "to:        {}", tx.address_to)?;
                writeln!(out, "amount:    {}", tx.amount)?;
                writeln!(out, "fee:       {}", tx.fee)?;
                write!(out, "ots index: {}", tx.ots_index)
            })
        }
        Commands::Schema { out: path } => {
            let saved = api
                .save_schema(path)
                .await
                .with_context(|| format!("saving node schema to {}", path.display()))?;
            let report = SchemaReport {
                path: path.display().to_string(),
                saved,
            };
            render(&report, json, |out| {
                writeln!(out, "saved {} ({})", report.path, report.saved.fingerprint)?;
                write!(out, "compatibility: {}", report.saved.compatibility)
            })
        }
    }
}

fn render<T, F>(value: &T, json: bool, human: F) -> Result<String>
where
    T: Serialize,
    F: FnOnce(&mut String) -> std::fmt::Result,
{
    if json {
        return Ok(serde_json::to_string_pretty(value)?);
    }
    let mut out = String::new();
    human(&mut out)?;
    Ok(out)
}
