use serde::Serialize;

use crate::schema::Compatibility;

/// Answer of `Base.GetNodeInfo`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeInfo {
    pub version: String,
    /// The node's own `.proto` descriptor text
    #[serde(skip)]
    pub grpc_proto: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncState {
    Unknown,
    Unsynced,
    Syncing,
    Synced,
    Forked,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeState {
    pub version: String,
    pub state: SyncState,
    pub num_connections: u32,
    pub num_known_peers: u32,
    pub uptime_secs: u64,
    pub block_height: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct KnownPeers {
    pub peers: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AddressState {
    pub address: String,
    pub balance: u64,
    pub nonce: u64,
    /// Hex encoded OTS public-key hashes already used by this address
    pub pubhashes: Vec<String>,
    pub transaction_hashes: Vec<String>,
}

/// The unsigned transaction a node built from a transfer request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferReceipt {
    pub tx_hash: String,
    pub address_from: String,
    pub address_to: String,
    pub amount: u64,
    pub fee: u64,
    pub public_key: String,
    pub ots_index: u64,
}

/// A node descriptor written to disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SavedSchema {
    pub version: String,
    pub fingerprint: String,
    pub compatibility: Compatibility,
}
