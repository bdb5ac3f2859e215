use qrl_common::TransferRequest;

use crate::error::RpcError;
use crate::proto;
use crate::types::{AddressState, KnownPeers, NodeInfo, NodeState, SyncState, TransferReceipt};

impl From<proto::GetNodeInfoResp> for NodeInfo {
    fn from(resp: proto::GetNodeInfoResp) -> Self {
        NodeInfo {
            version: resp.version,
            grpc_proto: resp.grpc_proto,
        }
    }
}

impl From<proto::node_info::State> for SyncState {
    fn from(s: proto::node_info::State) -> Self {
        use proto::node_info::State;
        match s {
            State::Unknown => SyncState::Unknown,
            State::Unsynced => SyncState::Unsynced,
            State::Syncing => SyncState::Syncing,
            State::Synced => SyncState::Synced,
            State::Forked => SyncState::Forked,
        }
    }
}

impl TryFrom<proto::NodeInfo> for NodeState {
    type Error = RpcError;

    fn try_from(info: proto::NodeInfo) -> Result<Self, Self::Error> {
        let state = proto::node_info::State::try_from(info.state)
            .map_err(|_| RpcError::ProtocolMismatch(format!("unknown node state {}", info.state)))?;
        Ok(NodeState {
            version: info.version,
            state: state.into(),
            num_connections: info.num_connections,
            num_known_peers: info.num_known_peers,
            uptime_secs: info.uptime,
            block_height: info.block_height,
        })
    }
}

impl From<proto::GetKnownPeersResp> for KnownPeers {
    fn from(resp: proto::GetKnownPeersResp) -> Self {
        let peers = resp.known_peers.map(|k| k.peers).unwrap_or_default();
        KnownPeers {
            peers: peers.into_iter().map(|p| p.ip).collect(),
        }
    }
}

impl From<proto::AddressState> for AddressState {
    fn from(s: proto::AddressState) -> Self {
        AddressState {
            address: s.address,
            balance: s.balance,
            nonce: s.nonce,
            pubhashes: s.pubhashes.iter().map(hex::encode).collect(),
            transaction_hashes: s.transaction_hashes.iter().map(hex::encode).collect(),
        }
    }
}

impl From<&TransferRequest> for proto::TransferCoinsReq {
    fn from(req: &TransferRequest) -> Self {
        proto::TransferCoinsReq {
            address_from: req.address_from.to_string(),
            address_to: req.address_to.to_string(),
            amount: req.amount,
            fee: req.fee,
            xmss_pk: req.xmss_pk.clone(),
            xmss_ots_index: req.xmss_ots_index,
        }
    }
}

impl From<proto::Transaction> for TransferReceipt {
    fn from(tx: proto::Transaction) -> Self {
        TransferReceipt {
            tx_hash: hex::encode(&tx.transaction_hash),
            address_from: tx.addr_from,
            address_to: tx.addr_to,
            amount: tx.amount,
            fee: tx.fee,
            public_key: hex::encode(&tx.public_key),
            ots_index: tx.ots_key,
        }
    }
}

impl TransferReceipt {
    /// Names of fields where the node's echo differs from what was sent.
    pub fn mismatches(&self, req: &TransferRequest) -> Vec<&'static str> {
        let mut out = Vec::new();
        if self.address_from != req.address_from.as_str() {
            out.push("addr_from");
        }
        if self.address_to != req.address_to.as_str() {
            out.push("addr_to");
        }
        if self.amount != req.amount {
            out.push("amount");
        }
        if self.fee != req.fee {
            out.push("fee");
        }
        if self.public_key != hex::encode(&req.xmss_pk) {
            out.push("public_key");
        }
        if self.ots_index != req.xmss_ots_index {
            out.push("ots_key");
        }
        out
    }
}
