//! In-process QRL node used by the integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use tokio::net::TcpListener;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::transport::Server;
use tonic::{Request, Response, Status};

use qrl_common::NodeTarget;
use qrl_rpc::proto;
use qrl_rpc::proto::base_server::{Base, BaseServer};
use qrl_rpc::proto::public_api_server::{PublicApi, PublicApiServer};
use qrl_rpc::schema::LOCAL_SCHEMA;
use qrl_rpc::ClientConfig;

pub const GENESIS_ADDR: &str =
    "Qada446e9ac25b11299e0615de8bd1b7f5404ce0052fbb27db7ada425904a5aea6063deb3";

/// How the node answers `TransferCoins`
#[derive(Debug, Clone)]
pub enum TransferMode {
    Echo,
    Reject(tonic::Code, String),
    /// Echo with the amount changed
    Tamper,
    /// Accept with an empty response
    NoEcho,
}

#[derive(Debug)]
pub struct NodeBehaviour {
    pub version: String,
    pub grpc_proto: String,
    pub transfer: TransferMode,
    /// `GetNodeState` answers Unavailable this many times before succeeding
    pub state_failures: AtomicU32,
    pub node_info_calls: AtomicU32,
    pub node_state_calls: AtomicU32,
    pub transfer_calls: AtomicU32,
    pub last_transfer: Mutex<Option<proto::TransferCoinsReq>>,
}

impl Default for NodeBehaviour {
    fn default() -> Self {
        Self {
            version: "0.55.1 python".to_string(),
            grpc_proto: LOCAL_SCHEMA.to_string(),
            transfer: TransferMode::Echo,
            state_failures: AtomicU32::new(0),
            node_info_calls: AtomicU32::new(0),
            node_state_calls: AtomicU32::new(0),
            transfer_calls: AtomicU32::new(0),
            last_transfer: Mutex::new(None),
        }
    }
}

#[derive(Clone)]
pub struct TestNode {
    pub behaviour: Arc<NodeBehaviour>,
}

fn node_info_msg(version: &str) -> proto::NodeInfo {
    proto::NodeInfo {
        version: version.to_string(),
        state: proto::node_info::State::Synced as i32,
        num_connections: 3,
        num_known_peers: 5,
        uptime: 3600,
        block_height: 1234,
    }
}

#[tonic::async_trait]
impl Base for TestNode {
    async fn get_node_info(
        &self,
        _request: Request<proto::GetNodeInfoReq>,
    ) -> Result<Response<proto::GetNodeInfoResp>, Status> {
        self.behaviour.node_info_calls.fetch_add(1, Ordering::SeqCst);
        Ok(Response::new(proto::GetNodeInfoResp {
            version: self.behaviour.version.clone(),
            grpc_proto: self.behaviour.grpc_proto.clone(),
        }))
    }
}

#[tonic::async_trait]
impl PublicApi for TestNode {
    async fn get_node_state(
        &self,
        _request: Request<proto::GetNodeStateReq>,
    ) -> Result<Response<proto::GetNodeStateResp>, Status> {
        self.behaviour.node_state_calls.fetch_add(1, Ordering::SeqCst);
        let remaining = self.behaviour.state_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.behaviour.state_failures.store(remaining - 1, Ordering::SeqCst);
            return Err(Status::unavailable("node is restarting"));
        }
        Ok(Response::new(proto::GetNodeStateResp {
            info: Some(node_info_msg(&self.behaviour.version)),
        }))
    }

    async fn get_known_peers(
        &self,
        _request: Request<proto::GetKnownPeersReq>,
    ) -> Result<Response<proto::GetKnownPeersResp>, Status> {
        Ok(Response::new(proto::GetKnownPeersResp {
            known_peers: Some(proto::KnownPeers {
                peers: vec![
                    proto::Peer { ip: "104.251.219.215".to_string() },
                    proto::Peer { ip: "35.177.60.137".to_string() },
                ],
            }),
        }))
    }

    async fn get_address_state(
        &self,
        request: Request<proto::GetAddressStateReq>,
    ) -> Result<Response<proto::GetAddressStateResp>, Status> {
        let req = request.into_inner();
        if req.address != GENESIS_ADDR {
            return Err(Status::not_found(format!("unknown address {}", req.address)));
        }
        Ok(Response::new(proto::GetAddressStateResp {
            state: Some(proto::AddressState {
                address: req.address,
                balance: 100_000,
                nonce: 2,
                pubhashes: vec![vec![0xaa, 0xbb]],
                transaction_hashes: vec![vec![0x01; 4]],
            }),
        }))
    }

    async fn transfer_coins(
        &self,
        request: Request<proto::TransferCoinsReq>,
    ) -> Result<Response<proto::TransferCoinsResp>, Status> {
        self.behaviour.transfer_calls.fetch_add(1, Ordering::SeqCst);
        let req = request.into_inner();
        *self.behaviour.last_transfer.lock().unwrap() = Some(req.clone());

        let mut tx = proto::Transaction {
            transaction_hash: vec![0x5a; 32],
            addr_from: req.address_from,
            addr_to: req.address_to,
            amount: req.amount,
            fee: req.fee,
            public_key: req.xmss_pk,
            ots_key: req.xmss_ots_index,
        };

        match &self.behaviour.transfer {
            TransferMode::Echo => {}
            TransferMode::Reject(code, msg) => return Err(Status::new(*code, msg.clone())),
            TransferMode::Tamper => tx.amount += 1,
            TransferMode::NoEcho => return Ok(Response::new(proto::TransferCoinsResp::default())),
        }

        Ok(Response::new(proto::TransferCoinsResp {
            transaction_unsigned: Some(tx),
        }))
    }
}

/// Starts a node on an ephemeral loopback port.
pub async fn spawn_node(behaviour: NodeBehaviour) -> (NodeTarget, Arc<NodeBehaviour>) {
    qrl_common::utils::logging::init_test_logging();
    let behaviour = Arc::new(behaviour);
    let node = TestNode { behaviour: behaviour.clone() };

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        Server::builder()
            .add_service(BaseServer::new(node.clone()))
            .add_service(PublicApiServer::new(node))
            .serve_with_incoming(TcpListenerStream::new(listener))
            .await
    });

    (NodeTarget::new("127.0.0.1", port).unwrap(), behaviour)
}

/// Client config tuned for tests: short timeouts, millisecond backoff.
pub fn test_config(node: NodeTarget) -> ClientConfig {
    ClientConfig {
        connect_timeout_ms: 2_000,
        request_timeout_ms: 2_000,
        retry_base_delay_ms: 1,
        retry_max_delay_ms: 5,
        ..ClientConfig::for_node(node)
    }
}
