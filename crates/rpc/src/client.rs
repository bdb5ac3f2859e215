use async_trait::async_trait;
use std::future::Future;
use std::path::Path;
use std::time::Instant;
use tonic::transport::Channel;
use tracing::{debug, info, instrument, warn};

use qrl_common::utils::retry::RetryPolicy;
use qrl_common::{Address, NodeTarget, TransferRequest};

use crate::config::ClientConfig;
use crate::error::{Result, RpcError};
use crate::metrics::ClientMetrics;
use crate::proto;
use crate::proto::base_client::BaseClient;
use crate::proto::public_api_client::PublicApiClient;
use crate::schema::{self, Compatibility, SchemaPolicy};
use crate::types::{AddressState, KnownPeers, NodeInfo, NodeState, SavedSchema, TransferReceipt};

/// Operations a QRL node offers to this client.
#[async_trait]
pub trait NodeApi: Send + Sync {
    async fn node_info(&self) -> Result<NodeInfo>;
    async fn node_state(&self) -> Result<NodeState>;
    async fn known_peers(&self) -> Result<KnownPeers>;
    async fn address_state(&self, address: &Address) -> Result<AddressState>;

    /// `None` when the node accepted the request without echoing a transaction.
    async fn transfer_coins(&self, request: &TransferRequest) -> Result<Option<TransferReceipt>>;

    /// Writes the node's advertised descriptor to `path`.
    async fn save_schema(&self, path: &Path) -> Result<SavedSchema> {
        let node = self.node_info().await?;
        if node.grpc_proto.is_empty() {
            return Err(RpcError::missing_field("grpc_proto"));
        }
        let fingerprint = schema::save_schema(path, &node.grpc_proto)?;
        info!(path = %path.display(), %fingerprint, "Saved node schema");
        Ok(SavedSchema {
            compatibility: schema::check_compatibility(&node.grpc_proto),
            version: node.version,
            fingerprint,
        })
    }
}

/// gRPC client for one node.
///
/// Both service stubs share a single HTTP/2 channel; cloning the client is
/// cheap and reuses that channel.
#[derive(Clone, Debug)]
pub struct QrlClient {
    target: NodeTarget,
    base: BaseClient<Channel>,
    api: PublicApiClient<Channel>,
    retry: RetryPolicy,
    metrics: ClientMetrics,
    compatibility: Option<Compatibility>,
}

impl QrlClient {
    /// Connects, then checks the node's schema according to `config.schema_policy`.
    #[instrument(skip(config), fields(node = %config.node))]
    pub async fn connect(config: &ClientConfig) -> Result<Self> {
        let channel = config.channel_settings().connect().await?;
        let mut client = Self::with_channel(channel, config.node.clone(), config.retry_policy())?;
        client.handshake(config).await?;
        info!("Connected to QRL node");
        Ok(client)
    }

    /// Wraps an existing channel without contacting the node.
    pub fn with_channel(channel: Channel, target: NodeTarget, retry: RetryPolicy) -> Result<Self> {
        let metrics = ClientMetrics::new()
            .map_err(|e| RpcError::Config(format!("metrics registry: {}", e)))?;
        Ok(Self {
            target,
            base: BaseClient::new(channel.clone()),
            api: PublicApiClient::new(channel),
            retry,
            metrics,
            compatibility: None,
        })
    }

    pub fn target(&self) -> &NodeTarget {
        &self.target
    }

    pub fn metrics(&self) -> &ClientMetrics {
        &self.metrics
    }

    /// Result of the connect-time schema check; `None` when the check was off.
    pub fn compatibility(&self) -> Option<&Compatibility> {
        self.compatibility.as_ref()
    }

    async fn handshake(&mut self, config: &ClientConfig) -> Result<()> {
        let policy = config.schema_policy;
        if policy == SchemaPolicy::Off {
            debug!("Schema check disabled");
            return Ok(());
        }

        let node = self.node_info().await?;

        if let Some(min) = &config.min_node_version {
            if let Err(err) = schema::check_min_version(&node.version, min) {
                match (policy, err) {
                    (SchemaPolicy::Warn, RpcError::SchemaMismatch(msg)) => warn!("{}", msg),
                    (_, err) => return Err(err),
                }
            }
        }

        let compat = schema::check_compatibility(&node.grpc_proto);
        match (&compat, policy) {
            (Compatibility::Incompatible { missing }, SchemaPolicy::Strict) => {
                return Err(RpcError::SchemaMismatch(format!(
                    "node {} ({}) lacks {}",
                    self.target,
                    node.version,
                    missing.join(", ")
                )));
            }
            (Compatibility::Incompatible { missing }, _) => {
                warn!(version = %node.version, missing = %missing.join(", "), "Node schema is incompatible, continuing");
            }
            _ => debug!(version = %node.version, compatibility = %compat, "Node schema checked"),
        }

        self.compatibility = Some(compat);
        Ok(())
    }

    async fn call<T, F, Fut>(&self, method: &'static str, idempotent: bool, mut attempt_fn: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<tonic::Response<T>, tonic::Status>>,
    {
        let mut attempt = 0u32;
        loop {
            let started = Instant::now();
            let outcome = attempt_fn().await;
            self.metrics.record_attempt(method, started.elapsed());

            let err = match outcome {
                Ok(resp) => return Ok(resp.into_inner()),
                Err(status) => RpcError::from(status),
            };
            self.metrics.record_error(method, &err);

            if idempotent && err.is_transient() && self.retry.allows(attempt) {
                let delay = self.retry.delay_for(attempt);
                warn!(method, attempt = attempt + 1, ?delay, error = %err, "Transient failure, retrying");
                self.metrics.record_retry(method);
                tokio::time::sleep(delay).await;
                attempt += 1;
                continue;
            }

            debug!(method, category = err.category().as_str(), error = %err, "Call failed");
            return Err(err);
        }
    }
}

#[async_trait]
impl NodeApi for QrlClient {
    async fn node_info(&self) -> Result<NodeInfo> {
        let resp = self
            .call("GetNodeInfo", true, || {
                let mut base = self.base.clone();
                async move { base.get_node_info(proto::GetNodeInfoReq {}).await }
            })
            .await?;
        Ok(resp.into())
    }

    async fn node_state(&self) -> Result<NodeState> {
        let resp = self
            .call("GetNodeState", true, || {
                let mut api = self.api.clone();
                async move { api.get_node_state(proto::GetNodeStateReq {}).await }
            })
            .await?;
        resp.info
            .ok_or_else(|| RpcError::missing_field("info"))?
            .try_into()
    }

    async fn known_peers(&self) -> Result<KnownPeers> {
        let resp = self
            .call("GetKnownPeers", true, || {
                let mut api = self.api.clone();
                async move { api.get_known_peers(proto::GetKnownPeersReq {}).await }
            })
            .await?;
        Ok(resp.into())
    }

    async fn address_state(&self, address: &Address) -> Result<AddressState> {
        let resp = self
            .call("GetAddressState", true, || {
                let mut api = self.api.clone();
                let req = proto::GetAddressStateReq {
                    address: address.to_string(),
                };
                async move { api.get_address_state(req).await }
            })
            .await?;
        let state = resp.state.ok_or_else(|| RpcError::missing_field("state"))?;
        Ok(state.into())
    }

    #[instrument(skip(self, request), fields(to = %request.address_to, amount = request.amount))]
    async fn transfer_coins(&self, request: &TransferRequest) -> Result<Option<TransferReceipt>> {
        request.validate()?;
        let wire = proto::TransferCoinsReq::from(request);

        // Not idempotent: a retried transfer could be applied twice.
        let resp = self
            .call("TransferCoins", false, || {
                let mut api = self.api.clone();
                let req = wire.clone();
                async move { api.transfer_coins(req).await }
            })
            .await?;

        let Some(tx) = resp.transaction_unsigned else {
            info!("Transfer accepted by node, no transaction echoed");
            return Ok(None);
        };
        let receipt = TransferReceipt::from(tx);

        let mismatched = receipt.mismatches(request);
        if !mismatched.is_empty() {
            return Err(RpcError::ProtocolMismatch(format!(
                "node echoed a different transaction ({})",
                mismatched.join(", ")
            )));
        }

        info!(tx_hash = %receipt.tx_hash, "Transfer accepted by node");
        Ok(Some(receipt))
    }
}
