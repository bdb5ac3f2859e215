//! gRPC client for QRL nodes.
//!
//! The wire schema is compiled in from `proto/qrl.proto`. A node's advertised
//! descriptor is only compared against it, never loaded.

pub mod proto {
    tonic::include_proto!("qrl");
}

pub mod client;
pub mod config;
pub mod error;
pub mod mapper;
pub mod metrics;
pub mod schema;
pub mod transport;
pub mod types;

pub use client::{NodeApi, QrlClient};
pub use config::ClientConfig;
pub use error::{ErrorCategory, Result, RpcError};
pub use schema::{Compatibility, SchemaPolicy};
pub use transport::TransportSecurity;
pub use tonic::Code;
pub use types::{AddressState, KnownPeers, NodeInfo, NodeState, SavedSchema, SyncState, TransferReceipt};
