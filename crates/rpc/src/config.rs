use serde::{Deserialize, Serialize};
use std::time::Duration;

use qrl_common::utils::retry::RetryPolicy;
use qrl_common::NodeTarget;

use crate::schema::SchemaPolicy;
use crate::transport::{ChannelSettings, TransportSecurity};

/// Client configuration, the `[client]` table of the config file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default)]
    pub node: NodeTarget,

    #[serde(default)]
    pub security: TransportSecurity,

    /// Permit plaintext channels to non-loopback nodes
    #[serde(default)]
    pub allow_insecure_remote: bool,

    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,

    #[serde(default = "default_retry_max_delay_ms")]
    pub retry_max_delay_ms: u64,

    #[serde(default)]
    pub schema_policy: SchemaPolicy,

    /// Oldest node version accepted, e.g. "0.55.0"
    #[serde(default)]
    pub min_node_version: Option<String>,
}

fn default_connect_timeout_ms() -> u64 { 5_000 }
fn default_request_timeout_ms() -> u64 { 10_000 }
fn default_max_retries() -> u32 { 3 }
fn default_retry_base_delay_ms() -> u64 { 200 }
fn default_retry_max_delay_ms() -> u64 { 5_000 }

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            node: NodeTarget::default(),
            security: TransportSecurity::default(),
            allow_insecure_remote: false,
            connect_timeout_ms: default_connect_timeout_ms(),
            request_timeout_ms: default_request_timeout_ms(),
            max_retries: default_max_retries(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            retry_max_delay_ms: default_retry_max_delay_ms(),
            schema_policy: SchemaPolicy::default(),
            min_node_version: None,
        }
    }
}

impl ClientConfig {
    pub fn for_node(node: NodeTarget) -> Self {
        Self {
            node,
            ..Self::default()
        }
    }

    pub fn channel_settings(&self) -> ChannelSettings {
        ChannelSettings {
            target: self.node.clone(),
            security: self.security.clone(),
            allow_insecure_remote: self.allow_insecure_remote,
            connect_timeout: Duration::from_millis(self.connect_timeout_ms),
            request_timeout: Duration::from_millis(self.request_timeout_ms),
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            base_delay_ms: self.retry_base_delay_ms,
            max_delay_ms: self.retry_max_delay_ms,
        }
    }
}
