//! Channel construction and transport-security policy.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tonic::transport::{Certificate, Channel, ClientTlsConfig, Endpoint};
use tracing::{debug, warn};

use qrl_common::NodeTarget;

use crate::error::{error_chain, Result, RpcError};

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum TransportSecurity {
    /// Plaintext HTTP/2, no authentication
    #[default]
    Insecure,
    /// TLS, optionally pinned to a CA bundle and server name
    Tls {
        #[serde(default)]
        ca_cert: Option<PathBuf>,
        #[serde(default)]
        domain: Option<String>,
    },
}

impl TransportSecurity {
    pub fn is_tls(&self) -> bool {
        matches!(self, TransportSecurity::Tls { .. })
    }
}

/// Settings needed to open a channel
#[derive(Debug, Clone)]
pub struct ChannelSettings {
    pub target: NodeTarget,
    pub security: TransportSecurity,
    pub allow_insecure_remote: bool,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl ChannelSettings {
    /// Plaintext is only allowed to loopback nodes unless explicitly opted in.
    pub fn check_policy(&self) -> Result<()> {
        if !self.security.is_tls() && !self.target.is_loopback() && !self.allow_insecure_remote {
            return Err(RpcError::InsecureTransport(self.target.to_string()));
        }
        Ok(())
    }

    pub fn endpoint(&self) -> Result<Endpoint> {
        self.check_policy()?;

        let uri = self.target.uri(self.security.is_tls());
        let mut endpoint = Endpoint::from_shared(uri.clone())
            .map_err(|e| RpcError::Config(format!("invalid node uri {}: {}", uri, e)))?
            .connect_timeout(self.connect_timeout)
            .timeout(self.request_timeout);

        match &self.security {
            TransportSecurity::Insecure => {
                warn!(node = %self.target, "Using an unencrypted, unauthenticated channel");
            }
            TransportSecurity::Tls { ca_cert, domain } => {
                let mut tls = ClientTlsConfig::new();
                if let Some(path) = ca_cert {
                    let pem = std::fs::read(path).map_err(|e| {
                        RpcError::Config(format!("cannot read CA certificate {}: {}", path.display(), e))
                    })?;
                    tls = tls.ca_certificate(Certificate::from_pem(pem));
                }
                let domain = domain.clone().unwrap_or_else(|| self.target.host.clone());
                tls = tls.domain_name(domain);
                endpoint = endpoint
                    .tls_config(tls)
                    .map_err(|e| RpcError::Config(format!("invalid TLS settings: {}", error_chain(&e))))?;
            }
        }

        debug!(%uri, "Endpoint configured");
        Ok(endpoint)
    }

    pub async fn connect(&self) -> Result<Channel> {
        let endpoint = self.endpoint()?;
        endpoint.connect().await.map_err(|e| {
            RpcError::Network(format!("cannot connect to {}: {}", self.target, error_chain(&e)))
        })
    }
}
