use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::str::FromStr;

use qrl_common::{Address, NodeTarget};
use qrl_rpc::SchemaPolicy;

#[derive(Parser, Debug)]
#[command(name = "qrl-cli")]
#[command(about = "Query a QRL node and submit transfers over gRPC", long_about = None)]
pub struct Cli {
    /// Path to a configuration file (TOML, YAML or JSON)
    #[arg(short, long, value_name = "FILE", env = "QRL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Node to talk to
    #[arg(short, long, value_name = "HOST:PORT")]
    pub node: Option<NodeTarget>,

    /// Use TLS
    #[arg(long)]
    pub tls: bool,

    /// PEM bundle to verify the node's certificate against (implies --tls)
    #[arg(long, value_name = "PEM")]
    pub ca_cert: Option<PathBuf>,

    /// Server name expected in the node's certificate (implies --tls)
    #[arg(long, value_name = "NAME")]
    pub domain: Option<String>,

    /// Allow plaintext connections to non-loopback nodes
    #[arg(long)]
    pub allow_insecure_remote: bool,

    /// strict, warn or off
    #[arg(long, value_name = "POLICY")]
    pub schema_policy: Option<SchemaPolicy>,

    /// Print results as JSON
    #[arg(long)]
    pub json: bool,

    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Node version and schema compatibility
    NodeInfo,
    /// Sync state, connections and block height
    NodeState,
    /// Peers known to the node
    Peers,
    /// Balance and nonce of an address
    Address {
        address: Address,
    },
    /// Ask the node to build a transfer transaction
    Transfer {
        #[arg(long)]
        from: Address,
        #[arg(long)]
        to: Address,
        #[arg(long)]
        amount: u64,
        #[arg(long, default_value_t = 0)]
        fee: u64,
        /// Sender XMSS public key, hex encoded
        #[arg(long, value_name = "HEX")]
        xmss_pk: HexBytes,
        /// One-time-signature index to use
        #[arg(long)]
        ots_index: u64,
    },
    /// Save the node's advertised protobuf schema
    Schema {
        #[arg(short, long, value_name = "FILE")]
        out: PathBuf,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HexBytes(pub Vec<u8>);

impl FromStr for HexBytes {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        hex::decode(s.trim_start_matches("0x")).map(HexBytes)
    }
}
