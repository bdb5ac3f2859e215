use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use crate::error::ValidationError;

pub const ADDRESS_PREFIX: char = 'Q';
/// Hex characters after the prefix: sha256 of the key root plus a 4 char checksum.
pub const ADDRESS_HEX_LENGTH: usize = 68;

pub const DEFAULT_NODE_HOST: &str = "localhost";
pub const DEFAULT_NODE_PORT: u16 = 9009;

// --- NodeTarget ---

/// Host/port pair identifying a remote node.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct NodeTarget {
    pub host: String,
    pub port: u16,
}

impl NodeTarget {
    pub fn new(host: impl Into<String>, port: u16) -> Result<Self, ValidationError> {
        let host = host.into();
        if host.is_empty() {
            return Err(ValidationError::InvalidTarget("empty host".to_string()));
        }
        Ok(Self { host, port })
    }

    pub fn is_loopback(&self) -> bool {
        if self.host.eq_ignore_ascii_case("localhost") {
            return true;
        }
        self.host
            .parse::<IpAddr>()
            .map(|ip| ip.is_loopback())
            .unwrap_or(false)
    }

    fn is_ipv6_literal(&self) -> bool {
        self.host.contains(':')
    }

    /// Endpoint URI for the transport layer.
    pub fn uri(&self, tls: bool) -> String {
        let scheme = if tls { "https" } else { "http" };
        format!("{}://{}", scheme, self)
    }
}

impl Default for NodeTarget {
    fn default() -> Self {
        Self {
            host: DEFAULT_NODE_HOST.to_string(),
            port: DEFAULT_NODE_PORT,
        }
    }
}

impl fmt::Display for NodeTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_ipv6_literal() {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

impl fmt::Debug for NodeTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeTarget({})", self)
    }
}

impl FromStr for NodeTarget {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let invalid = |why: &str| ValidationError::InvalidTarget(format!("{}: '{}'", why, s));

        let (host, port) = if let Some(rest) = s.strip_prefix('[') {
            let (host, tail) = rest
                .split_once(']')
                .ok_or_else(|| invalid("unterminated IPv6 literal"))?;
            let port = tail
                .strip_prefix(':')
                .ok_or_else(|| invalid("missing port"))?;
            (host, port)
        } else {
            let (host, port) = s.rsplit_once(':').ok_or_else(|| invalid("missing port"))?;
            if host.contains(':') {
                return Err(invalid("IPv6 literals must be bracketed"));
            }
            (host, port)
        };

        if host.is_empty() {
            return Err(invalid("empty host"));
        }
        let port: u16 = port.parse().map_err(|_| invalid("invalid port"))?;

        Ok(Self {
            host: host.to_string(),
            port,
        })
    }
}

impl Serialize for NodeTarget {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for NodeTarget {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// --- Address ---

/// A QRL address: `Q` followed by 68 hex characters.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Address(String);

impl Address {
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        let suffix = s
            .strip_prefix(ADDRESS_PREFIX)
            .ok_or_else(|| ValidationError::InvalidAddress(format!("missing '{}' prefix", ADDRESS_PREFIX)))?;
        if suffix.len() != ADDRESS_HEX_LENGTH {
            return Err(ValidationError::InvalidAddress(format!(
                "expected {} hex characters after prefix, got {}",
                ADDRESS_HEX_LENGTH,
                suffix.len()
            )));
        }
        if !suffix.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ValidationError::InvalidAddress("non-hex characters".to_string()));
        }
        Ok(Self(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.0)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Address {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Address::parse(s)
    }
}

impl Serialize for Address {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Address::parse(&s).map_err(serde::de::Error::custom)
    }
}

// --- TransferRequest ---

/// Client-constructed request to move `amount` from one address to another.
///
/// The request carries the sender's XMSS public key and the one-time-signature
/// index the node should use; signing happens elsewhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRequest {
    pub address_from: Address,
    pub address_to: Address,
    pub amount: u64,
    pub fee: u64,
    #[serde(with = "hex_bytes")]
    pub xmss_pk: Vec<u8>,
    pub xmss_ots_index: u64,
}

impl TransferRequest {
    pub fn new(
        address_from: Address,
        address_to: Address,
        amount: u64,
        fee: u64,
        xmss_pk: Vec<u8>,
        xmss_ots_index: u64,
    ) -> Result<Self, ValidationError> {
        let req = Self {
            address_from,
            address_to,
            amount,
            fee,
            xmss_pk,
            xmss_ots_index,
        };
        req.validate()?;
        Ok(req)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.amount == 0 {
            return Err(ValidationError::InvalidAmount("amount must be positive".to_string()));
        }
        if self.amount.checked_add(self.fee).is_none() {
            return Err(ValidationError::InvalidAmount("amount + fee overflows".to_string()));
        }
        if self.xmss_pk.is_empty() {
            return Err(ValidationError::InvalidPublicKey("empty XMSS public key".to_string()));
        }
        Ok(())
    }
}

mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        hex::decode(s.trim_start_matches("0x")).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GENESIS_ADDR: &str =
        "Qada446e9ac25b11299e0615de8bd1b7f5404ce0052fbb27db7ada425904a5aea6063deb3";

    fn addr() -> Address {
        Address::parse(GENESIS_ADDR).unwrap()
    }

    #[test]
    fn test_address_accepts_valid() {
        let a = addr();
        assert_eq!(a.as_str(), GENESIS_ADDR);
        assert_eq!(a.to_string(), GENESIS_ADDR);
        assert!(Address::parse(&format!("Q{}", GENESIS_ADDR[1..].to_uppercase())).is_ok());
    }

    #[test]
    fn test_address_rejects_bad_prefix() {
        let bad = GENESIS_ADDR.replacen('Q', "X", 1);
        assert!(matches!(Address::parse(&bad), Err(ValidationError::InvalidAddress(_))));
    }

    #[test]
    fn test_address_rejects_bad_length() {
        assert!(Address::parse(&GENESIS_ADDR[..GENESIS_ADDR.len() - 1]).is_err());
        assert!(Address::parse(&format!("{}0", GENESIS_ADDR)).is_err());
        assert!(Address::parse("Q").is_err());
    }

    #[test]
    fn test_address_rejects_non_hex() {
        let mut bad = GENESIS_ADDR.to_string();
        bad.replace_range(5..6, "z");
        assert!(Address::parse(&bad).is_err());
    }

    #[test]
    fn test_address_serde_validates() {
        let json = serde_json::to_string(&addr()).unwrap();
        assert_eq!(json, format!("\"{}\"", GENESIS_ADDR));
        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(back, addr());
        assert!(serde_json::from_str::<Address>("\"Qnothex\"").is_err());
    }

    #[test]
    fn test_node_target_parse() {
        let t: NodeTarget = "localhost:9009".parse().unwrap();
        assert_eq!(t, NodeTarget::default());

        let t: NodeTarget = "10.0.0.7:19009".parse().unwrap();
        assert_eq!(t.host, "10.0.0.7");
        assert_eq!(t.port, 19009);

        let t: NodeTarget = "[::1]:9009".parse().unwrap();
        assert_eq!(t.host, "::1");
        assert_eq!(t.to_string(), "[::1]:9009");
        assert_eq!(t.uri(false), "http://[::1]:9009");
    }

    #[test]
    fn test_node_target_parse_errors() {
        assert!("localhost".parse::<NodeTarget>().is_err());
        assert!(":9009".parse::<NodeTarget>().is_err());
        assert!("localhost:notaport".parse::<NodeTarget>().is_err());
        assert!("localhost:70000".parse::<NodeTarget>().is_err());
        assert!("::1:9009".parse::<NodeTarget>().is_err());
        assert!("[::1".parse::<NodeTarget>().is_err());
        assert!("[::1]".parse::<NodeTarget>().is_err());
    }

    #[test]
    fn test_node_target_loopback() {
        assert!(NodeTarget::default().is_loopback());
        assert!("127.0.0.1:1".parse::<NodeTarget>().unwrap().is_loopback());
        assert!("127.4.5.6:1".parse::<NodeTarget>().unwrap().is_loopback());
        assert!("[::1]:1".parse::<NodeTarget>().unwrap().is_loopback());
        assert!(!"node.example.org:9009".parse::<NodeTarget>().unwrap().is_loopback());
        assert!(!"192.168.1.2:9009".parse::<NodeTarget>().unwrap().is_loopback());
    }

    #[test]
    fn test_node_target_uri() {
        let t = NodeTarget::new("node.example.org", 443).unwrap();
        assert_eq!(t.uri(true), "https://node.example.org:443");
        assert_eq!(t.uri(false), "http://node.example.org:443");
        assert!(NodeTarget::new("", 1).is_err());
    }

    #[test]
    fn test_transfer_request_valid() {
        let req = TransferRequest::new(addr(), addr(), 1, 1, vec![0x01], 1).unwrap();
        assert_eq!(req.amount, 1);
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_transfer_request_rejects_zero_amount() {
        let err = TransferRequest::new(addr(), addr(), 0, 1, vec![0x01], 1).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidAmount(_)));
    }

    #[test]
    fn test_transfer_request_rejects_empty_pk() {
        let err = TransferRequest::new(addr(), addr(), 5, 0, vec![], 1).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidPublicKey(_)));
    }

    #[test]
    fn test_transfer_request_rejects_overflow() {
        let err = TransferRequest::new(addr(), addr(), u64::MAX, 1, vec![0x01], 0).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidAmount(_)));
    }

    #[test]
    fn test_transfer_request_json_uses_hex_pk() {
        let req = TransferRequest::new(addr(), addr(), 3, 1, vec![0xde, 0xad], 7).unwrap();
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["xmss_pk"], "dead");
        let back: TransferRequest = serde_json::from_value(json).unwrap();
        assert_eq!(back, req);
    }
}
