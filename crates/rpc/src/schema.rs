//! Compile-time wire schema and runtime compatibility checks.
//!
//! The node still advertises its own descriptor through `Base.GetNodeInfo`.
//! Instead of loading that text as the schema, the client compares it with the
//! descriptor it was built from and refuses (or warns about) nodes that lack
//! a method it calls.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::fmt;
use std::io::Write;
use std::path::Path;
use std::str::FromStr;

use crate::error::{Result, RpcError};

/// Descriptor the generated stubs were compiled from.
pub const LOCAL_SCHEMA: &str = include_str!("../proto/qrl.proto");

pub const PACKAGE: &str = "qrl";
pub const PUBLIC_SERVICE: &str = "PublicAPI";

/// `PublicAPI` methods this client calls.
pub const REQUIRED_METHODS: &[&str] = &["GetNodeState", "GetKnownPeers", "GetAddressState", "TransferCoins"];

/// What to do when the node's schema does not line up with ours
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaPolicy {
    /// Refuse to talk to an incompatible node
    #[default]
    Strict,
    /// Log the mismatch and carry on
    Warn,
    /// Never fetch or inspect the remote schema
    Off,
}

impl FromStr for SchemaPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "strict" => Ok(SchemaPolicy::Strict),
            "warn" => Ok(SchemaPolicy::Warn),
            "off" => Ok(SchemaPolicy::Off),
            other => Err(format!("unknown schema policy '{}' (expected strict, warn or off)", other)),
        }
    }
}

impl fmt::Display for SchemaPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SchemaPolicy::Strict => "strict",
            SchemaPolicy::Warn => "warn",
            SchemaPolicy::Off => "off",
        };
        f.write_str(s)
    }
}

/// Outcome of comparing the remote descriptor against [`LOCAL_SCHEMA`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Compatibility {
    /// Byte-identical descriptor
    Exact,
    /// Every required method is present; `extra` lists methods we do not use
    Compatible { extra: Vec<String> },
    /// What is missing, as `package`, `service` or method names
    Incompatible { missing: Vec<String> },
}

impl Compatibility {
    pub fn is_usable(&self) -> bool {
        !matches!(self, Compatibility::Incompatible { .. })
    }
}

impl fmt::Display for Compatibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Compatibility::Exact => f.write_str("exact"),
            Compatibility::Compatible { extra } if extra.is_empty() => f.write_str("compatible"),
            Compatibility::Compatible { extra } => write!(f, "compatible (extra: {})", extra.join(", ")),
            Compatibility::Incompatible { missing } => write!(f, "incompatible (missing: {})", missing.join(", ")),
        }
    }
}

/// SHA-256 of a descriptor's text, hex encoded.
pub fn fingerprint(proto: &str) -> String {
    hex::encode(Sha256::digest(proto.as_bytes()))
}

pub fn local_fingerprint() -> String {
    fingerprint(LOCAL_SCHEMA)
}

/// Package name and service → rpc names declared by a `.proto` text.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ProtoSummary {
    pub package: Option<String>,
    pub services: Vec<(String, BTreeSet<String>)>,
}

impl ProtoSummary {
    pub fn parse(text: &str) -> Self {
        let tokens = tokenize(&strip_comments(text));
        let mut summary = ProtoSummary::default();
        let mut i = 0;

        while i < tokens.len() {
            match tokens[i].as_str() {
                "package" => {
                    summary.package = tokens.get(i + 1).cloned();
                    i += 2;
                }
                "service" => {
                    let name = tokens.get(i + 1).cloned().unwrap_or_default();
                    let mut methods = BTreeSet::new();
                    i += 2;
                    if tokens.get(i).map(String::as_str) != Some("{") {
                        continue;
                    }
                    i += 1;
                    let mut depth = 1usize;
                    while i < tokens.len() && depth > 0 {
                        match tokens[i].as_str() {
                            "{" => depth += 1,
                            "}" => depth -= 1,
                            "rpc" if depth == 1 => {
                                if let Some(m) = tokens.get(i + 1) {
                                    methods.insert(m.clone());
                                }
                            }
                            _ => {}
                        }
                        i += 1;
                    }
                    summary.services.push((name, methods));
                }
                _ => i += 1,
            }
        }

        summary
    }

    pub fn methods_of(&self, service: &str) -> Option<&BTreeSet<String>> {
        self.services
            .iter()
            .find(|(name, _)| name == service)
            .map(|(_, methods)| methods)
    }
}

fn strip_comments(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    let mut in_string = false;
    let mut escaped = false;

    while let Some(c) = chars.next() {
        if in_string {
            out.push(c);
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match (c, chars.peek()) {
            ('"', _) => {
                in_string = true;
                out.push(c);
            }
            ('/', Some('/')) => {
                for n in chars.by_ref() {
                    if n == '\n' {
                        out.push('\n');
                        break;
                    }
                }
            }
            ('/', Some('*')) => {
                chars.next();
                let mut prev = '\0';
                for n in chars.by_ref() {
                    if prev == '*' && n == '/' {
                        break;
                    }
                    prev = n;
                }
                out.push(' ');
            }
            _ => out.push(c),
        }
    }
    out
}

fn tokenize(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    for c in text.chars() {
        if c.is_whitespace() || "{}();=<>,".contains(c) {
            if !current.is_empty() {
                tokens.push(std::mem::take(&mut current));
            }
            if !c.is_whitespace() {
                tokens.push(c.to_string());
            }
        } else {
            current.push(c);
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

/// Compares a node's advertised descriptor with the compiled one.
pub fn check_compatibility(remote_proto: &str) -> Compatibility {
    if remote_proto == LOCAL_SCHEMA {
        return Compatibility::Exact;
    }

    let summary = ProtoSummary::parse(remote_proto);
    let mut missing = Vec::new();

    if summary.package.as_deref() != Some(PACKAGE) {
        missing.push(format!("package {}", PACKAGE));
    }

    let Some(methods) = summary.methods_of(PUBLIC_SERVICE) else {
        missing.push(format!("service {}", PUBLIC_SERVICE));
        return Compatibility::Incompatible { missing };
    };

    missing.extend(
        REQUIRED_METHODS
            .iter()
            .filter(|m| !methods.contains(**m))
            .map(|m| m.to_string()),
    );

    if !missing.is_empty() {
        return Compatibility::Incompatible { missing };
    }

    let extra = methods
        .iter()
        .filter(|m| !REQUIRED_METHODS.contains(&m.as_str()))
        .cloned()
        .collect();
    Compatibility::Compatible { extra }
}

/// Dotted numeric version, e.g. the `0.55.1` in `"0.55.1 python"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct NodeVersion(pub u64, pub u64, pub u64);

impl FromStr for NodeVersion {
    type Err = RpcError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim().trim_start_matches(['v', 'V']);
        let prefix: String = s.chars().take_while(|c| c.is_ascii_digit() || *c == '.').collect();
        let prefix = prefix.trim_end_matches('.');
        if prefix.is_empty() {
            return Err(RpcError::SchemaMismatch(format!("unparsable node version '{}'", s)));
        }

        let mut parts = [0u64; 3];
        for (slot, piece) in parts.iter_mut().zip(prefix.split('.')) {
            *slot = piece
                .parse()
                .map_err(|_| RpcError::SchemaMismatch(format!("unparsable node version '{}'", s)))?;
        }
        Ok(NodeVersion(parts[0], parts[1], parts[2]))
    }
}

impl fmt::Display for NodeVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.0, self.1, self.2)
    }
}

/// Fails with `SchemaMismatch` when `remote` is older than `min`.
pub fn check_min_version(remote: &str, min: &str) -> Result<()> {
    let remote_v: NodeVersion = remote.parse()?;
    let min_v: NodeVersion = min
        .parse()
        .map_err(|_| RpcError::Config(format!("invalid min_node_version '{}'", min)))?;
    if remote_v < min_v {
        return Err(RpcError::SchemaMismatch(format!(
            "node version {} is older than required {}",
            remote_v, min_v
        )));
    }
    Ok(())
}

/// Writes a descriptor to `path` through a temp file in the same directory.
///
/// Returns the fingerprint of what was written.
pub fn save_schema(path: &Path, proto: &str) -> Result<String> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(proto.as_bytes())?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| RpcError::Io(e.error))?;

    Ok(fingerprint(proto))
}
