use std::collections::BTreeSet;

use crate::error::{ChainError, Result};

/// Known peers, stored as `host:port` (or a bare path) and deduplicated.
///
/// Iteration is lexicographic, which is also the order consensus uses to
/// break ties between equally long chains.
#[derive(Debug, Default, Clone)]
pub struct PeerRegistry {
    nodes: BTreeSet<String>,
}

impl PeerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a peer; returns the canonical form that was stored.
    /// Registering the same peer twice is a no-op.
    pub fn register_node(&mut self, address: &str) -> Result<String> {
        let node = parse_node_address(address)?;
        self.nodes.insert(node.clone());
        Ok(node)
    }

    /// Register a batch of peers. Every address is parsed before any is
    /// stored, so a batch with one malformed address changes nothing.
    pub fn register_nodes<S: AsRef<str>>(&mut self, addresses: &[S]) -> Result<Vec<String>> {
        let nodes = addresses
            .iter()
            .map(|address| parse_node_address(address.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        self.nodes.extend(nodes.iter().cloned());
        Ok(nodes)
    }

    pub fn nodes(&self) -> Vec<String> {
        self.nodes.iter().cloned().collect()
    }

    pub fn contains(&self, node: &str) -> bool {
        self.nodes.contains(node)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Reduce an address to its network location (`host:port`), or to its path
/// when it has no network location.
///
/// `http://192.168.0.5:5000/x` -> `192.168.0.5:5000`,
/// `//10.0.0.1:80` -> `10.0.0.1:80`, `192.168.0.5:5000` -> itself.
pub fn parse_node_address(address: &str) -> Result<String> {
    let trimmed = address.trim();

    let after_scheme = match trimmed.find("://") {
        Some(pos) if is_scheme(&trimmed[..pos]) => Some(&trimmed[pos + 3..]),
        Some(_) => return Err(ChainError::InvalidAddress(address.to_string())),
        None => trimmed.strip_prefix("//"),
    };

    let path = match after_scheme {
        Some(rest) => {
            let end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
            let netloc = &rest[..end];
            if !netloc.is_empty() {
                return Ok(netloc.to_string());
            }
            &rest[end..]
        }
        None => trimmed,
    };

    let path = path.split(['?', '#']).next().unwrap_or_default();
    if path.is_empty() {
        return Err(ChainError::InvalidAddress(address.to_string()));
    }
    Ok(path.to_string())
}

fn is_scheme(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}
