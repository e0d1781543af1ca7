//! Honor-node set and the JSON-valued parameters.

use crate::error::{ParamError, Result};
use shared_types::HonorNode;
use std::collections::{BTreeMap, HashSet};

/// Parsed `honor_nodes`, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HonorNodeSet {
    /// Every declared node, stopped ones included.
    all: Vec<HonorNode>,
    /// Active nodes; the index is the node position.
    by_position: Vec<HonorNode>,
}

impl HonorNodeSet {
    /// Parse the parameter value. An empty value is an empty set.
    pub fn parse(value: &str) -> Result<Self> {
        if value.trim().is_empty() {
            return Ok(Self::default());
        }
        let all: Vec<HonorNode> =
            serde_json::from_str(value).map_err(|source| ParamError::InvalidJson {
                name: super::names::HONOR_NODES.to_string(),
                source,
            })?;
        let mut seen = HashSet::new();
        for node in &all {
            if !seen.insert(node.public_key.clone()) {
                return Err(ParamError::DuplicateHonorNode(node.public_key_hex()));
            }
        }
        let by_position = all.iter().filter(|n| !n.stopped).cloned().collect();
        Ok(Self { all, by_position })
    }

    /// A set holding only the first-block signer at position 0.
    pub fn single(public_key: Vec<u8>) -> Self {
        let node = HonorNode {
            public_key,
            ..Default::default()
        };
        Self {
            all: vec![node.clone()],
            by_position: vec![node],
        }
    }

    pub fn all(&self) -> &[HonorNode] {
        &self.all
    }

    pub fn active(&self) -> &[HonorNode] {
        &self.by_position
    }

    pub fn is_empty(&self) -> bool {
        self.by_position.is_empty()
    }

    pub fn by_position(&self, position: i64) -> Result<&HonorNode> {
        usize::try_from(position)
            .ok()
            .and_then(|i| self.by_position.get(i))
            .ok_or(ParamError::IncorrectPosition(position))
    }

    /// Position among active nodes. A stopped node is reported as disabled.
    pub fn position_of(&self, public_key: &[u8]) -> Result<i64> {
        if self
            .all
            .iter()
            .any(|n| n.stopped && n.public_key == public_key)
        {
            return Err(ParamError::NodeDisabled);
        }
        self.by_position
            .iter()
            .position(|n| n.public_key == public_key)
            .map(|i| i as i64)
            .ok_or(ParamError::IncorrectPublicKey)
    }

    pub fn by_host(&self, host: &str) -> Option<&HonorNode> {
        self.all.iter().find(|n| n.tcp_address == host)
    }

    /// TCP addresses of active nodes other than `own_key`.
    pub fn remote_hosts(&self, own_key: &[u8]) -> Vec<String> {
        self.by_position
            .iter()
            .filter(|n| n.public_key != own_key && !n.tcp_address.is_empty())
            .map(|n| n.tcp_address.clone())
            .collect()
    }
}

/// Parse `[["eco","value"], ...]` into an ecosystem map. Short items are
/// skipped.
pub fn parse_ecosystem_pairs(name: &str, value: &str) -> Result<BTreeMap<i64, String>> {
    if value.trim().is_empty() {
        return Ok(BTreeMap::new());
    }
    let items: Vec<Vec<String>> =
        serde_json::from_str(value).map_err(|source| ParamError::InvalidJson {
            name: name.to_string(),
            source,
        })?;
    Ok(items
        .into_iter()
        .filter(|item| item.len() >= 2)
        .filter_map(|item| {
            let eco = item[0].trim().parse::<i64>().ok()?;
            Some((eco, item[1].clone()))
        })
        .collect())
}
