//! Outbound Ports (Driven Ports)
//!
//! What dissemination and block collection need from the network.

use crate::error::TransportError;
use async_trait::async_trait;
use hc_03_block_codec::RawTransaction;

/// Peer protocol client.
///
/// Hosts are `ip:port` TCP addresses as listed in `honor_nodes`.
#[async_trait]
pub trait PeerTransport: Send + Sync {
    /// Push a block (or nothing) and the hashes of `txs`; the peer asks back
    /// for the ones it is missing, which are then sent in full.
    async fn send_full_block(
        &self,
        host: &str,
        honor_node_id: i64,
        block: Option<&[u8]>,
        txs: &[RawTransaction],
    ) -> Result<(), TransportError>;

    async fn send_transactions(&self, host: &str, txs: &[RawTransaction]) -> Result<(), TransportError>;

    /// Up to `count` consecutive block bodies starting at `from_id`.
    async fn get_blocks_bodies(&self, host: &str, from_id: i64, count: u32) -> Result<Vec<Vec<u8>>, TransportError>;

    async fn max_block_id(&self, host: &str) -> Result<i64, TransportError>;
}

/// What a [`MockTransport`] was asked to send.
#[cfg(test)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sent {
    FullBlock {
        host: String,
        honor_node_id: i64,
        block: Option<Vec<u8>>,
        txs: usize,
    },
    Transactions {
        host: String,
        txs: usize,
    },
}

/// Records pushes; hosts listed in `failing` refuse everything.
#[cfg(test)]
#[derive(Default)]
pub struct MockTransport {
    pub sent: parking_lot::Mutex<Vec<Sent>>,
    pub failing: Vec<String>,
    pub chain: Vec<Vec<u8>>,
}

#[cfg(test)]
impl MockTransport {
    pub fn failing(hosts: &[&str]) -> Self {
        Self {
            failing: hosts.iter().map(|h| h.to_string()).collect(),
            ..Default::default()
        }
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().clone()
    }

    fn check(&self, host: &str) -> Result<(), TransportError> {
        if self.failing.iter().any(|h| h == host) {
            return Err(TransportError::Unreachable(host.to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
#[async_trait]
impl PeerTransport for MockTransport {
    async fn send_full_block(
        &self,
        host: &str,
        honor_node_id: i64,
        block: Option<&[u8]>,
        txs: &[RawTransaction],
    ) -> Result<(), TransportError> {
        self.check(host)?;
        self.sent.lock().push(Sent::FullBlock {
            host: host.to_string(),
            honor_node_id,
            block: block.map(<[u8]>::to_vec),
            txs: txs.len(),
        });
        Ok(())
    }

    async fn send_transactions(&self, host: &str, txs: &[RawTransaction]) -> Result<(), TransportError> {
        self.check(host)?;
        self.sent.lock().push(Sent::Transactions {
            host: host.to_string(),
            txs: txs.len(),
        });
        Ok(())
    }

    async fn get_blocks_bodies(&self, host: &str, from_id: i64, count: u32) -> Result<Vec<Vec<u8>>, TransportError> {
        self.check(host)?;
        Ok(self
            .chain
            .iter()
            .skip((from_id - 1).max(0) as usize)
            .take(count as usize)
            .cloned()
            .collect())
    }

    async fn max_block_id(&self, host: &str) -> Result<i64, TransportError> {
        self.check(host)?;
        Ok(self.chain.len() as i64)
    }
}
