//! TCP adapter for the peer protocol.
//!
//! One connection per request. The server side lives in the node runtime and
//! uses [`read_frame`] / [`write_frame`] from here.

use crate::config::TransportConfig;
use crate::domain::{
    BlockBodies, BlockBodiesRequest, Frame, FullBlockPush, MaxBlockId, MessageKind, MissingTxs,
    TxBatch,
};
use crate::error::TransportError;
use crate::ports::PeerTransport;
use async_trait::async_trait;
use hc_03_block_codec::RawTransaction;
use std::collections::HashSet;
use std::future::Future;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::debug;

/// Read one frame, refusing payloads over `max_size`.
pub async fn read_frame<R: AsyncRead + Unpin>(reader: &mut R, max_size: usize) -> Result<Frame, TransportError> {
    let kind = MessageKind::try_from(reader.read_u8().await?)?;
    let len = reader.read_u32().await? as usize;
    if len > max_size {
        return Err(TransportError::FrameTooLarge { size: len, max: max_size });
    }
    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).await?;
    Ok(Frame { kind, payload })
}

pub async fn write_frame<W: AsyncWrite + Unpin>(writer: &mut W, frame: &Frame) -> Result<(), TransportError> {
    let len = u32::try_from(frame.payload.len()).map_err(|_| TransportError::FrameTooLarge {
        size: frame.payload.len(),
        max: u32::MAX as usize,
    })?;
    writer.write_u8(frame.kind as u8).await?;
    writer.write_u32(len).await?;
    writer.write_all(&frame.payload).await?;
    writer.flush().await?;
    Ok(())
}

#[derive(Debug, Clone, Default)]
pub struct TcpTransport {
    config: TransportConfig,
}

impl TcpTransport {
    pub fn new(config: TransportConfig) -> Self {
        Self { config }
    }

    async fn connect(&self, host: &str) -> Result<TcpStream, TransportError> {
        timed(host, self.config.connect_timeout(), TcpStream::connect(host))
            .await?
            .map_err(TransportError::from)
    }

    async fn send(&self, host: &str, stream: &mut TcpStream, frame: &Frame) -> Result<(), TransportError> {
        timed(host, self.config.io_timeout(), write_frame(stream, frame)).await?
    }

    async fn recv(&self, host: &str, stream: &mut TcpStream) -> Result<Frame, TransportError> {
        timed(host, self.config.io_timeout(), read_frame(stream, self.config.max_frame_size)).await?
    }
}

async fn timed<T>(host: &str, limit: Duration, fut: impl Future<Output = T>) -> Result<T, TransportError> {
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| TransportError::Timeout { host: host.to_string() })
}

#[async_trait]
impl PeerTransport for TcpTransport {
    async fn send_full_block(
        &self,
        host: &str,
        honor_node_id: i64,
        block: Option<&[u8]>,
        txs: &[RawTransaction],
    ) -> Result<(), TransportError> {
        let mut stream = self.connect(host).await?;
        let push = FullBlockPush {
            honor_node_id,
            block: block.map(<[u8]>::to_vec),
            tx_hashes: txs.iter().map(|t| t.hash).collect(),
        };
        self.send(host, &mut stream, &Frame::encode(MessageKind::FullBlock, &push)?)
            .await?;

        let missing: MissingTxs = self
            .recv(host, &mut stream)
            .await?
            .expect(MessageKind::FullBlock)?;
        if missing.hashes.is_empty() {
            return Ok(());
        }
        let wanted: HashSet<_> = missing.hashes.into_iter().collect();
        let batch = TxBatch {
            txs: txs
                .iter()
                .filter(|t| wanted.contains(&t.hash))
                .map(|t| t.data.clone())
                .collect(),
        };
        debug!(host, missing = batch.txs.len(), "[hc-07] peer asked for transactions");
        self.send(host, &mut stream, &Frame::encode(MessageKind::Transactions, &batch)?)
            .await
    }

    async fn send_transactions(&self, host: &str, txs: &[RawTransaction]) -> Result<(), TransportError> {
        let mut stream = self.connect(host).await?;
        let batch = TxBatch {
            txs: txs.iter().map(|t| t.data.clone()).collect(),
        };
        self.send(host, &mut stream, &Frame::encode(MessageKind::Transactions, &batch)?)
            .await
    }

    async fn get_blocks_bodies(&self, host: &str, from_id: i64, count: u32) -> Result<Vec<Vec<u8>>, TransportError> {
        let mut stream = self.connect(host).await?;
        let request = BlockBodiesRequest { from_id, count };
        self.send(host, &mut stream, &Frame::encode(MessageKind::BlockBodies, &request)?)
            .await?;
        let bodies: BlockBodies = self
            .recv(host, &mut stream)
            .await?
            .expect(MessageKind::BlockBodies)?;
        Ok(bodies.blocks)
    }

    async fn max_block_id(&self, host: &str) -> Result<i64, TransportError> {
        let mut stream = self.connect(host).await?;
        self.send(host, &mut stream, &Frame::empty(MessageKind::MaxBlockId))
            .await?;
        let reply: MaxBlockId = self
            .recv(host, &mut stream)
            .await?
            .expect(MessageKind::MaxBlockId)?;
        Ok(reply.block_id)
    }
}
