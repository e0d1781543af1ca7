//! # Block Wire Format
//!
//! ```text
//! ┌────┬──────────┬──────┬──────────────┬────────┬───────────────┬─────────┐
//! │ u8 │ block_id │ time │ ecosystem_id │ key_id │ node_position │ version │
//! │ 0  │   i64    │ i64  │     i64      │  i64   │      i64      │   i32   │
//! ├────┴──────────┴──────┴──────────────┴────────┴───────────────┴─────────┤
//! │ u32 len │ prev_rollbacks_hash   u32 len │ sign                         │
//! ├──────────────────────────────────────────────────────────────────────────┤
//! │ u32 count │ (u32 len │ tx bytes) * count                               │
//! └──────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! All integers are big-endian. Encoding is deterministic: the same header
//! and transactions always give the same bytes.

use crate::domain::block::{for_sign, ParsedBlock, RawTransaction};
use crate::domain::merkle::merkle_root;
use crate::error::{CodecError, Result};
use shared_crypto::Ed25519KeyPair;
use shared_types::{BlockHeader, Hash};

/// Format marker written first.
pub const FORMAT_VERSION: u8 = 0;

/// Bytes before the variable-length fields.
const FIXED_HEADER_LEN: usize = 1 + 8 * 5 + 4;

// =============================================================================
// ENCODING
// =============================================================================

fn put_len(out: &mut Vec<u8>, len: usize) -> Result<()> {
    let len = u32::try_from(len).map_err(|_| CodecError::FieldTooLarge(len))?;
    out.extend_from_slice(&len.to_be_bytes());
    Ok(())
}

fn put_bytes(out: &mut Vec<u8>, data: &[u8]) -> Result<()> {
    put_len(out, data.len())?;
    out.extend_from_slice(data);
    Ok(())
}

/// Encode a header and its transactions, using `header.sign` verbatim.
pub fn encode(header: &BlockHeader, prev_rollbacks_hash: &Hash, tx_data: &[Vec<u8>]) -> Result<Vec<u8>> {
    let body: usize = tx_data.iter().map(|t| 4 + t.len()).sum();
    let mut out = Vec::with_capacity(FIXED_HEADER_LEN + 8 + 32 + header.sign.len() + 4 + body);

    out.push(FORMAT_VERSION);
    out.extend_from_slice(&header.block_id.to_be_bytes());
    out.extend_from_slice(&header.time.to_be_bytes());
    out.extend_from_slice(&header.ecosystem_id.to_be_bytes());
    out.extend_from_slice(&header.key_id.to_be_bytes());
    out.extend_from_slice(&header.node_position.to_be_bytes());
    out.extend_from_slice(&header.version.to_be_bytes());
    put_bytes(&mut out, prev_rollbacks_hash)?;
    put_bytes(&mut out, &header.sign)?;

    put_len(&mut out, tx_data.len())?;
    for tx in tx_data {
        put_bytes(&mut out, tx)?;
    }
    Ok(out)
}

/// Sign the header against `prev` and encode the block.
///
/// Returns the wire bytes and the header with `sign` and `hash` filled in.
pub fn marshal(
    header: &BlockHeader,
    tx_data: &[Vec<u8>],
    prev: &BlockHeader,
    key: &Ed25519KeyPair,
) -> Result<(Vec<u8>, BlockHeader)> {
    let hashes: Vec<Hash> = tx_data.iter().map(|t| crate::tx_hash(t)).collect();
    let root = merkle_root(&hashes);
    let forsign = for_sign(header, &prev.hash, &root, &prev.rollbacks_hash);

    let mut signed = header.clone();
    signed.sign = key.sign(forsign.as_bytes());
    signed.hash = crate::block_hash(&forsign);

    let bytes = encode(&signed, &prev.rollbacks_hash, tx_data)?;
    Ok((bytes, signed))
}

// =============================================================================
// DECODING
// =============================================================================

struct Reader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    fn remaining(&self) -> usize {
        self.data.len() - self.offset
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.remaining() < n {
            return Err(CodecError::Truncated {
                needed: n,
                offset: self.offset,
            });
        }
        let slice = &self.data[self.offset..self.offset + n];
        self.offset += n;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn u32(&mut self) -> Result<u32> {
        Ok(u32::from_be_bytes(self.array()?))
    }

    fn i32(&mut self) -> Result<i32> {
        Ok(i32::from_be_bytes(self.array()?))
    }

    fn i64(&mut self) -> Result<i64> {
        Ok(i64::from_be_bytes(self.array()?))
    }

    fn bytes(&mut self) -> Result<&'a [u8]> {
        let len = self.u32()? as usize;
        self.take(len)
    }
}

/// Decode block bytes. The Merkle root is computed from the carried
/// transactions.
pub fn unmarshal(data: &[u8]) -> Result<ParsedBlock> {
    if data.is_empty() {
        return Err(CodecError::ZeroBlockSize);
    }
    let mut r = Reader::new(data);

    let version = r.u8()?;
    if version != FORMAT_VERSION {
        return Err(CodecError::UnknownVersion(version));
    }
    let mut header = BlockHeader {
        block_id: r.i64()?,
        time: r.i64()?,
        ecosystem_id: r.i64()?,
        key_id: r.i64()?,
        node_position: r.i64()?,
        version: r.i32()?,
        ..Default::default()
    };

    let raw_prev = r.bytes()?;
    let prev_rollbacks_hash: Hash = raw_prev
        .try_into()
        .map_err(|_| CodecError::InvalidHashLength(raw_prev.len()))?;
    header.sign = r.bytes()?.to_vec();

    let count = r.u32()?;
    if count as usize > r.remaining() / 4 {
        return Err(CodecError::TooManyTransactions(count));
    }
    let mut transactions = Vec::with_capacity(count as usize);
    for _ in 0..count {
        transactions.push(RawTransaction::new(r.bytes()?.to_vec()));
    }
    if r.remaining() > 0 {
        return Err(CodecError::TrailingBytes(r.remaining()));
    }

    let hashes: Vec<Hash> = transactions.iter().map(|t| t.hash).collect();
    Ok(ParsedBlock {
        header,
        prev_rollbacks_hash,
        merkle_root: merkle_root(&hashes),
        transactions,
        bin_data: data.to_vec(),
    })
}

/// [`unmarshal`] with a size ceiling (`max_block_size`).
pub fn unmarshal_limited(data: &[u8], max_size: usize) -> Result<ParsedBlock> {
    if data.len() > max_size {
        return Err(CodecError::MaxBlockSize {
            size: data.len(),
            max: max_size,
        });
    }
    unmarshal(data)
}
