//! # Transactions
//!
//! Wire form: one type byte followed by a bincode body. Each body carries an
//! Ed25519 signature over its own bincode encoding with the signature field
//! emptied.
//!
//! | Type | Body | Played by |
//! |------|------|-----------|
//! | 128 | [`SmartCall`] | contract VM |
//! | 1 | [`FirstBlockTx`] | custom handler |
//! | 2 | [`StopNetworkTx`] | custom handler |

use crate::error::{ExecError, Result};
use hc_03_block_codec::tx_hash;
use serde::{Deserialize, Serialize};
use shared_crypto::{key_id_from_public, verify_signature, Ed25519KeyPair};
use shared_types::Hash;
use std::collections::BTreeMap;

pub const TX_TYPE_SMART: u8 = 128;
pub const TX_TYPE_FIRST_BLOCK: u8 = 1;
pub const TX_TYPE_STOP_NETWORK: u8 = 2;

/// Accepted distance of a transaction's time from its block's time.
pub const MAX_TX_BACK: i64 = 86_400;
pub const MAX_TX_FORWARD: i64 = 600;

/// Fields common to every transaction body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TxHeader {
    pub time: i64,
    pub ecosystem_id: i64,
    pub key_id: i64,
    pub network_id: i64,
    #[serde(with = "hex")]
    pub public_key: Vec<u8>,
}

impl TxHeader {
    /// A header for `key`, with the key id derived from its public key.
    pub fn for_key(key: &Ed25519KeyPair, time: i64, ecosystem_id: i64, network_id: i64) -> Self {
        let public_key = key.public_key().as_bytes().to_vec();
        Self {
            time,
            ecosystem_id,
            key_id: key_id_from_public(&public_key),
            network_id,
            public_key,
        }
    }
}

/// A contract call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmartCall {
    pub header: TxHeader,
    pub contract: String,
    pub params: BTreeMap<String, String>,
    pub signature: Vec<u8>,
}

/// Transaction of the genesis block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirstBlockTx {
    pub header: TxHeader,
    #[serde(with = "hex")]
    pub node_public_key: Vec<u8>,
    /// Initial balance of the founder account.
    pub founder_amount: i128,
    pub test: bool,
    pub private_blockchain: bool,
    pub signature: Vec<u8>,
}

/// Founder-signed request to stop the network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StopNetworkTx {
    pub header: TxHeader,
    pub reason: String,
    pub signature: Vec<u8>,
}

/// Parsed body by type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxBody {
    Smart(SmartCall),
    FirstBlock(FirstBlockTx),
    StopNetwork(StopNetworkTx),
}

macro_rules! signed_body {
    ($ty:ty) => {
        impl $ty {
            fn signing_bytes(&self) -> Result<Vec<u8>> {
                let mut unsigned = self.clone();
                unsigned.signature.clear();
                bincode::serialize(&unsigned).map_err(|e| ExecError::Malformed(e.to_string()))
            }

            /// Sign with `key` and return the body.
            pub fn signed(mut self, key: &Ed25519KeyPair) -> Result<Self> {
                self.signature = key.sign(&self.signing_bytes()?);
                Ok(self)
            }
        }
    };
}

signed_body!(SmartCall);
signed_body!(FirstBlockTx);
signed_body!(StopNetworkTx);

impl TxBody {
    pub fn tx_type(&self) -> u8 {
        match self {
            Self::Smart(_) => TX_TYPE_SMART,
            Self::FirstBlock(_) => TX_TYPE_FIRST_BLOCK,
            Self::StopNetwork(_) => TX_TYPE_STOP_NETWORK,
        }
    }

    pub fn header(&self) -> &TxHeader {
        match self {
            Self::Smart(b) => &b.header,
            Self::FirstBlock(b) => &b.header,
            Self::StopNetwork(b) => &b.header,
        }
    }

    fn signature(&self) -> &[u8] {
        match self {
            Self::Smart(b) => &b.signature,
            Self::FirstBlock(b) => &b.signature,
            Self::StopNetwork(b) => &b.signature,
        }
    }

    fn signing_bytes(&self) -> Result<Vec<u8>> {
        match self {
            Self::Smart(b) => b.signing_bytes(),
            Self::FirstBlock(b) => b.signing_bytes(),
            Self::StopNetwork(b) => b.signing_bytes(),
        }
    }

    /// Wire bytes: type byte then bincode body.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let body = match self {
            Self::Smart(b) => bincode::serialize(b),
            Self::FirstBlock(b) => bincode::serialize(b),
            Self::StopNetwork(b) => bincode::serialize(b),
        }
        .map_err(|e| ExecError::Malformed(e.to_string()))?;
        let mut out = Vec::with_capacity(1 + body.len());
        out.push(self.tx_type());
        out.extend(body);
        Ok(out)
    }
}

/// A transaction as carried in a block or the mempool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub hash: Hash,
    /// Full wire bytes.
    pub data: Vec<u8>,
    pub body: TxBody,
}

impl Transaction {
    /// Parse wire bytes. The signature is not checked here.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let (&kind, rest) = data.split_first().ok_or(ExecError::Empty)?;
        let malformed = |e: bincode::Error| ExecError::Malformed(e.to_string());
        let body = match kind {
            TX_TYPE_SMART => TxBody::Smart(bincode::deserialize(rest).map_err(malformed)?),
            TX_TYPE_FIRST_BLOCK => TxBody::FirstBlock(bincode::deserialize(rest).map_err(malformed)?),
            TX_TYPE_STOP_NETWORK => {
                TxBody::StopNetwork(bincode::deserialize(rest).map_err(malformed)?)
            }
            other => return Err(ExecError::UnknownType(other)),
        };
        Ok(Self {
            hash: tx_hash(data),
            data: data.to_vec(),
            body,
        })
    }

    /// Encode a body into a transaction.
    pub fn from_body(body: TxBody) -> Result<Self> {
        let data = body.encode()?;
        Ok(Self {
            hash: tx_hash(&data),
            data,
            body,
        })
    }

    /// Parse and verify in one step, as done for every received transaction.
    pub fn parse_verified(data: &[u8]) -> Result<Self> {
        let tx = Self::parse(data)?;
        tx.verify_inner()?;
        Ok(tx)
    }

    /// Signature check and key-id binding.
    pub fn verify_inner(&self) -> Result<()> {
        let header = self.body.header();
        let derived = key_id_from_public(&header.public_key);
        if derived != header.key_id {
            return Err(ExecError::KeyMismatch {
                claimed: header.key_id,
                derived,
            });
        }
        verify_signature(
            &header.public_key,
            &self.body.signing_bytes()?,
            self.body.signature(),
        )?;
        Ok(())
    }

    /// The transaction's time must lie in
    /// `[block_time - MAX_TX_BACK, block_time + MAX_TX_FORWARD]`.
    pub fn check_time(&self, block_time: i64) -> Result<()> {
        let tx_time = self.time();
        let (min, max) = (block_time - MAX_TX_BACK, block_time + MAX_TX_FORWARD);
        if tx_time < min || tx_time > max {
            return Err(ExecError::Time { tx_time, min, max });
        }
        Ok(())
    }

    pub fn tx_type(&self) -> u8 {
        self.body.tx_type()
    }

    pub fn key_id(&self) -> i64 {
        self.body.header().key_id
    }

    pub fn time(&self) -> i64 {
        self.body.header().time
    }

    pub fn ecosystem_id(&self) -> i64 {
        self.body.header().ecosystem_id
    }

    pub fn is_smart(&self) -> bool {
        matches!(self.body, TxBody::Smart(_))
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }
}

/// Build a signed contract call.
pub fn smart_call(
    key: &Ed25519KeyPair,
    header: TxHeader,
    contract: &str,
    params: &[(&str, &str)],
) -> Result<Transaction> {
    let call = SmartCall {
        header,
        contract: contract.to_string(),
        params: params
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
        signature: Vec::new(),
    }
    .signed(key)?;
    Transaction::from_body(TxBody::Smart(call))
}

/// Build the signed genesis transaction of `founder`.
pub fn first_block(
    founder: &Ed25519KeyPair,
    node_public_key: Vec<u8>,
    time: i64,
    founder_amount: i128,
    test: bool,
    private_blockchain: bool,
) -> Result<Transaction> {
    let body = FirstBlockTx {
        header: TxHeader::for_key(founder, time, 1, 1),
        node_public_key,
        founder_amount,
        test,
        private_blockchain,
        signature: Vec::new(),
    }
    .signed(founder)?;
    Transaction::from_body(TxBody::FirstBlock(body))
}

/// Build a signed stop-network request.
pub fn stop_network(key: &Ed25519KeyPair, header: TxHeader, reason: &str) -> Result<Transaction> {
    let body = StopNetworkTx {
        header,
        reason: reason.to_string(),
        signature: Vec::new(),
    }
    .signed(key)?;
    Transaction::from_body(TxBody::StopNetwork(body))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> Ed25519KeyPair {
        Ed25519KeyPair::from_seed([5; 32])
    }

    fn transfer(time: i64) -> Transaction {
        let k = key();
        let header = TxHeader::for_key(&k, time, 1, 1);
        smart_call(&k, header, "MoneyTransfer", &[("recipient", "7"), ("amount", "10")]).unwrap()
    }

    #[test]
    fn test_parse_verified_accepts_own_encoding() {
        let tx = transfer(1_000);
        let parsed = Transaction::parse_verified(&tx.data).unwrap();
        assert_eq!(parsed, tx);
        assert!(parsed.is_smart());
        assert_eq!(parsed.key_id(), key_id_from_public(key().public_key().as_bytes()));
    }

    #[test]
    fn test_tampered_params_fail_signature() {
        let mut tx = transfer(1_000);
        if let TxBody::Smart(call) = &mut tx.body {
            call.params.insert("amount".into(), "999".into());
        }
        let data = tx.body.encode().unwrap();
        assert!(matches!(
            Transaction::parse_verified(&data),
            Err(ExecError::Signature(_))
        ));
    }

    #[test]
    fn test_key_id_must_match_public_key() {
        let k = key();
        let mut header = TxHeader::for_key(&k, 1, 1, 1);
        header.key_id += 1;
        let tx = smart_call(&k, header, "X", &[]).unwrap();
        assert!(matches!(tx.verify_inner(), Err(ExecError::KeyMismatch { .. })));
    }

    #[test]
    fn test_check_time_window() {
        let tx = transfer(10_000);
        assert!(tx.check_time(10_000).is_ok());
        assert!(tx.check_time(10_000 + MAX_TX_BACK).is_ok());
        assert!(tx.check_time(10_000 - MAX_TX_FORWARD).is_ok());
        assert!(matches!(tx.check_time(10_000 + MAX_TX_BACK + 1), Err(ExecError::Time { .. })));
        assert!(matches!(tx.check_time(10_000 - MAX_TX_FORWARD - 1), Err(ExecError::Time { .. })));
    }

    #[test]
    fn test_unknown_and_empty() {
        assert!(matches!(Transaction::parse(&[]), Err(ExecError::Empty)));
        assert!(matches!(Transaction::parse(&[77, 1]), Err(ExecError::UnknownType(77))));
        assert!(matches!(Transaction::parse(&[128, 1]), Err(ExecError::Malformed(_))));
    }
}
