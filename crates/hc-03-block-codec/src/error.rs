use shared_crypto::CryptoError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CodecError>;

/// Block encoding and decoding errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("block size is zero")]
    ZeroBlockSize,

    #[error("block size {size} exceeds max_block_size {max}")]
    MaxBlockSize { size: usize, max: usize },

    #[error("truncated block: need {needed} bytes at offset {offset}")]
    Truncated { needed: usize, offset: usize },

    #[error("{0} trailing bytes after the transaction stream")]
    TrailingBytes(usize),

    #[error("unknown block format version {0}")]
    UnknownVersion(u8),

    #[error("declared {0} transactions, more than the payload can hold")]
    TooManyTransactions(u32),

    #[error("previous rollbacks hash has {0} bytes, expected 32")]
    InvalidHashLength(usize),

    #[error("field too large to encode: {0} bytes")]
    FieldTooLarge(usize),

    #[error("signing failed: {0}")]
    Crypto(#[from] CryptoError),
}

impl CodecError {
    /// True for errors that describe the input bytes rather than its size.
    pub fn is_malformed(&self) -> bool {
        matches!(
            self,
            Self::Truncated { .. }
                | Self::TrailingBytes(_)
                | Self::UnknownVersion(_)
                | Self::TooManyTransactions(_)
                | Self::InvalidHashLength(_)
        )
    }
}
