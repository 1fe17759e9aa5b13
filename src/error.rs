use thiserror::Error;

pub type Result<T, E = BettingError> = std::result::Result<T, E>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BettingError {
    // Consensus errors: the block must be rejected, nothing persists.
    #[error("block payout set does not match the required payouts: {0}")]
    ConsensusViolation(String),

    #[error("stored record is corrupt: {0}")]
    Codec(#[from] CodecError),

    // Transaction rejections: the txid is recorded in the failed-tx set
    // and block processing continues.
    #[error("malformed betting transaction: {0}")]
    MalformedTransaction(String),

    #[error("privileged operation from a non-oracle input")]
    OracleAuthorityMissing,

    #[error("record already exists: {0}")]
    DuplicateWrite(String),

    #[error("arithmetic overflow in {0}")]
    ArithmeticOverflow(&'static str),
}

impl BettingError {
    /// True for errors that reject a single transaction rather than the
    /// whole block. Ingest records these in the failed-tx set and carries on.
    pub fn is_tx_rejection(&self) -> bool {
        matches!(
            self,
            BettingError::MalformedTransaction(_)
                | BettingError::OracleAuthorityMissing
                | BettingError::DuplicateWrite(_)
                | BettingError::ArithmeticOverflow(_)
        )
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("unexpected end of input at byte {0}")]
    UnexpectedEof(usize),

    #[error("trailing bytes after decoding {0}")]
    TrailingBytes(&'static str),

    #[error("unknown {what} discriminant {value}")]
    BadDiscriminant { what: &'static str, value: u8 },

    #[error("length prefix {len} exceeds remaining input {remaining}")]
    OversizedLength { len: usize, remaining: usize },

    #[error("string field is not valid utf-8")]
    BadUtf8,
}
