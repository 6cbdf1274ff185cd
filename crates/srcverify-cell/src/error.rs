//! Codec errors
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CellError {
    #[error("malformed encoding: {0}")]
    MalformedEncoding(String),

    #[error("cell data overflow: {0} bits exceed the 1023-bit limit")]
    BitOverflow(usize),

    #[error("cell reference overflow: more than 4 references")]
    RefOverflow,

    #[error("cell depth {0} exceeds the maximum")]
    DepthOverflow(u16),

    #[error("value {value} does not fit in {bits} bits")]
    IntegerOverflow { value: u64, bits: usize },

    #[error("cell underflow: needed {needed} bits, {remaining} left")]
    BitUnderflow { needed: usize, remaining: usize },

    #[error("cell underflow: no reference left")]
    RefUnderflow,

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("snake string data is not byte aligned")]
    InvalidSnake,
}

impl CellError {
    pub(crate) fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedEncoding(msg.into())
    }
}
