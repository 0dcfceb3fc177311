use thiserror::Error;

/// Failure to turn received bytes into a message.
///
/// Callers treat every variant the same way: as if no data had arrived.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("message truncated: needed {needed} bytes, {available} available")]
    Truncated { needed: usize, available: usize },

    #[error("unexpected BER tag: expected 0x{expected:02x}, found 0x{found:02x}")]
    UnexpectedTag { expected: u8, found: u8 },

    #[error("invalid BER length encoding")]
    BadLength,

    #[error("invalid object identifier: {0}")]
    BadOid(String),

    #[error("integer does not fit in 64 bits")]
    IntegerOverflow,

    #[error("unsupported SNMP version {0}")]
    UnsupportedVersion(i64),
}

/// Failure to turn a message into bytes.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EncodeError {
    #[error("object identifier {0} has no BER encoding")]
    UnencodableOid(String),
}
