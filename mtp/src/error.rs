// SPDX-License-Identifier: MIT OR Apache-2.0
/*
 * Error taxonomy for the MTP initiator.
 *
 * Copyright (c) 2025 Code Construct
 */

use thiserror::Error;

use crate::code::ResponseCode;
use crate::container::ContainerType;
use crate::types::TransactionId;

/// Failure in the underlying USB transport.
///
/// Apart from a stall (cleared and retried once by the pipe), these are
/// never recovered internally and propagate to the caller.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TransportError {
    /// I/O failure reported by the backend.
    #[error("usb i/o error: {0}")]
    Io(#[from] std::io::Error),
    /// The per-pipe transfer timeout elapsed.
    #[error("transfer timed out")]
    Timeout,
    /// The transfer was cancelled (class request 0x64).
    #[error("transfer cancelled")]
    Cancelled,
    /// The endpoint reported a halt condition.
    #[error("endpoint stalled")]
    Stall,
    /// The device went away.
    #[error("device disconnected")]
    Disconnected,
}

/// A malformed or out-of-sequence container.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProtocolError {
    /// Framing violation: bad length, bad type field, payload shorter than
    /// the header declares.
    #[error("malformed container: {0}")]
    Malformed(&'static str),
    /// A container carried a transaction id other than the outstanding one.
    #[error("transaction id mismatch: expected {expected}, got {actual}")]
    TransactionIdMismatch {
        /// The id of the outstanding transaction.
        expected: TransactionId,
        /// The id the device sent.
        actual: TransactionId,
    },
    /// A container type that is invalid at this point of the transaction.
    #[error("unexpected {actual:?} container, expected {expected:?}")]
    UnexpectedContainer {
        /// The container type the phase sequence requires.
        expected: ContainerType,
        /// The container type received.
        actual: ContainerType,
    },
    /// A data container carried a different code than the command phase.
    #[error("unexpected code {actual:#06x} in data phase, expected {expected:#06x}")]
    UnexpectedCode {
        /// The operation code of the outstanding command.
        expected: u16,
        /// The code the device sent.
        actual: u16,
    },
    /// A response container shorter than its mandatory header.
    #[error("short response")]
    ShortResponse,
}

/// Failure decoding or encoding a wire value.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CodecError {
    /// The buffer ended mid-field.
    #[error("truncated buffer")]
    Truncated,
    /// A `DataType` code this implementation does not know.
    #[error("unsupported data type {0:#06x}")]
    UnsupportedType(u16),
    /// Invalid UTF-16 in a string field.
    #[error("invalid utf-16 string")]
    BadString,
    /// A string too long for the single-byte length prefix.
    #[error("string exceeds 254 utf-16 code units")]
    StringTooLong,
    /// A property descriptor form flag this implementation does not know.
    #[error("unsupported property form {0:#04x}")]
    UnsupportedForm(u8),
}

/// Any failure of an MTP operation.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Transport-level failure.
    #[error("transport: {0}")]
    Transport(#[from] TransportError),
    /// Protocol-level failure.
    #[error("protocol: {0}")]
    Protocol(#[from] ProtocolError),
    /// Codec-level failure.
    #[error("codec: {0}")]
    Codec(#[from] CodecError),
    /// The device returned a non-OK response code.
    #[error("device responded {code}, params {params:08x?}{}", response_hint(*.code))]
    Response {
        /// The response code, verbatim.
        code: ResponseCode,
        /// Response parameters, verbatim.
        params: Vec<u32>,
    },
}

impl Error {
    /// Builds a [`Error::Response`] from a raw response.
    pub fn response(code: ResponseCode, params: Vec<u32>) -> Self {
        Error::Response { code, params }
    }

    /// The response code, when this error is a device response.
    pub fn response_code(&self) -> Option<ResponseCode> {
        match self {
            Error::Response { code, .. } => Some(*code),
            _ => None,
        }
    }
}

fn response_hint(code: ResponseCode) -> &'static str {
    match code {
        ResponseCode::INVALID_STORAGE_ID => {
            " (the device may be locked or in charge-only mode)"
        }
        _ => "",
    }
}

/// Result type for MTP operations.
pub type Result<T> = core::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_storage_hint() {
        let err = Error::response(ResponseCode::INVALID_STORAGE_ID, vec![]);
        let text = err.to_string();
        assert!(text.contains("0x2008"));
        assert!(text.contains("charge-only"));

        let err = Error::response(ResponseCode::ACCESS_DENIED, vec![1]);
        assert!(!err.to_string().contains("charge-only"));
    }
}
