// SPDX-License-Identifier: MIT OR Apache-2.0
/*
 * PTP container framing: the 12-byte header shared by all four block kinds.
 *
 * Copyright (c) 2025 Code Construct
 */

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::ProtocolError;
use crate::types::TransactionId;

/// Length of the container header.
pub const CONTAINER_HEADER_LEN: usize = 12;

/// PTP container kind.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(u16)]
pub enum ContainerType {
    /// Operation request with up to five parameters.
    Command = 1,
    /// Opaque payload, in either direction.
    Data = 2,
    /// Completion status with up to five parameters.
    Response = 3,
    /// Asynchronous notification on the interrupt pipe.
    Event = 4,
}

impl ContainerType {
    fn from_raw(raw: u16) -> Result<Self, ProtocolError> {
        match raw {
            1 => Ok(ContainerType::Command),
            2 => Ok(ContainerType::Data),
            3 => Ok(ContainerType::Response),
            4 => Ok(ContainerType::Event),
            _ => Err(ProtocolError::Malformed("container type out of range")),
        }
    }
}

/// The 12-byte header framing every container.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ContainerHeader {
    /// Total container length including this header.
    pub len: u32,
    /// Container kind.
    pub kind: ContainerType,
    /// Operation, response or event code.
    pub code: u16,
    /// Transaction the container belongs to.
    pub transaction: TransactionId,
}

impl ContainerHeader {
    /// Builds a header for a container with `payload_len` body bytes.
    pub fn new(kind: ContainerType, code: u16, transaction: TransactionId, payload_len: usize) -> Self {
        Self {
            len: (CONTAINER_HEADER_LEN + payload_len) as u32,
            kind,
            code,
            transaction,
        }
    }

    /// Body length declared by the header.
    pub fn payload_len(&self) -> usize {
        self.len as usize - CONTAINER_HEADER_LEN
    }

    /// Appends the wire form to `out`.
    pub fn encode(&self, out: &mut BytesMut) {
        out.put_u32_le(self.len);
        out.put_u16_le(self.kind as u16);
        out.put_u16_le(self.code);
        out.put_u32_le(self.transaction.0);
    }

    /// Parses a header from the first 12 bytes of `buf`.
    pub fn parse(buf: &[u8]) -> Result<Self, ProtocolError> {
        if buf.len() < CONTAINER_HEADER_LEN {
            return Err(ProtocolError::Malformed("container shorter than header"));
        }
        let len = u32::from_le_bytes(buf[0..4].try_into().unwrap());
        if (len as usize) < CONTAINER_HEADER_LEN {
            return Err(ProtocolError::Malformed("container length below header size"));
        }
        let kind = ContainerType::from_raw(u16::from_le_bytes(buf[4..6].try_into().unwrap()))?;
        let code = u16::from_le_bytes(buf[6..8].try_into().unwrap());
        let transaction = TransactionId(u32::from_le_bytes(buf[8..12].try_into().unwrap()));
        Ok(Self {
            len,
            kind,
            code,
            transaction,
        })
    }
}

/// A fully received container.
#[derive(Clone, Debug)]
pub struct Container {
    /// The parsed header.
    pub header: ContainerHeader,
    /// The body, `header.len - 12` bytes.
    pub payload: Bytes,
}

impl Container {
    /// Splits the payload into 32-bit parameters (Command/Response bodies).
    pub fn params(&self) -> Vec<u32> {
        self.payload
            .chunks_exact(4)
            .map(|c| u32::from_le_bytes(c.try_into().unwrap()))
            .collect()
    }
}
