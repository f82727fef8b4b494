// SPDX-License-Identifier: MIT OR Apache-2.0
/*
 * Bulk pipe framer: segments and reassembles PTP containers over the
 * IN/OUT endpoint pair, polls events on the interrupt endpoint.
 *
 * Copyright (c) 2025 Code Construct
 */

use std::io::{Read, Write};
use std::time::Duration;

use bytes::{BufMut, BytesMut};
use log::{debug, trace, warn};

use crate::code::{EventCode, OperationCode, ResponseCode};
use crate::container::{Container, ContainerHeader, ContainerType, CONTAINER_HEADER_LEN};
use crate::error::{ProtocolError, Result, TransportError};
use crate::transport::{EndpointConfig, UsbTransport};
use crate::types::TransactionId;

/// Bulk transfer granularity for data phases.
const CHUNK_SIZE: usize = 64 * 1024;

/// Class-specific Cancel Request.
const REQUEST_CANCEL: u8 = 0x64;
/// Class-specific Get Device Status.
const REQUEST_DEVICE_STATUS: u8 = 0x67;
/// Cancellation code carried in the Cancel Request payload.
const CANCEL_CODE: u16 = 0x4001;
/// Host-to-device, class, interface.
const REQUEST_TYPE_OUT: u8 = 0x21;
/// Device-to-host, class, interface.
const REQUEST_TYPE_IN: u8 = 0xa1;

const STATUS_POLL_INTERVAL: Duration = Duration::from_millis(10);
const STATUS_POLL_LIMIT: usize = 100;

/// An asynchronous device notification from the interrupt pipe.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Event {
    /// Event code.
    pub code: EventCode,
    /// Transaction the event relates to, zero when unrelated.
    pub transaction: TransactionId,
    /// Up to three event parameters.
    pub params: Vec<u32>,
}

/// Container framer over one claimed MTP interface.
///
/// Owns the endpoint pair exclusively. One container moves at a time; the
/// [`Session`](crate::Session) above sequences the phases.
#[derive(Debug)]
pub struct Pipe<T: UsbTransport> {
    transport: T,
    config: EndpointConfig,
}

impl<T: UsbTransport> Pipe<T> {
    /// Wraps a claimed interface.
    pub fn new(transport: T, config: EndpointConfig) -> Self {
        Self { transport, config }
    }

    /// The endpoint configuration in use.
    pub fn config(&self) -> &EndpointConfig {
        &self.config
    }

    /// Writes a Command container in a single bulk transfer.
    pub fn send_command(
        &mut self,
        code: OperationCode,
        params: &[u32],
        transaction: TransactionId,
        timeout: Duration,
    ) -> Result<()> {
        debug_assert!(params.len() <= 5);
        let mut out = BytesMut::with_capacity(CONTAINER_HEADER_LEN + params.len() * 4);
        ContainerHeader::new(ContainerType::Command, code.0, transaction, params.len() * 4)
            .encode(&mut out);
        for p in params {
            out.put_u32_le(*p);
        }
        trace!("command {code} tid {transaction} params {params:08x?}");
        self.write_all(&out, timeout)?;
        Ok(())
    }

    /// Writes a Data container, chunking the payload over multiple bulk
    /// transfers and terminating with a zero-length packet when the
    /// container length is a multiple of the endpoint max packet size.
    pub fn send_data(
        &mut self,
        code: OperationCode,
        transaction: TransactionId,
        payload: &[u8],
        timeout: Duration,
    ) -> Result<()> {
        let total = CONTAINER_HEADER_LEN + payload.len();
        trace!("data out {code} tid {transaction}, {} bytes", payload.len());

        let first_body = payload.len().min(CHUNK_SIZE - CONTAINER_HEADER_LEN);
        let mut first = BytesMut::with_capacity(CONTAINER_HEADER_LEN + first_body);
        ContainerHeader::new(ContainerType::Data, code.0, transaction, payload.len())
            .encode(&mut first);
        first.put_slice(&payload[..first_body]);
        self.write_all(&first, timeout)?;

        let mut sent = first_body;
        while sent < payload.len() {
            let n = (payload.len() - sent).min(CHUNK_SIZE);
            self.write_all(&payload[sent..sent + n], timeout)?;
            sent += n;
        }

        self.terminate_if_aligned(total, timeout)
    }

    /// Streaming variant of [`send_data`](Self::send_data): the payload is
    /// pulled from `source`, which must yield exactly `size` bytes.
    pub fn send_data_from(
        &mut self,
        code: OperationCode,
        transaction: TransactionId,
        source: &mut dyn Read,
        size: u64,
        timeout: Duration,
    ) -> Result<()> {
        let total = CONTAINER_HEADER_LEN as u64 + size;
        trace!("data out {code} tid {transaction}, {size} bytes streamed");

        let mut buf = vec![0u8; CHUNK_SIZE];
        let mut head = BytesMut::with_capacity(CONTAINER_HEADER_LEN);
        // Objects past 4 GiB use the 0xFFFFFFFF length convention.
        ContainerHeader {
            len: total.try_into().unwrap_or(u32::MAX),
            kind: ContainerType::Data,
            code: code.0,
            transaction,
        }
        .encode(&mut head);
        buf[..CONTAINER_HEADER_LEN].copy_from_slice(&head);

        let mut remaining = size;
        let mut fill = CONTAINER_HEADER_LEN;
        loop {
            while fill < buf.len() && remaining > 0 {
                let want = buf.len().min(fill + remaining as usize);
                let n = source
                    .read(&mut buf[fill..want])
                    .map_err(TransportError::Io)?;
                if n == 0 {
                    return Err(TransportError::Io(std::io::Error::new(
                        std::io::ErrorKind::UnexpectedEof,
                        "object source ended early",
                    ))
                    .into());
                }
                fill += n;
                remaining -= n as u64;
            }
            self.write_all(&buf[..fill], timeout)?;
            if remaining == 0 {
                break;
            }
            fill = 0;
        }

        self.terminate_if_aligned_u64(total, timeout)
    }

    /// Reads exactly one container, reassembling a multi-packet body.
    pub fn recv(&mut self, timeout: Duration) -> Result<Container> {
        let mut buf = vec![0u8; CHUNK_SIZE];
        let n = self.read_bulk_cleared(&mut buf, timeout)?;
        if n < CONTAINER_HEADER_LEN {
            return Err(ProtocolError::Malformed("container shorter than header").into());
        }
        let header = ContainerHeader::parse(&buf[..n])?;
        let need = header.payload_len();
        if n - CONTAINER_HEADER_LEN > need {
            return Err(ProtocolError::Malformed("container overruns declared length").into());
        }
        // A short first transfer means the device ended the container there.
        if n < buf.len() && n - CONTAINER_HEADER_LEN < need {
            return Err(ProtocolError::Malformed("payload shorter than declared").into());
        }

        let mut payload = BytesMut::with_capacity(need.min(CHUNK_SIZE));
        payload.extend_from_slice(&buf[CONTAINER_HEADER_LEN..n]);
        while payload.len() < need {
            let n = self.read_more(&mut buf, need - payload.len(), timeout)?;
            payload.extend_from_slice(&buf[..n]);
        }
        trace!(
            "recv {:?} code {:#06x} tid {} ({} bytes)",
            header.kind,
            header.code,
            header.transaction,
            need
        );
        Ok(Container {
            header,
            payload: payload.freeze(),
        })
    }

    /// Reads one container, streaming a Data body into `sink`.
    ///
    /// For a Data container the returned [`Container`] has an empty
    /// `payload`; anything else (typically an early Response) is returned
    /// whole, with nothing written to the sink.
    pub fn recv_to_sink(&mut self, sink: &mut dyn Write, timeout: Duration) -> Result<Container> {
        let mut buf = vec![0u8; CHUNK_SIZE];
        let n = self.read_bulk_cleared(&mut buf, timeout)?;
        if n < CONTAINER_HEADER_LEN {
            return Err(ProtocolError::Malformed("container shorter than header").into());
        }
        let header = ContainerHeader::parse(&buf[..n])?;
        let need = header.payload_len();
        if n - CONTAINER_HEADER_LEN > need {
            return Err(ProtocolError::Malformed("container overruns declared length").into());
        }
        if n < buf.len() && n - CONTAINER_HEADER_LEN < need {
            return Err(ProtocolError::Malformed("payload shorter than declared").into());
        }

        if header.kind != ContainerType::Data {
            let mut payload = BytesMut::with_capacity(need);
            payload.extend_from_slice(&buf[CONTAINER_HEADER_LEN..n]);
            while payload.len() < need {
                let n = self.read_more(&mut buf, need - payload.len(), timeout)?;
                payload.extend_from_slice(&buf[..n]);
            }
            return Ok(Container {
                header,
                payload: payload.freeze(),
            });
        }

        sink.write_all(&buf[CONTAINER_HEADER_LEN..n])
            .map_err(TransportError::Io)?;
        let mut have = n - CONTAINER_HEADER_LEN;
        while have < need {
            let n = self.read_more(&mut buf, need - have, timeout)?;
            sink.write_all(&buf[..n]).map_err(TransportError::Io)?;
            have += n;
        }
        trace!("recv data tid {} streamed {need} bytes", header.transaction);
        Ok(Container {
            header,
            payload: bytes::Bytes::new(),
        })
    }

    /// Polls the interrupt endpoint for one event.
    ///
    /// Returns `None` when the timeout elapses without a notification.
    pub fn poll_event(&mut self, timeout: Duration) -> Result<Option<Event>> {
        let mut buf = [0u8; CONTAINER_HEADER_LEN + 3 * 4];
        let n = match self
            .transport
            .read_interrupt(self.config.interrupt_in, &mut buf, timeout)
        {
            Ok(n) => n,
            Err(TransportError::Timeout) => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        if n == 0 {
            return Ok(None);
        }
        let header = ContainerHeader::parse(&buf[..n])?;
        if header.kind != ContainerType::Event {
            return Err(ProtocolError::UnexpectedContainer {
                expected: ContainerType::Event,
                actual: header.kind,
            }
            .into());
        }
        let params = buf[CONTAINER_HEADER_LEN..n.min(header.len as usize)]
            .chunks_exact(4)
            .map(|c| u32::from_le_bytes(c.try_into().unwrap()))
            .collect();
        Ok(Some(Event {
            code: EventCode(header.code),
            transaction: header.transaction,
            params,
        }))
    }

    /// Cancels the outstanding transaction: class Cancel Request with the
    /// transaction id, a Get Device Status poll until the device leaves
    /// Device_Busy, then a halt clear on both bulk pipes.
    pub fn cancel(&mut self, transaction: TransactionId, timeout: Duration) -> Result<()> {
        debug!("cancelling transaction {transaction}");
        let mut payload = [0u8; 6];
        payload[..2].copy_from_slice(&CANCEL_CODE.to_le_bytes());
        payload[2..].copy_from_slice(&transaction.0.to_le_bytes());
        self.transport.control_transfer(
            REQUEST_TYPE_OUT,
            REQUEST_CANCEL,
            0,
            0,
            &mut payload,
            timeout,
        )?;

        let mut settled = false;
        for _ in 0..STATUS_POLL_LIMIT {
            let mut status = [0u8; 32];
            let n = self.transport.control_transfer(
                REQUEST_TYPE_IN,
                REQUEST_DEVICE_STATUS,
                0,
                0,
                &mut status,
                timeout,
            )?;
            if n >= 4 {
                let code = ResponseCode(u16::from_le_bytes([status[2], status[3]]));
                if code != ResponseCode::DEVICE_BUSY {
                    settled = true;
                    break;
                }
            }
            std::thread::sleep(STATUS_POLL_INTERVAL);
        }
        if !settled {
            warn!("device still busy after cancel");
        }

        self.transport.clear_halt(self.config.bulk_in)?;
        self.transport.clear_halt(self.config.bulk_out)?;
        Ok(())
    }

    /// Single bulk read with stall recovery: clear the halt and retry
    /// exactly once.
    fn read_bulk_cleared(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize> {
        match self.transport.read_bulk(self.config.bulk_in, buf, timeout) {
            Err(TransportError::Stall) => {
                debug!("bulk-in stalled, clearing halt");
                self.transport.clear_halt(self.config.bulk_in)?;
                Ok(self.transport.read_bulk(self.config.bulk_in, buf, timeout)?)
            }
            other => Ok(other?),
        }
    }

    /// Continuation read for a partially received body. Requests whole
    /// packets; a zero-length or short result before `remaining` is
    /// satisfied means the device ended the transfer early.
    fn read_more(&mut self, buf: &mut [u8], remaining: usize, timeout: Duration) -> Result<usize> {
        let mp = self.config.max_packet_size.max(1);
        let want = remaining
            .div_ceil(mp)
            .saturating_mul(mp)
            .min(buf.len());
        let n = self.read_bulk_cleared(&mut buf[..want], timeout)?;
        if n == 0 || (n < want && n < remaining) {
            return Err(ProtocolError::Malformed("payload shorter than declared").into());
        }
        if n > remaining {
            return Err(ProtocolError::Malformed("container overruns declared length").into());
        }
        Ok(n)
    }

    fn write_all(&mut self, data: &[u8], timeout: Duration) -> Result<()> {
        let n = self
            .transport
            .write_bulk(self.config.bulk_out, data, timeout)?;
        if n != data.len() {
            return Err(TransportError::Io(std::io::Error::new(
                std::io::ErrorKind::WriteZero,
                "short bulk write",
            ))
            .into());
        }
        Ok(())
    }

    fn terminate_if_aligned(&mut self, total: usize, timeout: Duration) -> Result<()> {
        if total % self.config.max_packet_size == 0 {
            trace!("sending zero-length terminator");
            self.transport
                .write_bulk(self.config.bulk_out, &[], timeout)?;
        }
        Ok(())
    }

    fn terminate_if_aligned_u64(&mut self, total: u64, timeout: Duration) -> Result<()> {
        if total % self.config.max_packet_size as u64 == 0 {
            trace!("sending zero-length terminator");
            self.transport
                .write_bulk(self.config.bulk_out, &[], timeout)?;
        }
        Ok(())
    }
}
