// SPDX-License-Identifier: MIT OR Apache-2.0
/*
 * The USB backend surface consumed by the pipe.
 *
 * Copyright (c) 2025 Code Construct
 */

use std::time::Duration;

use crate::error::TransportError;

/// Blocking USB transfer primitives supplied by the backend.
///
/// Enumeration, descriptor walking and interface claiming happen outside
/// this crate; implementations hand over an already-claimed MTP interface
/// (USB class `06`, or the interface named by the OS descriptor) and the
/// endpoint addresses in [`EndpointConfig`].
///
/// `read_bulk` blocks until the buffer is full, a short packet arrives, or
/// the timeout elapses — the semantics of a single USB bulk transfer
/// request. A halted endpoint surfaces as [`TransportError::Stall`]; the
/// pipe clears it and retries once.
pub trait UsbTransport {
    /// Writes `data` to a bulk OUT endpoint, returning the bytes written.
    ///
    /// An empty `data` sends a zero-length packet.
    fn write_bulk(
        &mut self,
        endpoint: u8,
        data: &[u8],
        timeout: Duration,
    ) -> Result<usize, TransportError>;

    /// Reads from a bulk IN endpoint into `buf`, returning the bytes read.
    fn read_bulk(
        &mut self,
        endpoint: u8,
        buf: &mut [u8],
        timeout: Duration,
    ) -> Result<usize, TransportError>;

    /// Reads from an interrupt IN endpoint into `buf`.
    fn read_interrupt(
        &mut self,
        endpoint: u8,
        buf: &mut [u8],
        timeout: Duration,
    ) -> Result<usize, TransportError>;

    /// Performs a control transfer on endpoint zero.
    ///
    /// `data` is written for host-to-device requests and filled for
    /// device-to-host requests, per the direction bit of `request_type`.
    fn control_transfer(
        &mut self,
        request_type: u8,
        request: u8,
        value: u16,
        index: u16,
        data: &mut [u8],
        timeout: Duration,
    ) -> Result<usize, TransportError>;

    /// Clears a halt condition on the given endpoint.
    fn clear_halt(&mut self, endpoint: u8) -> Result<(), TransportError>;
}

/// Endpoint addresses and packet geometry of the claimed MTP interface.
#[derive(Clone, Copy, Debug)]
pub struct EndpointConfig {
    /// Bulk IN endpoint address.
    pub bulk_in: u8,
    /// Bulk OUT endpoint address.
    pub bulk_out: u8,
    /// Interrupt IN endpoint address.
    pub interrupt_in: u8,
    /// Max packet size of the bulk endpoints.
    pub max_packet_size: usize,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            bulk_in: 0x81,
            bulk_out: 0x01,
            interrupt_in: 0x82,
            max_packet_size: 512,
        }
    }
}
