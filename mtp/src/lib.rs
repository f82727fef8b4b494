// SPDX-License-Identifier: MIT OR Apache-2.0
/*
 * MTP initiator: common types, wire codec, container framing and the
 * session/transaction engine.
 *
 * Copyright (c) 2025 Code Construct
 */

#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! # Media Transfer Protocol (MTP)
//!
//! This crate implements the initiator ("host") side of PTP/MTP over a USB
//! bulk endpoint pair: little-endian wire codec, 12-byte container framing,
//! and a [`Session`] that sequences Command → Data → Response transactions
//! and exposes typed operation wrappers.
//!
//! USB enumeration and raw transfers are supplied by the caller through the
//! [`UsbTransport`] trait; this crate never opens devices itself.
//!
//! A [`Session`] assumes a single outstanding transaction, which the `&mut`
//! receivers enforce. Callers sharing a session across threads must
//! serialize behind their own mutual exclusion.

pub mod codec;
mod code;
mod container;
mod datatype;
mod error;
mod format;
pub mod message;
mod pipe;
pub mod proplist;
mod property;
mod session;
mod transport;
mod types;

pub use code::{EventCode, OperationCode, ResponseCode};
pub use container::{Container, ContainerHeader, ContainerType, CONTAINER_HEADER_LEN};
pub use datatype::{DataType, Value};
pub use error::{CodecError, Error, ProtocolError, Result, TransportError};
pub use format::{AssociationType, ObjectFormat};
pub use pipe::{Event, Pipe};
pub use property::{DeviceProperty, ObjectProperty};
pub use session::{Session, DEFAULT_SESSION_ID};
pub use transport::{EndpointConfig, UsbTransport};
pub use types::{
    ObjectId, StorageId, TransactionId, OBJECT_ALL, OBJECT_ROOT, STORAGE_ALL, STORAGE_DEVICE,
};
