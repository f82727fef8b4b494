// SPDX-License-Identifier: MIT OR Apache-2.0
/*
 * MTP operation, response and event codes.
 *
 * Copyright (c) 2025 Code Construct
 */

/// MTP/PTP operation code.
///
/// An open 16-bit set: standard PTP operations live at `0x10xx`, the MTP
/// object-property extensions at `0x98xx`, and vendor extensions elsewhere.
/// Defined values are associated constants; unknown codes are representable.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct OperationCode(pub u16);

#[allow(missing_docs)]
impl OperationCode {
    pub const GET_DEVICE_INFO: OperationCode = OperationCode(0x1001);
    pub const OPEN_SESSION: OperationCode = OperationCode(0x1002);
    pub const CLOSE_SESSION: OperationCode = OperationCode(0x1003);
    pub const GET_STORAGE_IDS: OperationCode = OperationCode(0x1004);
    pub const GET_STORAGE_INFO: OperationCode = OperationCode(0x1005);
    pub const GET_NUM_OBJECTS: OperationCode = OperationCode(0x1006);
    pub const GET_OBJECT_HANDLES: OperationCode = OperationCode(0x1007);
    pub const GET_OBJECT_INFO: OperationCode = OperationCode(0x1008);
    pub const GET_OBJECT: OperationCode = OperationCode(0x1009);
    pub const GET_THUMB: OperationCode = OperationCode(0x100a);
    pub const DELETE_OBJECT: OperationCode = OperationCode(0x100b);
    pub const SEND_OBJECT_INFO: OperationCode = OperationCode(0x100c);
    pub const SEND_OBJECT: OperationCode = OperationCode(0x100d);
    pub const SET_OBJECT_PROTECTION: OperationCode = OperationCode(0x1012);
    pub const GET_DEVICE_PROP_DESC: OperationCode = OperationCode(0x1014);
    pub const GET_DEVICE_PROP_VALUE: OperationCode = OperationCode(0x1015);
    pub const SET_DEVICE_PROP_VALUE: OperationCode = OperationCode(0x1016);
    pub const RESET_DEVICE_PROP_VALUE: OperationCode = OperationCode(0x1017);
    pub const GET_PARTIAL_OBJECT: OperationCode = OperationCode(0x101b);

    pub const GET_OBJECT_PROPS_SUPPORTED: OperationCode = OperationCode(0x9801);
    pub const GET_OBJECT_PROP_DESC: OperationCode = OperationCode(0x9802);
    pub const GET_OBJECT_PROP_VALUE: OperationCode = OperationCode(0x9803);
    pub const SET_OBJECT_PROP_VALUE: OperationCode = OperationCode(0x9804);
    pub const GET_OBJECT_PROP_LIST: OperationCode = OperationCode(0x9805);
    pub const SEND_OBJECT_PROP_LIST: OperationCode = OperationCode(0x9808);
    pub const GET_OBJECT_REFERENCES: OperationCode = OperationCode(0x9810);
    pub const SET_OBJECT_REFERENCES: OperationCode = OperationCode(0x9811);

    /// Zune track-context registration used by the metadata-artist flow.
    pub const ZUNE_REGISTER_TRACK_CONTEXT: OperationCode = OperationCode(0x922a);

    // The MTPZ handshake legs (0x1000..=0x1002) are defined by the `mtpz`
    // crate, which owns that vendor protocol.
}

impl core::fmt::Display for OperationCode {
    fn fmt(&self, fmt: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(fmt, "{:#06x}", self.0)
    }
}

/// MTP/PTP response code. `0x2001` is the only success value.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct ResponseCode(pub u16);

#[allow(missing_docs)]
impl ResponseCode {
    pub const OK: ResponseCode = ResponseCode(0x2001);
    pub const GENERAL_ERROR: ResponseCode = ResponseCode(0x2002);
    pub const SESSION_NOT_OPEN: ResponseCode = ResponseCode(0x2003);
    pub const INVALID_TRANSACTION_ID: ResponseCode = ResponseCode(0x2004);
    pub const OPERATION_NOT_SUPPORTED: ResponseCode = ResponseCode(0x2005);
    pub const PARAMETER_NOT_SUPPORTED: ResponseCode = ResponseCode(0x2006);
    pub const NO_VALID_OBJECT_INFO: ResponseCode = ResponseCode(0x2007);
    pub const INVALID_STORAGE_ID: ResponseCode = ResponseCode(0x2008);
    pub const INVALID_OBJECT_HANDLE: ResponseCode = ResponseCode(0x2009);
    pub const STORE_FULL: ResponseCode = ResponseCode(0x200c);
    pub const OBJECT_WRITE_PROTECTED: ResponseCode = ResponseCode(0x200d);
    pub const STORE_READ_ONLY: ResponseCode = ResponseCode(0x200e);
    pub const ACCESS_DENIED: ResponseCode = ResponseCode(0x200f);
    pub const DEVICE_BUSY: ResponseCode = ResponseCode(0x2019);
    pub const INVALID_PARENT_OBJECT: ResponseCode = ResponseCode(0x201a);
    pub const INVALID_PARAMETER: ResponseCode = ResponseCode(0x201d);
    pub const SESSION_ALREADY_OPEN: ResponseCode = ResponseCode(0x201e);
    pub const TRANSACTION_CANCELLED: ResponseCode = ResponseCode(0x201f);
    pub const INVALID_OBJECT_PROP_CODE: ResponseCode = ResponseCode(0xa801);
    pub const INVALID_OBJECT_PROP_FORMAT: ResponseCode = ResponseCode(0xa802);
    pub const SPECIFICATION_BY_GROUP_UNSUPPORTED: ResponseCode = ResponseCode(0xa807);
    pub const OBJECT_TOO_LARGE: ResponseCode = ResponseCode(0xa809);
}

impl ResponseCode {
    /// Returns `true` for the single success code.
    pub fn is_ok(&self) -> bool {
        *self == Self::OK
    }
}

impl core::fmt::Display for ResponseCode {
    fn fmt(&self, fmt: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(fmt, "{:#06x}", self.0)
    }
}

/// MTP/PTP event code, carried in interrupt transfers.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct EventCode(pub u16);

#[allow(missing_docs)]
impl EventCode {
    pub const CANCEL_TRANSACTION: EventCode = EventCode(0x4001);
    pub const OBJECT_ADDED: EventCode = EventCode(0x4002);
    pub const OBJECT_REMOVED: EventCode = EventCode(0x4003);
    pub const STORE_ADDED: EventCode = EventCode(0x4004);
    pub const STORE_REMOVED: EventCode = EventCode(0x4005);
    pub const DEVICE_PROP_CHANGED: EventCode = EventCode(0x4006);
    pub const OBJECT_INFO_CHANGED: EventCode = EventCode(0x4007);
    pub const DEVICE_INFO_CHANGED: EventCode = EventCode(0x4008);
    pub const STORAGE_INFO_CHANGED: EventCode = EventCode(0x400c);
    pub const OBJECT_PROP_CHANGED: EventCode = EventCode(0xc801);
}

impl core::fmt::Display for EventCode {
    fn fmt(&self, fmt: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(fmt, "{:#06x}", self.0)
    }
}
