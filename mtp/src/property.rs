// SPDX-License-Identifier: MIT OR Apache-2.0
/*
 * MTP object and device property codes.
 *
 * Copyright (c) 2025 Code Construct
 */

/// MTP object property code.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct ObjectProperty(pub u16);

#[allow(missing_docs)]
impl ObjectProperty {
    pub const STORAGE_ID: ObjectProperty = ObjectProperty(0xdc01);
    pub const OBJECT_FORMAT: ObjectProperty = ObjectProperty(0xdc02);
    pub const PROTECTION_STATUS: ObjectProperty = ObjectProperty(0xdc03);
    pub const OBJECT_SIZE: ObjectProperty = ObjectProperty(0xdc04);
    pub const OBJECT_FILENAME: ObjectProperty = ObjectProperty(0xdc07);
    pub const DATE_CREATED: ObjectProperty = ObjectProperty(0xdc08);
    pub const DATE_MODIFIED: ObjectProperty = ObjectProperty(0xdc09);
    pub const PARENT_OBJECT: ObjectProperty = ObjectProperty(0xdc0b);
    pub const PERSISTENT_UNIQUE_OBJECT_ID: ObjectProperty = ObjectProperty(0xdc41);
    pub const NAME: ObjectProperty = ObjectProperty(0xdc44);
    pub const ARTIST: ObjectProperty = ObjectProperty(0xdc46);
    pub const DATE_AUTHORED: ObjectProperty = ObjectProperty(0xdc47);
    pub const GENRE: ObjectProperty = ObjectProperty(0xdc48);
    pub const REPRESENTATIVE_SAMPLE_FORMAT: ObjectProperty = ObjectProperty(0xdc81);
    pub const REPRESENTATIVE_SAMPLE_DATA: ObjectProperty = ObjectProperty(0xdc86);
    pub const TRACK: ObjectProperty = ObjectProperty(0xdc8b);
    pub const ARTIST_ID: ObjectProperty = ObjectProperty(0xdc98);
    /// Zune collection identifier (vendor).
    pub const ZUNE_COLLECTION_ID: ObjectProperty = ObjectProperty(0xdab0);
    /// Zune artist GUID, a `Uint128` (vendor).
    pub const ZUNE_ARTIST_GUID: ObjectProperty = ObjectProperty(0xda97);
    /// Matches every property when used as a filter.
    pub const ALL: ObjectProperty = ObjectProperty(0xffff);
}

impl core::fmt::Display for ObjectProperty {
    fn fmt(&self, fmt: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(fmt, "{:#06x}", self.0)
    }
}

/// MTP device property code.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct DeviceProperty(pub u16);

#[allow(missing_docs)]
impl DeviceProperty {
    pub const BATTERY_LEVEL: DeviceProperty = DeviceProperty(0x5001);
    pub const SYNCHRONIZATION_PARTNER: DeviceProperty = DeviceProperty(0xd401);
    pub const DEVICE_FRIENDLY_NAME: DeviceProperty = DeviceProperty(0xd402);
    pub const SESSION_INITIATOR_VERSION_INFO: DeviceProperty = DeviceProperty(0xd406);
    pub const PERCEIVED_DEVICE_TYPE: DeviceProperty = DeviceProperty(0xd407);
    /// Zune PC GUID (vendor); writable only on a secure session.
    pub const ZUNE_PC_GUID: DeviceProperty = DeviceProperty(0xd220);
}

impl core::fmt::Display for DeviceProperty {
    fn fmt(&self, fmt: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(fmt, "{:#06x}", self.0)
    }
}
