// SPDX-License-Identifier: MIT OR Apache-2.0
/*
 * MTP identifier types.
 *
 * Copyright (c) 2025 Code Construct
 */

/// Handle of an object (file, folder, abstract entity) on the device.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct ObjectId(pub u32);

impl core::fmt::Display for ObjectId {
    fn fmt(&self, fmt: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(fmt, "{:#010x}", self.0)
    }
}

/// Identifier of a storage unit on the device.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct StorageId(pub u32);

impl core::fmt::Display for StorageId {
    fn fmt(&self, fmt: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(fmt, "{:#010x}", self.0)
    }
}

/// Identifier of a single Command → Data → Response transaction.
///
/// Strictly monotonic within a [`Session`](crate::Session).
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct TransactionId(pub u32);

impl core::fmt::Display for TransactionId {
    fn fmt(&self, fmt: &mut core::fmt::Formatter) -> core::fmt::Result {
        self.0.fmt(fmt)
    }
}

/// The device root when used as a parent ("Device" in parent replies).
pub const OBJECT_ROOT: ObjectId = ObjectId(0);
/// Special object value: all objects, or the top level of a storage when
/// passed as the parent selector.
pub const OBJECT_ALL: ObjectId = ObjectId(0xffff_ffff);

/// Special storage value: the device itself.
pub const STORAGE_DEVICE: StorageId = StorageId(0);
/// Special storage value: all storages.
pub const STORAGE_ALL: StorageId = StorageId(0xffff_ffff);
