// SPDX-License-Identifier: MIT OR Apache-2.0
/*
 * Typed payloads of the standard MTP operations.
 *
 * Copyright (c) 2025 Code Construct
 */

//! Decoded forms of the Data-phase payloads: device, storage and object
//! descriptions, plus the object-property descriptor.

use crate::codec::{Reader, Writer};
use crate::code::{EventCode, OperationCode};
use crate::datatype::{DataType, Value};
use crate::error::CodecError;
use crate::format::{AssociationType, ObjectFormat};
use crate::property::{DeviceProperty, ObjectProperty};
use crate::types::{ObjectId, StorageId};

/// The GetDeviceInfo payload.
#[derive(Clone, Debug, Default)]
pub struct DeviceInfo {
    /// PTP standard version, in hundredths.
    pub standard_version: u16,
    /// Vendor extension identifier (6 for the Microsoft extension set).
    pub vendor_extension_id: u32,
    /// Vendor extension version, in hundredths.
    pub vendor_extension_version: u16,
    /// Vendor extension description.
    pub vendor_extension_desc: String,
    /// Functional mode.
    pub functional_mode: u16,
    /// Operation codes the device implements.
    pub operations_supported: Vec<u16>,
    /// Event codes the device can raise.
    pub events_supported: Vec<u16>,
    /// Device property codes the device implements.
    pub device_properties_supported: Vec<u16>,
    /// Formats the device can capture.
    pub capture_formats: Vec<u16>,
    /// Object formats the device can store.
    pub image_formats: Vec<u16>,
    /// Manufacturer name.
    pub manufacturer: String,
    /// Model name.
    pub model: String,
    /// Device firmware/software version.
    pub device_version: String,
    /// Serial number.
    pub serial_number: String,
}

impl DeviceInfo {
    /// Decodes the payload.
    pub fn decode(r: &mut Reader) -> Result<Self, CodecError> {
        Ok(Self {
            standard_version: r.read_u16()?,
            vendor_extension_id: r.read_u32()?,
            vendor_extension_version: r.read_u16()?,
            vendor_extension_desc: r.read_string()?,
            functional_mode: r.read_u16()?,
            operations_supported: r.read_array_u16()?,
            events_supported: r.read_array_u16()?,
            device_properties_supported: r.read_array_u16()?,
            capture_formats: r.read_array_u16()?,
            image_formats: r.read_array_u16()?,
            manufacturer: r.read_string()?,
            model: r.read_string()?,
            device_version: r.read_string()?,
            serial_number: r.read_string()?,
        })
    }

    /// Whether the device advertises an operation.
    pub fn supports_operation(&self, code: OperationCode) -> bool {
        self.operations_supported.contains(&code.0)
    }

    /// Whether the device advertises an object format.
    pub fn supports_format(&self, format: ObjectFormat) -> bool {
        self.image_formats.contains(&format.0) || self.capture_formats.contains(&format.0)
    }

    /// Whether the device advertises an event.
    pub fn supports_event(&self, code: EventCode) -> bool {
        self.events_supported.contains(&code.0)
    }

    /// Whether the device advertises a device property.
    pub fn supports_device_property(&self, prop: DeviceProperty) -> bool {
        self.device_properties_supported.contains(&prop.0)
    }
}

/// The GetStorageIDs payload.
#[derive(Clone, Debug, Default)]
pub struct StorageIds {
    /// Storage identifiers, in device order.
    pub ids: Vec<StorageId>,
}

impl StorageIds {
    /// Decodes the payload.
    pub fn decode(r: &mut Reader) -> Result<Self, CodecError> {
        let ids = r.read_array_u32()?.into_iter().map(StorageId).collect();
        Ok(Self { ids })
    }
}

/// The GetStorageInfo payload.
#[derive(Clone, Debug, Default)]
pub struct StorageInfo {
    /// Storage type (fixed/removable RAM or ROM).
    pub storage_type: u16,
    /// Filesystem type.
    pub filesystem_type: u16,
    /// Access capability.
    pub access_capability: u16,
    /// Capacity in bytes.
    pub max_capacity: u64,
    /// Free space in bytes.
    pub free_space_bytes: u64,
    /// Free space in objects.
    pub free_space_objects: u32,
    /// Storage description.
    pub description: String,
    /// Volume label.
    pub volume_label: String,
}

impl StorageInfo {
    /// Decodes the payload.
    pub fn decode(r: &mut Reader) -> Result<Self, CodecError> {
        Ok(Self {
            storage_type: r.read_u16()?,
            filesystem_type: r.read_u16()?,
            access_capability: r.read_u16()?,
            max_capacity: r.read_u64()?,
            free_space_bytes: r.read_u64()?,
            free_space_objects: r.read_u32()?,
            description: r.read_string()?,
            volume_label: r.read_string()?,
        })
    }
}

/// The GetObjectHandles payload.
#[derive(Clone, Debug, Default)]
pub struct ObjectHandles {
    /// Object handles, in device order.
    pub handles: Vec<ObjectId>,
}

impl ObjectHandles {
    /// Decodes the payload.
    pub fn decode(r: &mut Reader) -> Result<Self, CodecError> {
        let handles = r.read_array_u32()?.into_iter().map(ObjectId).collect();
        Ok(Self { handles })
    }
}

/// The GetObjectInfo / SendObjectInfo payload.
#[derive(Clone, Debug, Default)]
pub struct ObjectInfo {
    /// Storage holding the object.
    pub storage: StorageId,
    /// Object format.
    pub format: ObjectFormat,
    /// Protection status.
    pub protection_status: u16,
    /// Compressed (actual) size; `0xFFFFFFFF` for objects past 4 GiB.
    pub compressed_size: u32,
    /// Thumbnail format.
    pub thumb_format: ObjectFormat,
    /// Thumbnail size in bytes.
    pub thumb_compressed_size: u32,
    /// Thumbnail width.
    pub thumb_width: u32,
    /// Thumbnail height.
    pub thumb_height: u32,
    /// Image width.
    pub image_width: u32,
    /// Image height.
    pub image_height: u32,
    /// Image colour depth.
    pub image_bit_depth: u32,
    /// Parent object; root when zero.
    pub parent: ObjectId,
    /// Association subtype for folders.
    pub association_type: AssociationType,
    /// Association description.
    pub association_desc: u32,
    /// Sequence number.
    pub sequence_number: u32,
    /// File name.
    pub filename: String,
    /// Capture date string.
    pub capture_date: String,
    /// Modification date string.
    pub modification_date: String,
    /// Keywords.
    pub keywords: String,
}

impl ObjectInfo {
    /// Decodes the payload.
    pub fn decode(r: &mut Reader) -> Result<Self, CodecError> {
        Ok(Self {
            storage: StorageId(r.read_u32()?),
            format: ObjectFormat(r.read_u16()?),
            protection_status: r.read_u16()?,
            compressed_size: r.read_u32()?,
            thumb_format: ObjectFormat(r.read_u16()?),
            thumb_compressed_size: r.read_u32()?,
            thumb_width: r.read_u32()?,
            thumb_height: r.read_u32()?,
            image_width: r.read_u32()?,
            image_height: r.read_u32()?,
            image_bit_depth: r.read_u32()?,
            parent: ObjectId(r.read_u32()?),
            association_type: AssociationType(r.read_u16()?),
            association_desc: r.read_u32()?,
            sequence_number: r.read_u32()?,
            filename: r.read_string()?,
            capture_date: r.read_string()?,
            modification_date: r.read_string()?,
            keywords: r.read_string()?,
        })
    }

    /// Encodes the payload for SendObjectInfo.
    pub fn encode(&self, w: &mut Writer) -> Result<(), CodecError> {
        w.write_u32(self.storage.0);
        w.write_u16(self.format.0);
        w.write_u16(self.protection_status);
        w.write_u32(self.compressed_size);
        w.write_u16(self.thumb_format.0);
        w.write_u32(self.thumb_compressed_size);
        w.write_u32(self.thumb_width);
        w.write_u32(self.thumb_height);
        w.write_u32(self.image_width);
        w.write_u32(self.image_height);
        w.write_u32(self.image_bit_depth);
        w.write_u32(self.parent.0);
        w.write_u16(self.association_type.0);
        w.write_u32(self.association_desc);
        w.write_u32(self.sequence_number);
        w.write_string(&self.filename)?;
        w.write_string(&self.capture_date)?;
        w.write_string(&self.modification_date)?;
        w.write_string(&self.keywords)?;
        Ok(())
    }
}

/// Reply parameters of SendObjectInfo and SendObjectPropList.
#[derive(Clone, Copy, Debug)]
pub struct NewObjectInfo {
    /// Storage the device placed the object in.
    pub storage: StorageId,
    /// Parent the device placed the object under.
    pub parent: ObjectId,
    /// Handle assigned to the new object.
    pub object: ObjectId,
}

/// Form constraint of an object property.
#[derive(Clone, Debug)]
pub enum PropertyForm {
    /// No constraint.
    None,
    /// Inclusive range with step.
    Range {
        /// Minimum value.
        min: Value,
        /// Maximum value.
        max: Value,
        /// Step between values.
        step: Value,
    },
    /// Enumerated set of allowed values.
    Enum(Vec<Value>),
}

/// The GetObjectPropDesc payload.
#[derive(Clone, Debug)]
pub struct PropertyDesc {
    /// Property code being described.
    pub property: ObjectProperty,
    /// Data type of the property value.
    pub data_type: DataType,
    /// Whether the property is writable.
    pub writable: bool,
    /// Factory default value.
    pub default: Value,
    /// Property group.
    pub group_code: u32,
    /// Value constraint.
    pub form: PropertyForm,
}

impl PropertyDesc {
    /// Decodes the payload.
    pub fn decode(r: &mut Reader) -> Result<Self, CodecError> {
        let property = ObjectProperty(r.read_u16()?);
        let data_type = DataType::from_code(r.read_u16()?)?;
        let writable = r.read_u8()? != 0;
        let default = Value::decode(r, data_type)?;
        let group_code = r.read_u32()?;
        let form = match r.read_u8()? {
            0 => PropertyForm::None,
            1 => PropertyForm::Range {
                min: Value::decode(r, data_type)?,
                max: Value::decode(r, data_type)?,
                step: Value::decode(r, data_type)?,
            },
            2 => {
                let count = r.read_u16()? as usize;
                let mut values = Vec::with_capacity(count.min(4096));
                for _ in 0..count {
                    values.push(Value::decode(r, data_type)?);
                }
                PropertyForm::Enum(values)
            }
            flag => return Err(CodecError::UnsupportedForm(flag)),
        };
        Ok(Self {
            property,
            data_type,
            writable,
            default,
            group_code,
            form,
        })
    }
}

/// The GetObjectPropsSupported payload.
#[derive(Clone, Debug, Default)]
pub struct ObjectPropertiesSupported {
    /// Property codes supported for the queried format.
    pub properties: Vec<u16>,
}

impl ObjectPropertiesSupported {
    /// Decodes the payload.
    pub fn decode(r: &mut Reader) -> Result<Self, CodecError> {
        Ok(Self {
            properties: r.read_array_u16()?,
        })
    }

    /// Whether a property is in the supported set.
    pub fn supports(&self, prop: ObjectProperty) -> bool {
        self.properties.contains(&prop.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device_info_payload() -> Vec<u8> {
        let mut w = Writer::new();
        w.write_u16(100);
        w.write_u32(6);
        w.write_u16(100);
        w.write_string("microsoft.com: 1.0;").unwrap();
        w.write_u16(0);
        w.write_array_u16(&[0x1001, 0x1002, 0x9805, 0x9808, 0x9811]);
        w.write_array_u16(&[0x4002]);
        w.write_array_u16(&[0x5001, 0xd401]);
        w.write_array_u16(&[]);
        w.write_array_u16(&[0x3001, 0x3009, 0xba03]);
        w.write_string("Microsoft").unwrap();
        w.write_string("Zune").unwrap();
        w.write_string("2.0").unwrap();
        w.write_string("0123456789abcdef").unwrap();
        w.into_vec()
    }

    #[test]
    fn device_info_decode() {
        let payload = device_info_payload();
        let info = DeviceInfo::decode(&mut Reader::new(&payload)).unwrap();
        assert_eq!(info.manufacturer, "Microsoft");
        assert_eq!(info.model, "Zune");
        assert!(info.supports_operation(OperationCode::GET_OBJECT_PROP_LIST));
        assert!(!info.supports_operation(OperationCode::GET_PARTIAL_OBJECT));
        assert!(info.supports_format(ObjectFormat::ABSTRACT_AUDIO_ALBUM));
        assert!(!info.supports_format(ObjectFormat::FLAC));
        assert!(info.supports_event(EventCode::OBJECT_ADDED));
        assert!(info.supports_device_property(DeviceProperty::SYNCHRONIZATION_PARTNER));
    }

    #[test]
    fn device_info_truncated() {
        let payload = device_info_payload();
        let r = DeviceInfo::decode(&mut Reader::new(&payload[..20]));
        assert!(matches!(r, Err(CodecError::Truncated)));
    }

    #[test]
    fn storage_info_roundtrip() {
        let mut w = Writer::new();
        w.write_u16(0x0003);
        w.write_u16(0x0002);
        w.write_u16(0x0000);
        w.write_u64(32 << 30);
        w.write_u64(10 << 30);
        w.write_u32(0xffff_ffff);
        w.write_string("internal storage").unwrap();
        w.write_string("Zune").unwrap();
        let bytes = w.into_vec();

        let si = StorageInfo::decode(&mut Reader::new(&bytes)).unwrap();
        assert_eq!(si.max_capacity, 32 << 30);
        assert_eq!(si.free_space_bytes, 10 << 30);
        assert_eq!(si.volume_label, "Zune");
    }

    #[test]
    fn object_info_roundtrip() {
        let info = ObjectInfo {
            storage: StorageId(0x00010001),
            format: ObjectFormat::WMA,
            compressed_size: 4_800_000,
            parent: ObjectId(0x42),
            filename: "13 - Fiero GT.wma".into(),
            modification_date: "20091224T235959".into(),
            ..ObjectInfo::default()
        };
        let mut w = Writer::new();
        info.encode(&mut w).unwrap();
        let bytes = w.into_vec();

        let back = ObjectInfo::decode(&mut Reader::new(&bytes)).unwrap();
        assert_eq!(back.filename, info.filename);
        assert_eq!(back.format, ObjectFormat::WMA);
        assert_eq!(back.compressed_size, 4_800_000);
        assert_eq!(back.parent, ObjectId(0x42));
    }

    #[test]
    fn property_desc_forms() {
        // enum form
        let mut w = Writer::new();
        w.write_u16(0xdc03);
        w.write_u16(DataType::Uint16.code());
        w.write_u8(1);
        w.write_u16(0); // default
        w.write_u32(0);
        w.write_u8(2); // enum form
        w.write_u16(2);
        w.write_u16(0x0000);
        w.write_u16(0x8001);
        let bytes = w.into_vec();
        let d = PropertyDesc::decode(&mut Reader::new(&bytes)).unwrap();
        assert_eq!(d.property, ObjectProperty::PROTECTION_STATUS);
        assert!(d.writable);
        assert!(matches!(&d.form, PropertyForm::Enum(v) if v.len() == 2));

        // range form
        let mut w = Writer::new();
        w.write_u16(0xdc8b);
        w.write_u16(DataType::Uint16.code());
        w.write_u8(1);
        w.write_u16(0);
        w.write_u32(0);
        w.write_u8(1);
        w.write_u16(1);
        w.write_u16(999);
        w.write_u16(1);
        let bytes = w.into_vec();
        let d = PropertyDesc::decode(&mut Reader::new(&bytes)).unwrap();
        assert!(matches!(
            &d.form,
            PropertyForm::Range { max: Value::U16(999), .. }
        ));
    }
}
