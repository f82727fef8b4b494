// SPDX-License-Identifier: MIT OR Apache-2.0
/*
 * The object property list grammar shared by GetObjectPropList and
 * SendObjectPropList.
 *
 * Copyright (c) 2025 Code Construct
 */

//! Property lists: a 32-bit entry count followed by
//! `(object_id: u32, property: u16, type: u16, value)` tuples.
//!
//! The parser is polymorphic over the value decoder so callers can extract
//! typed values, strings only, raw bytes, or skip values entirely while
//! still walking the entries.

use crate::codec::{Reader, Writer};
use crate::datatype::{DataType, Value};
use crate::error::CodecError;
use crate::property::ObjectProperty;
use crate::types::ObjectId;

/// Decodes one value of the given type, yielding `V`.
pub trait ValueDecoder {
    /// The decoded form.
    type Output;

    /// Decodes (or skips) one value.
    fn decode(&mut self, r: &mut Reader, ty: DataType) -> Result<Self::Output, CodecError>;
}

impl<V, F> ValueDecoder for F
where
    F: FnMut(&mut Reader, DataType) -> Result<V, CodecError>,
{
    type Output = V;

    fn decode(&mut self, r: &mut Reader, ty: DataType) -> Result<V, CodecError> {
        self(r, ty)
    }
}

/// Decoder yielding typed [`Value`]s.
pub fn decode_value(r: &mut Reader, ty: DataType) -> Result<Value, CodecError> {
    Value::decode(r, ty)
}

/// Decoder yielding strings; non-string entries decode to `None`.
pub fn decode_string(r: &mut Reader, ty: DataType) -> Result<Option<String>, CodecError> {
    Ok(match Value::decode(r, ty)? {
        Value::Str(s) => Some(s),
        _ => None,
    })
}

/// Decoder widening any integer entry to `u64`; others decode to `None`.
pub fn decode_integer(r: &mut Reader, ty: DataType) -> Result<Option<u64>, CodecError> {
    Ok(Value::decode(r, ty)?.as_integer())
}

/// Decoder that skips the value entirely.
pub fn skip_value(r: &mut Reader, ty: DataType) -> Result<(), CodecError> {
    Value::decode(r, ty).map(|_| ())
}

/// Number of entries in an encoded property list.
pub fn entry_count(data: &[u8]) -> Result<u32, CodecError> {
    Reader::new(data).read_u32()
}

/// Walks an encoded property list, calling `visit` per entry.
///
/// Unknown data type codes abort the walk with
/// [`CodecError::UnsupportedType`]; entries for properties the caller did
/// not ask for are still visited.
pub fn parse_with<D, F>(data: &[u8], mut decoder: D, mut visit: F) -> Result<(), CodecError>
where
    D: ValueDecoder,
    F: FnMut(ObjectId, ObjectProperty, D::Output),
{
    let mut r = Reader::new(data);
    let count = r.read_u32()?;
    for _ in 0..count {
        let object = ObjectId(r.read_u32()?);
        let property = ObjectProperty(r.read_u16()?);
        let ty = DataType::from_code(r.read_u16()?)?;
        let value = decoder.decode(&mut r, ty)?;
        visit(object, property, value);
    }
    Ok(())
}

/// Builds an encoded property list.
#[derive(Debug, Default)]
pub struct PropertyListBuilder {
    entries: u32,
    body: Writer,
}

impl PropertyListBuilder {
    /// Constructs an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one `(object, property, value)` entry.
    pub fn append(
        &mut self,
        object: ObjectId,
        property: ObjectProperty,
        value: &Value,
    ) -> Result<(), CodecError> {
        self.body.write_u32(object.0);
        self.body.write_u16(property.0);
        self.body.write_u16(value.data_type().code());
        value.encode(&mut self.body)?;
        self.entries += 1;
        Ok(())
    }

    /// Entries appended so far.
    pub fn len(&self) -> u32 {
        self.entries
    }

    /// Returns `true` when no entry has been appended.
    pub fn is_empty(&self) -> bool {
        self.entries == 0
    }

    /// Finishes the list, returning its wire form.
    pub fn finish(self) -> Vec<u8> {
        let mut out = Writer::with_capacity(4 + self.body.len());
        out.write_u32(self.entries);
        out.write_bytes(self.body.as_slice());
        out.into_vec()
    }
}
