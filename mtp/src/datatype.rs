// SPDX-License-Identifier: MIT OR Apache-2.0
/*
 * MTP data type codes and the typed value union.
 *
 * Copyright (c) 2025 Code Construct
 */

use num_derive::FromPrimitive;
use num_traits::FromPrimitive as _;

use crate::codec::{Reader, Writer};
use crate::error::CodecError;

/// MTP data type code: the union discriminator for property values.
#[allow(missing_docs)]
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, FromPrimitive)]
#[repr(u16)]
pub enum DataType {
    Int8 = 0x0001,
    Uint8 = 0x0002,
    Int16 = 0x0003,
    Uint16 = 0x0004,
    Int32 = 0x0005,
    Uint32 = 0x0006,
    Int64 = 0x0007,
    Uint64 = 0x0008,
    Int128 = 0x0009,
    Uint128 = 0x000a,
    ArrayInt8 = 0x4001,
    ArrayUint8 = 0x4002,
    ArrayInt16 = 0x4003,
    ArrayUint16 = 0x4004,
    ArrayInt32 = 0x4005,
    ArrayUint32 = 0x4006,
    ArrayInt64 = 0x4007,
    ArrayUint64 = 0x4008,
    ArrayInt128 = 0x4009,
    ArrayUint128 = 0x400a,
    String = 0xffff,
}

impl DataType {
    /// Parses a raw 16-bit type code.
    pub fn from_code(code: u16) -> Result<Self, CodecError> {
        Self::from_u16(code).ok_or(CodecError::UnsupportedType(code))
    }

    /// The raw 16-bit code.
    pub fn code(&self) -> u16 {
        *self as u16
    }
}

/// A typed MTP property value.
#[allow(missing_docs)]
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Value {
    I8(i8),
    U8(u8),
    I16(i16),
    U16(u16),
    I32(i32),
    U32(u32),
    I64(i64),
    U64(u64),
    I128(i128),
    U128(u128),
    ArrayI8(Vec<i8>),
    ArrayU8(Vec<u8>),
    ArrayI16(Vec<i16>),
    ArrayU16(Vec<u16>),
    ArrayI32(Vec<i32>),
    ArrayU32(Vec<u32>),
    ArrayI64(Vec<i64>),
    ArrayU64(Vec<u64>),
    ArrayI128(Vec<i128>),
    ArrayU128(Vec<u128>),
    Str(String),
}

impl Value {
    /// The data type code matching this value.
    pub fn data_type(&self) -> DataType {
        match self {
            Value::I8(_) => DataType::Int8,
            Value::U8(_) => DataType::Uint8,
            Value::I16(_) => DataType::Int16,
            Value::U16(_) => DataType::Uint16,
            Value::I32(_) => DataType::Int32,
            Value::U32(_) => DataType::Uint32,
            Value::I64(_) => DataType::Int64,
            Value::U64(_) => DataType::Uint64,
            Value::I128(_) => DataType::Int128,
            Value::U128(_) => DataType::Uint128,
            Value::ArrayI8(_) => DataType::ArrayInt8,
            Value::ArrayU8(_) => DataType::ArrayUint8,
            Value::ArrayI16(_) => DataType::ArrayInt16,
            Value::ArrayU16(_) => DataType::ArrayUint16,
            Value::ArrayI32(_) => DataType::ArrayInt32,
            Value::ArrayU32(_) => DataType::ArrayUint32,
            Value::ArrayI64(_) => DataType::ArrayInt64,
            Value::ArrayU64(_) => DataType::ArrayUint64,
            Value::ArrayI128(_) => DataType::ArrayInt128,
            Value::ArrayU128(_) => DataType::ArrayUint128,
            Value::Str(_) => DataType::String,
        }
    }

    /// Encodes the value in its wire form.
    pub fn encode(&self, w: &mut Writer) -> Result<(), CodecError> {
        match self {
            Value::I8(v) => w.write_i8(*v),
            Value::U8(v) => w.write_u8(*v),
            Value::I16(v) => w.write_i16(*v),
            Value::U16(v) => w.write_u16(*v),
            Value::I32(v) => w.write_i32(*v),
            Value::U32(v) => w.write_u32(*v),
            Value::I64(v) => w.write_i64(*v),
            Value::U64(v) => w.write_u64(*v),
            Value::I128(v) => w.write_i128(*v),
            Value::U128(v) => w.write_u128(*v),
            Value::ArrayI8(v) => w.write_array_with(v, |w, v| w.write_i8(*v)),
            Value::ArrayU8(v) => w.write_array_with(v, |w, v| w.write_u8(*v)),
            Value::ArrayI16(v) => w.write_array_with(v, |w, v| w.write_i16(*v)),
            Value::ArrayU16(v) => w.write_array_u16(v),
            Value::ArrayI32(v) => w.write_array_with(v, |w, v| w.write_i32(*v)),
            Value::ArrayU32(v) => w.write_array_u32(v),
            Value::ArrayI64(v) => w.write_array_with(v, |w, v| w.write_i64(*v)),
            Value::ArrayU64(v) => w.write_array_with(v, |w, v| w.write_u64(*v)),
            Value::ArrayI128(v) => w.write_array_with(v, |w, v| w.write_i128(*v)),
            Value::ArrayU128(v) => w.write_array_with(v, |w, v| w.write_u128(*v)),
            Value::Str(v) => w.write_string(v)?,
        }
        Ok(())
    }

    /// Decodes a value of data type `ty` from the reader.
    pub fn decode(r: &mut Reader, ty: DataType) -> Result<Value, CodecError> {
        Ok(match ty {
            DataType::Int8 => Value::I8(r.read_i8()?),
            DataType::Uint8 => Value::U8(r.read_u8()?),
            DataType::Int16 => Value::I16(r.read_i16()?),
            DataType::Uint16 => Value::U16(r.read_u16()?),
            DataType::Int32 => Value::I32(r.read_i32()?),
            DataType::Uint32 => Value::U32(r.read_u32()?),
            DataType::Int64 => Value::I64(r.read_i64()?),
            DataType::Uint64 => Value::U64(r.read_u64()?),
            DataType::Int128 => Value::I128(r.read_i128()?),
            DataType::Uint128 => Value::U128(r.read_u128()?),
            DataType::ArrayInt8 => Value::ArrayI8(r.read_array_with(Reader::read_i8)?),
            DataType::ArrayUint8 => Value::ArrayU8(r.read_array_with(Reader::read_u8)?),
            DataType::ArrayInt16 => Value::ArrayI16(r.read_array_with(Reader::read_i16)?),
            DataType::ArrayUint16 => Value::ArrayU16(r.read_array_u16()?),
            DataType::ArrayInt32 => Value::ArrayI32(r.read_array_with(Reader::read_i32)?),
            DataType::ArrayUint32 => Value::ArrayU32(r.read_array_u32()?),
            DataType::ArrayInt64 => Value::ArrayI64(r.read_array_with(Reader::read_i64)?),
            DataType::ArrayUint64 => Value::ArrayU64(r.read_array_with(Reader::read_u64)?),
            DataType::ArrayInt128 => Value::ArrayI128(r.read_array_with(Reader::read_i128)?),
            DataType::ArrayUint128 => Value::ArrayU128(r.read_array_with(Reader::read_u128)?),
            DataType::String => Value::Str(r.read_string()?),
        })
    }

    /// Decodes a value from a raw 16-bit type code.
    pub fn decode_code(r: &mut Reader, code: u16) -> Result<Value, CodecError> {
        Self::decode(r, DataType::from_code(code)?)
    }

    /// The value widened to `u64`, for any unsigned or signed integer.
    pub fn as_integer(&self) -> Option<u64> {
        match self {
            Value::I8(v) => Some(*v as u64),
            Value::U8(v) => Some(*v as u64),
            Value::I16(v) => Some(*v as u64),
            Value::U16(v) => Some(*v as u64),
            Value::I32(v) => Some(*v as u64),
            Value::U32(v) => Some(*v as u64),
            Value::I64(v) => Some(*v as u64),
            Value::U64(v) => Some(*v),
            _ => None,
        }
    }

    /// The string content, when this is a string value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }
}
