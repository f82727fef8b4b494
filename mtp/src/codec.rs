// SPDX-License-Identifier: MIT OR Apache-2.0
/*
 * Little-endian wire codec: cursor reader/writer with the PTP string and
 * array forms.
 *
 * Copyright (c) 2025 Code Construct
 */

//! Byte-level primitives shared by containers, messages and property lists.
//!
//! Everything on the wire is little-endian. Strings are length-prefixed
//! UTF-16LE: a single count byte of code units *including* the trailing NUL,
//! with count `0` meaning the empty string (no terminator follows).

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::CodecError;

/// Cursor over a received byte buffer.
///
/// Every read fails with [`CodecError::Truncated`] if the buffer ends
/// mid-field.
#[derive(Debug)]
pub struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    /// Constructs a reader over `buf`.
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Returns `true` when the buffer is fully consumed.
    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], CodecError> {
        let out = self
            .buf
            .get(self.pos..self.pos.checked_add(n).ok_or(CodecError::Truncated)?)
            .ok_or(CodecError::Truncated)?;
        self.pos += n;
        Ok(out)
    }

    /// Reads `n` raw bytes.
    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8], CodecError> {
        self.take(n)
    }

    /// Reads a `u8`.
    pub fn read_u8(&mut self) -> Result<u8, CodecError> {
        Ok(self.take(1)?[0])
    }

    /// Reads a little-endian `u16`.
    pub fn read_u16(&mut self) -> Result<u16, CodecError> {
        Ok(u16::from_le_bytes(self.take(2)?.try_into().unwrap()))
    }

    /// Reads a little-endian `u32`.
    pub fn read_u32(&mut self) -> Result<u32, CodecError> {
        Ok(u32::from_le_bytes(self.take(4)?.try_into().unwrap()))
    }

    /// Reads a little-endian `u64`.
    pub fn read_u64(&mut self) -> Result<u64, CodecError> {
        Ok(u64::from_le_bytes(self.take(8)?.try_into().unwrap()))
    }

    /// Reads a little-endian `u128`.
    pub fn read_u128(&mut self) -> Result<u128, CodecError> {
        Ok(u128::from_le_bytes(self.take(16)?.try_into().unwrap()))
    }

    /// Reads an `i8`.
    pub fn read_i8(&mut self) -> Result<i8, CodecError> {
        Ok(self.read_u8()? as i8)
    }

    /// Reads a little-endian `i16`.
    pub fn read_i16(&mut self) -> Result<i16, CodecError> {
        Ok(self.read_u16()? as i16)
    }

    /// Reads a little-endian `i32`.
    pub fn read_i32(&mut self) -> Result<i32, CodecError> {
        Ok(self.read_u32()? as i32)
    }

    /// Reads a little-endian `i64`.
    pub fn read_i64(&mut self) -> Result<i64, CodecError> {
        Ok(self.read_u64()? as i64)
    }

    /// Reads a little-endian `i128`.
    pub fn read_i128(&mut self) -> Result<i128, CodecError> {
        Ok(self.read_u128()? as i128)
    }

    /// Reads a length-prefixed UTF-16LE string.
    ///
    /// The count byte includes the trailing NUL; a count of zero is the
    /// empty string with no terminator following.
    pub fn read_string(&mut self) -> Result<String, CodecError> {
        let count = self.read_u8()? as usize;
        if count == 0 {
            return Ok(String::new());
        }
        let raw = self.take(count * 2)?;
        let mut units: Vec<u16> = raw
            .chunks_exact(2)
            .map(|c| u16::from_le_bytes([c[0], c[1]]))
            .collect();
        // Tolerate a missing terminator from quirky devices, but strip
        // the well-formed one.
        if units.last() == Some(&0) {
            units.pop();
        }
        char::decode_utf16(units.into_iter())
            .collect::<Result<String, _>>()
            .map_err(|_| CodecError::BadString)
    }

    /// Reads a 32-bit count followed by that many elements.
    pub fn read_array_with<T, F>(&mut self, mut read: F) -> Result<Vec<T>, CodecError>
    where
        F: FnMut(&mut Self) -> Result<T, CodecError>,
    {
        let count = self.read_u32()? as usize;
        let mut out = Vec::with_capacity(count.min(4096));
        for _ in 0..count {
            out.push(read(self)?);
        }
        Ok(out)
    }

    /// Reads an array of `u16`.
    pub fn read_array_u16(&mut self) -> Result<Vec<u16>, CodecError> {
        self.read_array_with(Self::read_u16)
    }

    /// Reads an array of `u32`.
    pub fn read_array_u32(&mut self) -> Result<Vec<u32>, CodecError> {
        self.read_array_with(Self::read_u32)
    }
}

/// Growable little-endian output buffer.
#[derive(Debug, Default)]
pub struct Writer {
    buf: BytesMut,
}

impl Writer {
    /// Constructs an empty writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Constructs a writer with `cap` bytes preallocated.
    pub fn with_capacity(cap: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(cap),
        }
    }

    /// Bytes written so far.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Returns `true` when nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Appends raw bytes.
    pub fn write_bytes(&mut self, data: &[u8]) {
        self.buf.put_slice(data);
    }

    /// Appends a `u8`.
    pub fn write_u8(&mut self, v: u8) {
        self.buf.put_u8(v);
    }

    /// Appends a little-endian `u16`.
    pub fn write_u16(&mut self, v: u16) {
        self.buf.put_u16_le(v);
    }

    /// Appends a little-endian `u32`.
    pub fn write_u32(&mut self, v: u32) {
        self.buf.put_u32_le(v);
    }

    /// Appends a little-endian `u64`.
    pub fn write_u64(&mut self, v: u64) {
        self.buf.put_u64_le(v);
    }

    /// Appends a little-endian `u128`.
    pub fn write_u128(&mut self, v: u128) {
        self.buf.put_u128_le(v);
    }

    /// Appends an `i8`.
    pub fn write_i8(&mut self, v: i8) {
        self.buf.put_i8(v);
    }

    /// Appends a little-endian `i16`.
    pub fn write_i16(&mut self, v: i16) {
        self.buf.put_i16_le(v);
    }

    /// Appends a little-endian `i32`.
    pub fn write_i32(&mut self, v: i32) {
        self.buf.put_i32_le(v);
    }

    /// Appends a little-endian `i64`.
    pub fn write_i64(&mut self, v: i64) {
        self.buf.put_i64_le(v);
    }

    /// Appends a little-endian `i128`.
    pub fn write_i128(&mut self, v: i128) {
        self.buf.put_i128_le(v);
    }

    /// Appends a length-prefixed UTF-16LE string.
    ///
    /// Fails with [`CodecError::StringTooLong`] if the string needs more
    /// UTF-16 code units than the single count byte can carry.
    pub fn write_string(&mut self, s: &str) -> Result<(), CodecError> {
        if s.is_empty() {
            self.buf.put_u8(0);
            return Ok(());
        }
        let units: Vec<u16> = s.encode_utf16().collect();
        let count = units
            .len()
            .checked_add(1)
            .filter(|c| *c <= u8::MAX as usize)
            .ok_or(CodecError::StringTooLong)?;
        self.buf.put_u8(count as u8);
        for u in units {
            self.buf.put_u16_le(u);
        }
        self.buf.put_u16_le(0);
        Ok(())
    }

    /// Appends a 32-bit count followed by the elements.
    pub fn write_array_with<T, F>(&mut self, items: &[T], mut write: F)
    where
        F: FnMut(&mut Self, &T),
    {
        self.buf.put_u32_le(items.len() as u32);
        for item in items {
            write(self, item);
        }
    }

    /// Appends an array of `u16`.
    pub fn write_array_u16(&mut self, items: &[u16]) {
        self.write_array_with(items, |w, v| w.write_u16(*v));
    }

    /// Appends an array of `u32`.
    pub fn write_array_u32(&mut self, items: &[u32]) {
        self.write_array_with(items, |w, v| w.write_u32(*v));
    }

    /// Consumes the writer, returning the accumulated bytes.
    pub fn into_bytes(self) -> Bytes {
        self.buf.freeze()
    }

    /// Consumes the writer, returning an owned `Vec`.
    pub fn into_vec(self) -> Vec<u8> {
        self.buf.to_vec()
    }

    /// Borrows the accumulated bytes.
    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }
}
