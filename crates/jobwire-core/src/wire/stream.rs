//! Byte-level primitives shared by every message.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::domain::errors::CodecError;

const VINT_MAX_BYTES: usize = 5;
const VLONG_MAX_BYTES: usize = 10;

/// Append-only output stream.
#[derive(Debug, Default)]
pub struct StreamOutput {
    buf: BytesMut,
}

impl StreamOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn write_byte(&mut self, value: u8) {
        self.buf.put_u8(value);
    }

    pub fn write_bool(&mut self, value: bool) {
        self.write_byte(u8::from(value));
    }

    /// 7 bits per byte, low group first, high bit set while more bytes follow.
    pub fn write_vint(&mut self, value: u32) {
        self.write_varint(u64::from(value));
    }

    pub fn write_vlong(&mut self, value: u64) {
        self.write_varint(value);
    }

    fn write_varint(&mut self, mut value: u64) {
        while value >= 0x80 {
            self.buf.put_u8((value as u8 & 0x7f) | 0x80);
            value >>= 7;
        }
        self.buf.put_u8(value as u8);
    }

    /// Fixed 8 bytes, big-endian.
    pub fn write_long(&mut self, value: u64) {
        self.buf.put_u64(value);
    }

    pub fn write_string(&mut self, value: &str) -> Result<(), CodecError> {
        self.write_len(value.len())?;
        self.buf.put_slice(value.as_bytes());
        Ok(())
    }

    pub fn write_string_list<S: AsRef<str>>(&mut self, values: &[S]) -> Result<(), CodecError> {
        self.write_len(values.len())?;
        for value in values {
            self.write_string(value.as_ref())?;
        }
        Ok(())
    }

    pub fn write_optional<T>(
        &mut self,
        value: Option<&T>,
        write: impl FnOnce(&mut Self, &T) -> Result<(), CodecError>,
    ) -> Result<(), CodecError> {
        match value {
            Some(v) => {
                self.write_bool(true);
                write(self, v)
            }
            None => {
                self.write_bool(false);
                Ok(())
            }
        }
    }

    pub fn write_list<T: super::Writeable>(&mut self, values: &[T]) -> Result<(), CodecError> {
        self.write_len(values.len())?;
        for value in values {
            value.write_to(self)?;
        }
        Ok(())
    }

    /// Lengths are framed as a vint, so anything above `u32::MAX` cannot be sent.
    fn write_len(&mut self, len: usize) -> Result<(), CodecError> {
        let len = u32::try_from(len).map_err(|_| CodecError::LengthOverflow(len as u64))?;
        self.write_vint(len);
        Ok(())
    }

    pub fn freeze(self) -> Bytes {
        self.buf.freeze()
    }
}

/// Cursor over a received message.
#[derive(Debug)]
pub struct StreamInput<'a> {
    buf: &'a [u8],
}

impl<'a> StreamInput<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    pub fn remaining(&self) -> usize {
        self.buf.remaining()
    }

    fn ensure(&self, needed: usize) -> Result<(), CodecError> {
        let remaining = self.remaining();
        if remaining < needed {
            return Err(CodecError::UnexpectedEof { needed, remaining });
        }
        Ok(())
    }

    pub fn read_byte(&mut self) -> Result<u8, CodecError> {
        self.ensure(1)?;
        Ok(self.buf.get_u8())
    }

    pub fn read_bool(&mut self) -> Result<bool, CodecError> {
        match self.read_byte()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(CodecError::InvalidBool(other)),
        }
    }

    pub fn read_vint(&mut self) -> Result<u32, CodecError> {
        let value = self.read_varint(VINT_MAX_BYTES)?;
        u32::try_from(value).map_err(|_| CodecError::VarIntOverflow {
            max_bytes: VINT_MAX_BYTES,
        })
    }

    pub fn read_vlong(&mut self) -> Result<u64, CodecError> {
        self.read_varint(VLONG_MAX_BYTES)
    }

    fn read_varint(&mut self, max_bytes: usize) -> Result<u64, CodecError> {
        let mut value = 0u64;
        for i in 0..max_bytes {
            let byte = self.read_byte()?;
            value |= u64::from(byte & 0x7f) << (7 * i);
            if byte & 0x80 == 0 {
                return Ok(value);
            }
        }
        Err(CodecError::VarIntOverflow { max_bytes })
    }

    pub fn read_long(&mut self) -> Result<u64, CodecError> {
        self.ensure(8)?;
        Ok(self.buf.get_u64())
    }

    pub fn read_string(&mut self) -> Result<String, CodecError> {
        let len = self.read_len()?;
        self.ensure(len)?;
        let (head, tail) = self.buf.split_at(len);
        let value = std::str::from_utf8(head)
            .map_err(|_| CodecError::InvalidUtf8)?
            .to_string();
        self.buf = tail;
        Ok(value)
    }

    pub fn read_string_list(&mut self) -> Result<Vec<String>, CodecError> {
        let len = self.read_len()?;
        // each entry takes at least one byte, so a bogus count fails fast
        self.ensure(len)?;
        (0..len).map(|_| self.read_string()).collect()
    }

    pub fn read_optional<T>(
        &mut self,
        read: impl FnOnce(&mut Self) -> Result<T, CodecError>,
    ) -> Result<Option<T>, CodecError> {
        if self.read_bool()? {
            read(self).map(Some)
        } else {
            Ok(None)
        }
    }

    pub fn read_list<T: super::Readable>(&mut self) -> Result<Vec<T>, CodecError> {
        let len = self.read_len()?;
        self.ensure(len)?;
        (0..len).map(|_| T::read_from(self)).collect()
    }

    fn read_len(&mut self) -> Result<usize, CodecError> {
        let len = self.read_vint()?;
        usize::try_from(len).map_err(|_| CodecError::LengthOverflow(u64::from(len)))
    }
}
