//! Primitive encoding/decoding for the binary format.
//!
//! All integers and doubles are big-endian and fixed width. Strings and
//! binaries carry an i32 length prefix.

use crate::error::{DecodeError, EncodeError, TransportError};
use crate::transport::Transport;

// =============================================================================
// DECODING
// =============================================================================

/// Reader for decoding binary data pulled from a transport.
///
/// Every read is exact; a transport that runs dry surfaces as
/// [`DecodeError::Transport`].
#[derive(Debug)]
pub struct Reader<'t, T: ?Sized> {
    transport: &'t mut T,
    max_len: usize,
}

impl<'t, T: Transport + ?Sized> Reader<'t, T> {
    /// Creates a reader whose length prefixes are capped at `max_len`.
    pub fn new(transport: &'t mut T, max_len: usize) -> Self {
        Self { transport, max_len }
    }

    /// Reads exactly `n` bytes.
    #[inline]
    pub fn read_bytes(&mut self, n: usize) -> Result<Vec<u8>, DecodeError> {
        Ok(self.transport.read(n)?)
    }

    #[inline]
    fn read_array<const N: usize>(&mut self) -> Result<[u8; N], DecodeError> {
        let bytes = self.read_bytes(N)?;
        bytes.try_into().map_err(|rest: Vec<u8>| {
            DecodeError::Transport(TransportError::Eof {
                need: N,
                available: rest.len(),
            })
        })
    }

    /// Reads a single byte.
    #[inline]
    pub fn read_byte(&mut self) -> Result<u8, DecodeError> {
        let [byte] = self.read_array::<1>()?;
        Ok(byte)
    }

    /// Reads a bool, which must be 0x00 or 0x01.
    pub fn read_bool(&mut self) -> Result<bool, DecodeError> {
        match self.read_byte()? {
            0x00 => Ok(false),
            0x01 => Ok(true),
            value => Err(DecodeError::InvalidBool { value }),
        }
    }

    pub fn read_i8(&mut self) -> Result<i8, DecodeError> {
        Ok(i8::from_be_bytes(self.read_array()?))
    }

    pub fn read_i16(&mut self) -> Result<i16, DecodeError> {
        Ok(i16::from_be_bytes(self.read_array()?))
    }

    pub fn read_i32(&mut self) -> Result<i32, DecodeError> {
        Ok(i32::from_be_bytes(self.read_array()?))
    }

    pub fn read_i64(&mut self) -> Result<i64, DecodeError> {
        Ok(i64::from_be_bytes(self.read_array()?))
    }

    /// Reads a big-endian f64. NaN is a legal value on this wire.
    pub fn read_f64(&mut self) -> Result<f64, DecodeError> {
        Ok(f64::from_be_bytes(self.read_array()?))
    }

    /// Reads an i32 length or count, rejecting negatives and values over `max`.
    pub fn read_len(&mut self, max: usize, field: &'static str) -> Result<usize, DecodeError> {
        let len = self.read_i32()?;
        let len = usize::try_from(len).map_err(|_| DecodeError::NegativeLength {
            field,
            len: i64::from(len),
        })?;
        if len > max {
            return Err(DecodeError::LengthExceedsLimit { field, len, max });
        }
        Ok(len)
    }

    /// Reads an i32 length-prefixed byte array.
    pub fn read_bytes_prefixed(&mut self, field: &'static str) -> Result<Vec<u8>, DecodeError> {
        let len = self.read_len(self.max_len, field)?;
        self.read_bytes(len)
    }
}

// =============================================================================
// ENCODING
// =============================================================================

/// Writer for encoding binary data into a buffer.
#[derive(Debug, Clone, Default)]
pub struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    /// Creates a new writer.
    pub fn new() -> Self {
        Self { buf: Vec::new() }
    }

    /// Creates a new writer with capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    /// Returns the written bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    /// Returns a reference to the written bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    #[inline]
    pub fn write_byte(&mut self, byte: u8) {
        self.buf.push(byte);
    }

    #[inline]
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    pub fn write_bool(&mut self, value: bool) {
        self.write_byte(u8::from(value));
    }

    pub fn write_i8(&mut self, value: i8) {
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    pub fn write_i16(&mut self, value: i16) {
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    pub fn write_i32(&mut self, value: i32) {
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    pub fn write_u32(&mut self, value: u32) {
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    pub fn write_i64(&mut self, value: i64) {
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    /// Writes a big-endian f64.
    pub fn write_f64(&mut self, value: f64) {
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    /// Writes an i32 length or count.
    pub fn write_len(&mut self, len: usize, field: &'static str) -> Result<(), EncodeError> {
        let len = i32::try_from(len).map_err(|_| EncodeError::LengthExceedsLimit {
            field,
            len,
            max: i32::MAX as usize,
        })?;
        self.write_i32(len);
        Ok(())
    }

    /// Writes an i32 length-prefixed byte array.
    pub fn write_bytes_prefixed(&mut self, bytes: &[u8], field: &'static str) -> Result<(), EncodeError> {
        self.write_len(bytes.len(), field)?;
        self.buf.extend_from_slice(bytes);
        Ok(())
    }
}
