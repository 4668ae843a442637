//! Byte sinks and sources the protocols read from and write to.

use std::io::{ErrorKind, Read, Write};

use crate::error::TransportError;

/// A blocking byte sink/source.
///
/// `read` either returns exactly `n` bytes or fails; a short read is
/// [`TransportError::Eof`].
pub trait Transport {
    /// Writes all of `bytes`.
    fn write(&mut self, bytes: &[u8]) -> Result<(), TransportError>;

    /// Reads exactly `n` bytes.
    fn read(&mut self, n: usize) -> Result<Vec<u8>, TransportError>;

    /// Flushes buffered output.
    fn flush(&mut self) -> Result<(), TransportError>;
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn write(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        (**self).write(bytes)
    }

    fn read(&mut self, n: usize) -> Result<Vec<u8>, TransportError> {
        (**self).read(n)
    }

    fn flush(&mut self) -> Result<(), TransportError> {
        (**self).flush()
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn write(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        (**self).write(bytes)
    }

    fn read(&mut self, n: usize) -> Result<Vec<u8>, TransportError> {
        (**self).read(n)
    }

    fn flush(&mut self) -> Result<(), TransportError> {
        (**self).flush()
    }
}

// =============================================================================
// MEMORY
// =============================================================================

/// In-memory transport: writes append, reads consume from a cursor.
#[derive(Debug, Clone, Default)]
pub struct MemoryBuffer {
    buf: Vec<u8>,
    pos: usize,
}

impl MemoryBuffer {
    /// Creates an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns everything written so far, including consumed bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Returns the number of bytes not yet read.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Moves the read cursor back to the start of the written data.
    pub fn reset(&mut self) {
        self.pos = 0;
    }

    /// Discards all data.
    pub fn clear(&mut self) {
        self.buf.clear();
        self.pos = 0;
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }
}

impl From<Vec<u8>> for MemoryBuffer {
    fn from(buf: Vec<u8>) -> Self {
        Self { buf, pos: 0 }
    }
}

impl From<&[u8]> for MemoryBuffer {
    fn from(buf: &[u8]) -> Self {
        Self::from(buf.to_vec())
    }
}

impl Transport for MemoryBuffer {
    fn write(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        self.buf.extend_from_slice(bytes);
        Ok(())
    }

    fn read(&mut self, n: usize) -> Result<Vec<u8>, TransportError> {
        let available = self.remaining();
        if n > available {
            return Err(TransportError::Eof { need: n, available });
        }
        let bytes = self.buf[self.pos..self.pos + n].to_vec();
        self.pos += n;
        Ok(bytes)
    }

    fn flush(&mut self) -> Result<(), TransportError> {
        Ok(())
    }
}

// =============================================================================
// STREAM
// =============================================================================

/// Transport over any `std::io` stream, e.g. a `TcpStream`.
#[derive(Debug)]
pub struct StreamTransport<S> {
    stream: S,
}

impl<S: Read + Write> StreamTransport<S> {
    pub fn new(stream: S) -> Self {
        Self { stream }
    }

    pub fn get_ref(&self) -> &S {
        &self.stream
    }

    pub fn into_inner(self) -> S {
        self.stream
    }
}

impl<S: Read + Write> Transport for StreamTransport<S> {
    fn write(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        Ok(self.stream.write_all(bytes)?)
    }

    fn read(&mut self, n: usize) -> Result<Vec<u8>, TransportError> {
        let mut buf = vec![0u8; n];
        let mut filled = 0;
        while filled < n {
            match self.stream.read(&mut buf[filled..]) {
                Ok(0) => {
                    return Err(TransportError::Eof {
                        need: n,
                        available: filled,
                    });
                }
                Ok(read) => filled += read,
                Err(err) if err.kind() == ErrorKind::Interrupted => {}
                Err(err) => return Err(err.into()),
            }
        }
        Ok(buf)
    }

    fn flush(&mut self) -> Result<(), TransportError> {
        Ok(self.stream.flush()?)
    }
}
