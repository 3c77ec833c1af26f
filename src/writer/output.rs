//! Position-aware output sinks for the serializer.

use std::io::{self, Write};

/// A byte sink that knows the absolute offset of the next byte it writes.
pub trait PositionedWrite: Write {
    /// Offset at which the next byte will land.
    fn position(&self) -> u64;
}

impl PositionedWrite for Vec<u8> {
    fn position(&self) -> u64 {
        self.len() as u64
    }
}

/// Wraps any writer and counts the bytes that pass through it.
#[derive(Debug)]
pub struct CountingWriter<W> {
    inner: W,
    position: u64,
}

impl<W: Write> CountingWriter<W> {
    /// Start counting at zero.
    pub fn new(inner: W) -> Self {
        Self::with_offset(inner, 0)
    }

    /// Start counting at `offset`, for sinks that already hold data.
    pub fn with_offset(inner: W, offset: u64) -> Self {
        Self {
            inner,
            position: offset,
        }
    }

    /// Unwrap the inner writer.
    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> Write for CountingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let written = self.inner.write(buf)?;
        self.position += written as u64;
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl<W: Write> PositionedWrite for CountingWriter<W> {
    fn position(&self) -> u64 {
        self.position
    }
}
