use std::io::{BufRead, Read};

use bytes::{Buf, Bytes};
use snafu::prelude::*;

use crate::error::io::{Error as IoError, IoSnafu};
use crate::error::{Error, IncompleteSnafu};

/// Byte source consumed by the decoder.
///
/// `E` is the error type of the source, which lets in-memory sources report plain `Error`s and
/// I/O sources report `io::Error`s.
pub trait Source<E> {
    /// Returns the next byte without consuming it, or `None` at the end of input.
    fn peek_u8(&mut self) -> Result<Option<u8>, E>;

    /// Consumes the next byte.  Returns `Error::Incomplete` at the end of input.
    fn read_u8(&mut self) -> Result<u8, E>;

    /// Consumes exactly `size` bytes.  Returns `Error::Incomplete` if fewer are available.
    fn read_bytes(&mut self, size: usize) -> Result<Bytes, E>;

    /// Number of bytes consumed so far.
    fn position(&self) -> usize;
}

#[derive(Debug)]
pub struct BufSource<B> {
    buf: B,
    position: usize,
}

impl<B> BufSource<B> {
    pub fn new(buf: B) -> Self {
        Self { buf, position: 0 }
    }

    pub fn into_inner(self) -> B {
        self.buf
    }
}

impl<B> Source<Error> for BufSource<B>
where
    B: Buf,
{
    fn peek_u8(&mut self) -> Result<Option<u8>, Error> {
        Ok(self.buf.chunk().first().copied())
    }

    fn read_u8(&mut self) -> Result<u8, Error> {
        let byte = self.buf.try_get_u8().map_err(|_| Error::Incomplete)?;
        self.position += 1;
        Ok(byte)
    }

    fn read_bytes(&mut self, size: usize) -> Result<Bytes, Error> {
        // It is important to do the check before actually allocating the buffer.
        ensure!(size <= self.buf.remaining(), IncompleteSnafu);
        self.position += size;
        Ok(self.buf.copy_to_bytes(size))
    }

    fn position(&self) -> usize {
        self.position
    }
}

#[derive(Debug)]
pub struct ReaderSource<R> {
    reader: R,
    position: usize,
}

impl<R> ReaderSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            position: 0,
        }
    }

    pub fn into_inner(self) -> R {
        self.reader
    }
}

impl<R> Source<IoError> for ReaderSource<R>
where
    R: BufRead,
{
    fn peek_u8(&mut self) -> Result<Option<u8>, IoError> {
        Ok(self.reader.fill_buf().context(IoSnafu)?.first().copied())
    }

    fn read_u8(&mut self) -> Result<u8, IoError> {
        let byte = self.peek_u8()?.ok_or(Error::Incomplete)?;
        self.reader.consume(1);
        self.position += 1;
        Ok(byte)
    }

    fn read_bytes(&mut self, size: usize) -> Result<Bytes, IoError> {
        // Do not trust `size` for the allocation; the declared length may be far larger than the
        // actual input.
        let mut buf = Vec::new();
        let n = (&mut self.reader)
            .take(u64::try_from(size).unwrap_or(u64::MAX))
            .read_to_end(&mut buf)
            .context(IoSnafu)?;
        self.position += n;
        ensure!(n == size, IncompleteSnafu);
        Ok(buf.into())
    }

    fn position(&self) -> usize {
        self.position
    }
}
