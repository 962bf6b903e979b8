use std::io;

use bytes::BufMut;
use snafu::prelude::*;

use crate::error::Error;
use crate::error::io::{Error as IoError, IoSnafu};
use crate::value::Integer;

/// Byte sink consumed by the encoder.
pub trait Sink<E> {
    fn write_u8(&mut self, byte: u8) -> Result<(), E>;

    fn write_slice(&mut self, slice: &[u8]) -> Result<(), E>;
}

//
// Bencode helpers.
//

pub(crate) trait SinkExt<E>: Sink<E> {
    fn write_byte_string(&mut self, bytes: &[u8]) -> Result<(), E> {
        self.write_slice(bytes.len().to_string().as_bytes())?;
        self.write_u8(b':')?;
        self.write_slice(bytes)
    }

    fn write_integer(&mut self, integer: &Integer) -> Result<(), E> {
        self.write_u8(b'i')?;
        // `BigInt` formats canonically: no leading zeros, and zero is never negative.
        self.write_slice(integer.to_str_radix(10).as_bytes())?;
        self.write_u8(b'e')
    }

    fn write_list_begin(&mut self) -> Result<(), E> {
        self.write_u8(b'l')
    }

    fn write_dictionary_begin(&mut self) -> Result<(), E> {
        self.write_u8(b'd')
    }

    fn write_end(&mut self) -> Result<(), E> {
        self.write_u8(b'e')
    }
}

impl<W, E> SinkExt<E> for W where W: Sink<E> + ?Sized {}

impl<B> Sink<Error> for B
where
    B: BufMut,
{
    fn write_u8(&mut self, byte: u8) -> Result<(), Error> {
        self.put_u8(byte);
        Ok(())
    }

    fn write_slice(&mut self, slice: &[u8]) -> Result<(), Error> {
        self.put_slice(slice);
        Ok(())
    }
}

impl<W> Sink<IoError> for W
where
    W: io::Write,
{
    fn write_u8(&mut self, byte: u8) -> Result<(), IoError> {
        self.write_all(&[byte]).context(IoSnafu)
    }

    fn write_slice(&mut self, slice: &[u8]) -> Result<(), IoError> {
        self.write_all(slice).context(IoSnafu)
    }
}
