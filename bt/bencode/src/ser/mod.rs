pub mod encode;
pub mod write;

use std::io;
use std::marker::PhantomData;

use bytes::{BufMut, Bytes, BytesMut};
use serde::Deserialize;
use snafu::prelude::*;

use crate::error::io::Error as IoError;
use crate::error::{DuplicateKeySnafu, Error, NullKeySnafu, UnsupportedSnafu};
use crate::governor::{self, Cancel, Governor};

use self::encode::{Encode, Shape};
use self::write::{Sink, SinkExt};

#[derive(Clone, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EncodeOptions {
    /// Upper bound of the number of open containers.
    pub max_depth: usize,
    #[serde(skip)]
    pub cancel: Option<Cancel>,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            max_depth: governor::DEFAULT_LIMIT,
            cancel: None,
        }
    }
}

pub fn to_buf<B, T>(buf: B, value: &T) -> Result<(), Error>
where
    B: BufMut,
    T: Encode + ?Sized,
{
    to_buf_with(buf, value, EncodeOptions::default())
}

pub fn to_buf_with<B, T>(buf: B, value: &T, options: EncodeOptions) -> Result<(), Error>
where
    B: BufMut,
    T: Encode + ?Sized,
{
    Encoder::with_options(buf, options).encode(value)
}

pub fn to_bytes<T>(value: &T) -> Result<Bytes, Error>
where
    T: Encode + ?Sized,
{
    to_bytes_with(value, EncodeOptions::default())
}

pub fn to_bytes_with<T>(value: &T, options: EncodeOptions) -> Result<Bytes, Error>
where
    T: Encode + ?Sized,
{
    let mut buf = BytesMut::new();
    to_buf_with(&mut buf, value, options)?;
    Ok(buf.freeze())
}

pub fn to_writer<W, T>(writer: W, value: &T) -> Result<(), IoError>
where
    W: io::Write,
    T: Encode + ?Sized,
{
    to_writer_with(writer, value, EncodeOptions::default())
}

pub fn to_writer_with<W, T>(writer: W, value: &T, options: EncodeOptions) -> Result<(), IoError>
where
    W: io::Write,
    T: Encode + ?Sized,
{
    Encoder::with_options(writer, options).encode(value)
}

/// Iterative Bencode encoder.
///
/// It walks the value graph with a work stack instead of recursion.  Opening a container pushes
/// a close marker followed by the container's children in reverse order, so that popping the
/// stack emits them in order and then closes the container.
#[derive(Debug)]
pub struct Encoder<W, E> {
    writer: W,
    options: EncodeOptions,
    _phantom: PhantomData<E>,
}

enum Item<'a, T: ?Sized> {
    Node(&'a T, Slot<'a>),
    Key(&'a [u8]),
    Close,
}

/// Where a node sits in its parent, which determines the error for a null node.
#[derive(Clone, Copy)]
enum Slot<'a> {
    Root,
    Element,
    Value(&'a [u8]),
}

impl Slot<'_> {
    fn to_null_error(self) -> Error {
        match self {
            Self::Root => Error::Unsupported { type_name: "null" },
            Self::Element => Error::NullElement,
            Self::Value(key) => Error::NullValue {
                key: Bytes::copy_from_slice(key),
            },
        }
    }
}

impl<W, E> Encoder<W, E> {
    pub fn new(writer: W) -> Self {
        Self::with_options(writer, EncodeOptions::default())
    }

    pub fn with_options(writer: W, options: EncodeOptions) -> Self {
        Self {
            writer,
            options,
            _phantom: PhantomData,
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W, E> Encoder<W, E>
where
    W: Sink<E>,
    E: From<Error>,
{
    pub fn encode<T>(&mut self, value: &T) -> Result<(), E>
    where
        T: Encode + ?Sized,
    {
        let governor = Governor::new(self.options.max_depth, self.options.cancel.as_ref());
        let mut stack = vec![Item::Node(value, Slot::Root)];
        let mut depth = 0usize;
        while let Some(item) = stack.pop() {
            governor.ensure_not_cancelled()?;
            let (node, slot) = match item {
                Item::Node(node, slot) => (node, slot),
                Item::Key(key) => {
                    self.writer.write_byte_string(key)?;
                    continue;
                }
                Item::Close => {
                    self.writer.write_end()?;
                    depth -= 1;
                    continue;
                }
            };
            match node.shape() {
                Shape::Null => return Err(slot.to_null_error().into()),
                Shape::ByteString(bytes) => self.writer.write_byte_string(bytes)?,
                Shape::Integer(integer) => self.writer.write_integer(&integer)?,
                Shape::List(elements) => {
                    depth += 1;
                    governor.ensure_within(depth)?;
                    self.writer.write_list_begin()?;
                    stack.push(Item::Close);
                    stack.extend(
                        elements
                            .into_iter()
                            .rev()
                            .map(|element| Item::Node(element, Slot::Element)),
                    );
                }
                Shape::Dictionary { entries, sorted } => {
                    depth += 1;
                    governor.ensure_within(depth)?;
                    let entries = to_sorted(entries, sorted)?;
                    self.writer.write_dictionary_begin()?;
                    stack.push(Item::Close);
                    for (key, value) in entries.into_iter().rev() {
                        stack.push(Item::Node(value, Slot::Value(key)));
                        stack.push(Item::Key(key));
                    }
                }
                Shape::Unsupported { type_name } => {
                    return Err(UnsupportedSnafu { type_name }.build().into());
                }
            }
        }
        tracing::trace!("encode bencode value");
        Ok(())
    }
}

fn to_sorted<'a, T>(
    entries: Vec<(Option<&'a [u8]>, &'a T)>,
    sorted: bool,
) -> Result<Vec<(&'a [u8], &'a T)>, Error>
where
    T: ?Sized,
{
    let mut entries = entries
        .into_iter()
        .map(|(key, value)| Ok((key.context(NullKeySnafu)?, value)))
        .collect::<Result<Vec<_>, Error>>()?;
    if !sorted {
        entries.sort_by(|(lhs, _), (rhs, _)| lhs.cmp(rhs));
        if let Some(pair) = entries.windows(2).find(|pair| pair[0].0 == pair[1].0) {
            return DuplicateKeySnafu {
                key: Bytes::copy_from_slice(pair[0].0),
            }
            .fail();
        }
    }
    Ok(entries)
}
