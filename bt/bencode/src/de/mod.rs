pub mod read;

mod dict;
mod strict;

use std::io::BufRead;
use std::marker::PhantomData;

use bytes::{Buf, BufMut, Bytes, BytesMut};
use serde::Deserialize;
use snafu::prelude::*;

use crate::error::io::Error as IoError;
use crate::error::{
    EofSnafu, Error, IncompleteSnafu, TopLevelSnafu, UnexpectedEndSnafu, UnterminatedSnafu,
    UnwrappedSnafu,
};
use crate::governor::{self, Cancel, Governor};
use crate::value::{Integer, Value};

use self::read::{BufSource, ReaderSource, Source};

pub const DEFAULT_MAX_BYTE_STRING_SIZE: usize = i32::MAX as usize;

#[derive(Clone, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DecodeOptions {
    /// Upper bound of the operand stack, which counts both the open containers and the items
    /// accumulated in them.
    pub max_stack_size: usize,
    pub max_byte_string_size: usize,
    /// Accept a byte string or an integer as the whole document.
    pub allow_unwrapped_elements: bool,
    /// Accept dictionaries whose keys are not in ascending order.  Duplicate keys are rejected
    /// regardless.
    pub allow_unordered_keys: bool,
    #[serde(skip)]
    pub cancel: Option<Cancel>,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            max_stack_size: governor::DEFAULT_LIMIT,
            max_byte_string_size: DEFAULT_MAX_BYTE_STRING_SIZE,
            allow_unwrapped_elements: true,
            allow_unordered_keys: false,
            cancel: None,
        }
    }
}

pub fn from_buf<B>(buf: B) -> Result<Value, Error>
where
    B: Buf,
{
    from_buf_with(buf, DecodeOptions::default())
}

pub fn from_buf_with<B>(buf: B, options: DecodeOptions) -> Result<Value, Error>
where
    B: Buf,
{
    Decoder::with_options(BufSource::new(buf), options).decode()
}

pub fn from_slice(slice: &[u8]) -> Result<Value, Error> {
    from_buf(slice)
}

/// Decodes the next top-level value of a stream.
///
/// It returns `None` when the stream ends cleanly, which lets callers decode a sequence of
/// concatenated values.  Note that `reader` should be reused across calls because it buffers
/// input beyond the value being decoded.
pub fn from_reader<R>(reader: R) -> Result<Option<Value>, IoError>
where
    R: BufRead,
{
    from_reader_with(reader, DecodeOptions::default())
}

pub fn from_reader_with<R>(reader: R, options: DecodeOptions) -> Result<Option<Value>, IoError>
where
    R: BufRead,
{
    Decoder::with_options(ReaderSource::new(reader), options).decode_next()
}

/// Iterative Bencode decoder.
///
/// Rather than recursive descent, it maintains an operand stack of decoded values interleaved
/// with container-start markers.  A container-end token pops the stack down to the nearest
/// marker, and the popped values become the content of the container.  Therefore, the nesting
/// depth of the input is bounded by `max_stack_size`, not by the native stack.
#[derive(Debug)]
pub struct Decoder<S, E> {
    source: S,
    options: DecodeOptions,
    _phantom: PhantomData<E>,
}

#[derive(Debug)]
enum Frame {
    Value(Value),
    ListStart,
    DictionaryStart,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Mode {
    /// The entire input is exactly one value.
    Document,
    /// The input is a sequence of values; stop after the first one.
    Stream,
}

impl Frame {
    fn is_start(&self) -> bool {
        matches!(self, Self::ListStart | Self::DictionaryStart)
    }
}

impl<S, E> Decoder<S, E> {
    pub fn new(source: S) -> Self {
        Self::with_options(source, DecodeOptions::default())
    }

    pub fn with_options(source: S, options: DecodeOptions) -> Self {
        Self {
            source,
            options,
            _phantom: PhantomData,
        }
    }

    pub fn into_inner(self) -> S {
        self.source
    }
}

impl<S, E> Decoder<S, E>
where
    S: Source<E>,
    E: From<Error>,
{
    /// Decodes the rest of the input as exactly one value.
    pub fn decode(&mut self) -> Result<Value, E> {
        self.parse(Mode::Document)?.context(EofSnafu).map_err(E::from)
    }

    /// Decodes the next value, or returns `None` at a clean end of input.
    pub fn decode_next(&mut self) -> Result<Option<Value>, E> {
        self.parse(Mode::Stream)
    }

    fn parse(&mut self, mode: Mode) -> Result<Option<Value>, E> {
        let cancel = self.options.cancel.clone();
        let governor = Governor::new(self.options.max_stack_size, cancel.as_ref());
        let mut stack = Vec::new();
        while let Some(prefix) = self.source.peek_u8()? {
            governor.check(stack.len())?;
            let position = self.source.position();
            let frame = match prefix {
                b'0'..=b'9' => Frame::Value(Value::ByteString(self.read_byte_string()?)),
                b'i' => {
                    self.source.read_u8()?;
                    Frame::Value(Value::Integer(self.read_integer()?))
                }
                b'l' => {
                    self.source.read_u8()?;
                    Frame::ListStart
                }
                b'd' => {
                    self.source.read_u8()?;
                    Frame::DictionaryStart
                }
                b'e' => {
                    self.source.read_u8()?;
                    Frame::Value(self.close(&mut stack, position)?)
                }
                _ => return Err(Error::Prefix { prefix, position }.into()),
            };
            stack.push(frame);
            if mode == Mode::Stream && matches!(stack.as_slice(), [Frame::Value(_)]) {
                break;
            }
        }
        let value = self.finish(stack, mode)?;
        if value.is_some() {
            tracing::trace!(position = self.source.position(), "decode bencode value");
        }
        Ok(value)
    }

    /// Pops the stack down to the nearest container-start marker and assembles the container.
    fn close(&self, stack: &mut Vec<Frame>, position: usize) -> Result<Value, Error> {
        let start = stack
            .iter()
            .rposition(Frame::is_start)
            .context(UnexpectedEndSnafu { position })?;
        let is_list = matches!(stack[start], Frame::ListStart);
        let items = stack.drain(start + 1..).map(|frame| match frame {
            Frame::Value(value) => value,
            // `start` is the nearest marker.
            Frame::ListStart | Frame::DictionaryStart => std::unreachable!(),
        });
        let value = if is_list {
            Value::List(items.collect())
        } else {
            Value::Dictionary(dict::assemble(items, self.options.allow_unordered_keys)?)
        };
        stack.pop();
        Ok(value)
    }

    fn finish(&self, mut stack: Vec<Frame>, mode: Mode) -> Result<Option<Value>, Error> {
        if stack.iter().any(Frame::is_start) {
            // A stream that ends inside a container is truncated rather than malformed.
            return match mode {
                Mode::Document => UnterminatedSnafu.fail(),
                Mode::Stream => IncompleteSnafu.fail(),
            };
        }
        ensure!(
            stack.len() <= 1,
            TopLevelSnafu {
                num_values: stack.len(),
            },
        );
        let Some(Frame::Value(value)) = stack.pop() else {
            return Ok(None);
        };
        ensure!(
            self.options.allow_unwrapped_elements || value.is_container(),
            UnwrappedSnafu {
                type_name: value.type_name(),
            },
        );
        Ok(Some(value))
    }

    fn read_byte_string(&mut self) -> Result<Bytes, E> {
        let position = self.source.position();
        let length = self.read_literal(b':')?;
        let size = strict::parse_length(&length, position, self.options.max_byte_string_size)?;
        self.source.read_bytes(size)
    }

    fn read_integer(&mut self) -> Result<Integer, E> {
        let position = self.source.position();
        let literal = self.read_literal(b'e')?;
        Ok(strict::parse_integer(&literal, position)?)
    }

    /// Reads an integer literal up to `terminator`, which is consumed but not returned.
    ///
    /// It stops at the first byte that cannot be part of a literal, so that garbage input fails
    /// early rather than being buffered until a terminator shows up.
    fn read_literal(&mut self, terminator: u8) -> Result<Bytes, E> {
        let position = self.source.position();
        let mut literal = BytesMut::new();
        loop {
            match self.source.read_u8()? {
                byte if byte == terminator => return Ok(literal.freeze()),
                byte @ (b'-' | b'0'..=b'9') => literal.put_u8(byte),
                byte => {
                    literal.put_u8(byte);
                    return Err(Error::Integer {
                        integer: literal.freeze(),
                        position,
                    }
                    .into());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::BufReader;

    use crate::testing::{assert_matches, vb, vd, vi, vl};

    use super::*;

    fn decode(testdata: &[u8]) -> Result<Value, Error> {
        from_slice(testdata)
    }

    fn decode_with(testdata: &[u8], options: DecodeOptions) -> Result<Value, Error> {
        from_buf_with(testdata, options)
    }

    #[test]
    fn byte_string() {
        assert_eq!(decode(b"4:spam"), Ok(vb(b"spam")));
        assert_eq!(decode(b"0:"), Ok(vb(b"")));
        assert_eq!(decode(b"3:\x00\xffe"), Ok(vb(b"\x00\xffe")));
        assert_eq!(decode(b"10:0123456789"), Ok(vb(b"0123456789")));

        assert_eq!(decode(b"4:spa"), Err(Error::Incomplete));
        assert_eq!(decode(b"4"), Err(Error::Incomplete));
        assert_eq!(
            decode(b"04:spam"),
            Err(Error::Integer {
                integer: Bytes::from_static(b"04"),
                position: 0,
            }),
        );
        assert_eq!(
            decode(b"1-2:ab"),
            Err(Error::Integer {
                integer: Bytes::from_static(b"1-2"),
                position: 0,
            }),
        );
        assert_eq!(
            decode(b"4x:spam"),
            Err(Error::Integer {
                integer: Bytes::from_static(b"4x"),
                position: 0,
            }),
        );
        assert_matches!(
            decode(b"99999999999999999999999:"),
            Err(Error::ByteStringSizeExceeded { .. }),
        );
        assert_matches!(
            decode_with(
                b"5:spams",
                DecodeOptions {
                    max_byte_string_size: 4,
                    ..Default::default()
                },
            ),
            Err(Error::ByteStringSizeExceeded { limit: 4, .. }),
        );
        assert_eq!(
            decode_with(
                b"4:spam",
                DecodeOptions {
                    max_byte_string_size: 4,
                    ..Default::default()
                },
            ),
            Ok(vb(b"spam")),
        );
    }

    #[test]
    fn integer() {
        assert_eq!(decode(b"i42e"), Ok(vi(42)));
        assert_eq!(decode(b"i0e"), Ok(vi(0)));
        assert_eq!(decode(b"i-42e"), Ok(vi(-42)));
        assert_eq!(
            decode(b"i-123456789012345678901234567890e"),
            Ok(Value::Integer(
                "-123456789012345678901234567890".parse().unwrap(),
            )),
        );

        for (testdata, literal) in [
            (b"i-0e".as_slice(), b"-0".as_slice()),
            (b"i03e", b"03"),
            (b"i-03e", b"-03"),
            (b"ie", b""),
            (b"i-e", b"-"),
            (b"i1-e", b"1-"),
            (b"i--1e", b"--1"),
        ] {
            assert_eq!(
                decode(testdata),
                Err(Error::Integer {
                    integer: Bytes::copy_from_slice(literal),
                    position: 1,
                }),
            );
        }
        assert_eq!(
            decode(b"i1.5e"),
            Err(Error::Integer {
                integer: Bytes::from_static(b"1."),
                position: 1,
            }),
        );
        assert_eq!(decode(b"i42"), Err(Error::Incomplete));
    }

    #[test]
    fn list() {
        assert_eq!(decode(b"le"), Ok(vl([])));
        assert_eq!(
            decode(b"l4:spam4:eggse"),
            Ok(vl([vb(b"spam"), vb(b"eggs")])),
        );
        assert_eq!(
            decode(b"li1elli2eeed0:leee"),
            Ok(vl([vi(1), vl([vl([vi(2)])]), vd([(b"", vl([]))])])),
        );

        assert_eq!(decode(b"l"), Err(Error::Unterminated));
        assert_eq!(decode(b"li1e"), Err(Error::Unterminated));
        assert_eq!(decode(b"l4:spa"), Err(Error::Incomplete));
        assert_eq!(decode(b"e"), Err(Error::UnexpectedEnd { position: 0 }));
        assert_eq!(decode(b"lee"), Err(Error::UnexpectedEnd { position: 2 }));
    }

    #[test]
    fn dictionary() {
        assert_eq!(decode(b"de"), Ok(vd([])));
        assert_eq!(
            decode(b"d3:cow3:moo4:spam4:eggse"),
            Ok(vd([(b"cow", vb(b"moo")), (b"spam", vb(b"eggs"))])),
        );
        assert_eq!(
            decode(b"d1:ad1:bi1eee"),
            Ok(vd([(b"a", vd([(b"b", vi(1))]))])),
        );

        assert_eq!(
            decode(b"di1ei2ee"),
            Err(Error::KeyType {
                type_name: "integer",
            }),
        );
        assert_eq!(
            decode(b"d3:cowe"),
            Err(Error::MissingValue {
                key: Bytes::from_static(b"cow"),
            }),
        );
        assert_eq!(
            decode(b"d1:ai1e1:ai2ee"),
            Err(Error::StrictDictionaryKey {
                last_key: Bytes::from_static(b"a"),
                key: Bytes::from_static(b"a"),
            }),
        );
        assert_eq!(
            decode(b"d1:bi1e1:ae"),
            Err(Error::MissingValue {
                key: Bytes::from_static(b"a"),
            }),
        );
        assert_eq!(decode(b"d1:ai1e"), Err(Error::Unterminated));
    }

    #[test]
    fn unordered_keys() {
        let testdata = b"d4:spam4:eggs3:cow3:mooe";
        assert_eq!(
            decode(testdata),
            Err(Error::StrictDictionaryKey {
                last_key: Bytes::from_static(b"spam"),
                key: Bytes::from_static(b"cow"),
            }),
        );
        assert_eq!(
            decode_with(
                testdata,
                DecodeOptions {
                    allow_unordered_keys: true,
                    ..Default::default()
                },
            ),
            Ok(vd([(b"cow", vb(b"moo")), (b"spam", vb(b"eggs"))])),
        );
        assert_matches!(
            decode_with(
                b"d1:bi1e1:ai2e1:bi3ee",
                DecodeOptions {
                    allow_unordered_keys: true,
                    ..Default::default()
                },
            ),
            Err(Error::DuplicateKey { .. }),
        );
    }

    #[test]
    fn prefix() {
        assert_eq!(
            decode(b"x"),
            Err(Error::Prefix {
                prefix: b'x',
                position: 0,
            }),
        );
        assert_eq!(
            decode(b"l-1e"),
            Err(Error::Prefix {
                prefix: b'-',
                position: 1,
            }),
        );
    }

    #[test]
    fn top_level() {
        assert_eq!(decode(b""), Err(Error::Eof));
        assert_eq!(decode(b"i1ei2e"), Err(Error::TopLevel { num_values: 2 }));
        assert_eq!(decode(b"lei1e0:"), Err(Error::TopLevel { num_values: 3 }));
        // The trailing "defg" parses as an empty dictionary followed by an invalid prefix.
        assert_eq!(
            decode(b"3:abcdefg"),
            Err(Error::Prefix {
                prefix: b'f',
                position: 7,
            }),
        );
        assert_eq!(decode(b"3:abcde"), Err(Error::TopLevel { num_values: 2 }));
    }

    #[test]
    fn unwrapped_elements() {
        let options = DecodeOptions {
            allow_unwrapped_elements: false,
            ..Default::default()
        };
        assert_eq!(
            decode_with(b"4:spam", options.clone()),
            Err(Error::Unwrapped {
                type_name: "byte string",
            }),
        );
        assert_eq!(
            decode_with(b"i1e", options.clone()),
            Err(Error::Unwrapped {
                type_name: "integer",
            }),
        );
        assert_eq!(decode_with(b"li1ee", options.clone()), Ok(vl([vi(1)])));
        assert_eq!(decode_with(b"de", options.clone()), Ok(vd([])));
        assert_eq!(
            decode_with(b"lei1e", options),
            Err(Error::TopLevel { num_values: 2 }),
        );
    }

    fn nest(depth: usize) -> Vec<u8> {
        let mut testdata = vec![b'l'; depth];
        testdata.resize(depth * 2, b'e');
        testdata
    }

    #[test]
    fn max_stack_size() {
        fn options(max_stack_size: usize) -> DecodeOptions {
            DecodeOptions {
                max_stack_size,
                ..Default::default()
            }
        }

        for depth in [1, 2, 10, 100] {
            assert_matches!(decode_with(&nest(depth), options(depth)), Ok(_));
            assert_eq!(
                decode_with(&nest(depth + 1), options(depth)),
                Err(Error::DepthExceeded { limit: depth }),
            );
        }

        assert_eq!(decode_with(b"i1e", options(0)), Ok(vi(1)));
        assert_eq!(
            decode_with(b"le", options(0)),
            Err(Error::DepthExceeded { limit: 0 }),
        );

        // The stack also holds the items of open containers.
        assert_eq!(decode_with(b"li1ei2ee", options(3)), Ok(vl([vi(1), vi(2)])));
        assert_eq!(
            decode_with(b"li1ei2ei3ee", options(3)),
            Err(Error::DepthExceeded { limit: 3 }),
        );

        assert_matches!(decode(&nest(governor::DEFAULT_LIMIT)), Ok(_));
        assert_eq!(
            decode(&nest(governor::DEFAULT_LIMIT + 1)),
            Err(Error::DepthExceeded {
                limit: governor::DEFAULT_LIMIT,
            }),
        );
    }

    #[test]
    fn cancel() {
        let cancel = Cancel::new();
        let options = DecodeOptions {
            cancel: Some(cancel.clone()),
            ..Default::default()
        };
        assert_eq!(decode_with(b"le", options.clone()), Ok(vl([])));
        cancel.cancel();
        assert_eq!(decode_with(b"le", options), Err(Error::Cancelled));
    }

    /// Raises the cancellation flag once a given number of bytes have been consumed.
    struct CancelAfter<'a> {
        source: BufSource<&'a [u8]>,
        cancel: Cancel,
        num_bytes: usize,
    }

    impl CancelAfter<'_> {
        fn consume(&mut self, size: usize) {
            self.num_bytes = self.num_bytes.saturating_sub(size);
            if self.num_bytes == 0 {
                self.cancel.cancel();
            }
        }
    }

    impl Source<Error> for CancelAfter<'_> {
        fn peek_u8(&mut self) -> Result<Option<u8>, Error> {
            self.source.peek_u8()
        }

        fn read_u8(&mut self) -> Result<u8, Error> {
            let byte = self.source.read_u8()?;
            self.consume(1);
            Ok(byte)
        }

        fn read_bytes(&mut self, size: usize) -> Result<Bytes, Error> {
            let bytes = self.source.read_bytes(size)?;
            self.consume(size);
            Ok(bytes)
        }

        fn position(&self) -> usize {
            self.source.position()
        }
    }

    #[test]
    fn cancel_in_flight() {
        let cancel = Cancel::new();
        let source = CancelAfter {
            source: BufSource::new(b"li1ei2ei3ee".as_slice()),
            cancel: cancel.clone(),
            num_bytes: 4,
        };
        let options = DecodeOptions {
            cancel: Some(cancel.clone()),
            ..Default::default()
        };
        let mut decoder = Decoder::with_options(source, options);
        assert_eq!(decoder.decode(), Err(Error::Cancelled));
        assert!(cancel.is_cancelled());
        // It stops at the token boundary right after the flag is raised.
        assert_eq!(decoder.into_inner().source.into_inner(), b"i2ei3ee");
    }

    #[test]
    fn decode_next() {
        let mut decoder = Decoder::new(BufSource::new(b"i1e4:spamlei2".as_slice()));
        assert_eq!(decoder.decode_next(), Ok(Some(vi(1))));
        assert_eq!(decoder.decode_next(), Ok(Some(vb(b"spam"))));
        assert_eq!(decoder.decode_next(), Ok(Some(vl([]))));
        assert_eq!(decoder.decode_next(), Err(Error::Incomplete));

        let mut decoder = Decoder::new(BufSource::new(b"d1:ai1eel".as_slice()));
        assert_eq!(decoder.decode_next(), Ok(Some(vd([(b"a", vi(1))]))));
        assert_eq!(decoder.decode_next(), Err(Error::Incomplete));
        assert_eq!(decoder.decode_next(), Ok(None));

        let mut decoder = Decoder::new(BufSource::new(b"l4:spam".as_slice()));
        let error = decoder.decode_next().unwrap_err();
        assert_eq!(error, Error::Incomplete);
        assert!(error.is_incomplete());
        // A whole document is still reported as unterminated.
        assert_eq!(decode(b"l4:spam"), Err(Error::Unterminated));
    }

    #[test]
    fn from_reader() {
        let mut reader = BufReader::new(b"i1ed1:ai2ee".as_slice());
        assert_matches!(super::from_reader(&mut reader), Ok(Some(value)) if value == vi(1));
        assert_matches!(
            super::from_reader(&mut reader),
            Ok(Some(value)) if value == vd([(b"a", vi(2))]),
        );
        assert_matches!(super::from_reader(&mut reader), Ok(None));

        assert_matches!(
            super::from_reader(b"l4:spa".as_slice()),
            Err(IoError::Bencode {
                source: Error::Incomplete,
            }),
        );
        assert_matches!(
            super::from_reader(b"l4:spam".as_slice()),
            Err(error) if error.is_incomplete(),
        );
        assert_matches!(
            super::from_reader(b"i03e".as_slice()),
            Err(IoError::Bencode {
                source: Error::Integer { .. },
            }),
        );
    }

    #[test]
    fn position() {
        let mut decoder = Decoder::new(BufSource::new(b"l4:spame i1e".as_slice()));
        assert_eq!(decoder.decode_next(), Ok(Some(vl([vb(b"spam")]))));
        assert_eq!(decoder.into_inner().into_inner(), b" i1e");
    }
}
