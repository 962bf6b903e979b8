pub mod io;

use bytes::Bytes;
use snafu::prelude::*;

use crate::value::Integer;

#[derive(Clone, Debug, Eq, PartialEq, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    //
    // Decode errors.
    //

    // `Eof` (empty input) is a special case of `Incomplete` (partial input).  Streaming callers
    // rely on the distinction to tell a clean end of stream from a truncated value.
    #[snafu(display("end of file"))]
    Eof,
    #[snafu(display("incomplete bencode data"))]
    Incomplete,

    #[snafu(display("unknown prefix character at {position}: '{}'", prefix.escape_ascii()))]
    Prefix { prefix: u8, position: usize },

    #[snafu(display("invalid integer at {position}: {integer:?}"))]
    Integer { integer: Bytes, position: usize },

    #[snafu(display("byte string size limit exceeded at {position}: {size:?} > {limit}"))]
    ByteStringSizeExceeded {
        size: Bytes,
        limit: usize,
        position: usize,
    },

    #[snafu(display("unexpected end of container at {position}"))]
    UnexpectedEnd { position: usize },
    #[snafu(display("unterminated container"))]
    Unterminated,

    #[snafu(display("expect byte string dictionary key: {type_name}"))]
    KeyType { type_name: &'static str },
    #[snafu(display("missing dictionary value: {key:?}"))]
    MissingValue { key: Bytes },
    #[snafu(display("duplicate dictionary key: {key:?}"))]
    DuplicateKey { key: Bytes },
    #[snafu(display("expect strictly increasing dictionary keys: {last_key:?} >= {key:?}"))]
    StrictDictionaryKey { last_key: Bytes, key: Bytes },

    #[snafu(display("expect exactly one top-level value: {num_values}"))]
    TopLevel { num_values: usize },
    #[snafu(display("expect top-level list or dictionary: {type_name}"))]
    Unwrapped { type_name: &'static str },

    //
    // Encode errors.
    //
    #[snafu(display("unsupported value type: {type_name}"))]
    Unsupported { type_name: &'static str },
    #[snafu(display("null list element"))]
    NullElement,
    #[snafu(display("null dictionary key"))]
    NullKey,
    #[snafu(display("null dictionary value: {key:?}"))]
    NullValue { key: Bytes },

    //
    // Errors shared by both directions.
    //
    #[snafu(display("nesting limit exceeded: {limit}"))]
    DepthExceeded { limit: usize },
    #[snafu(display("cancelled"))]
    Cancelled,

    //
    // `Value` conversion errors.
    //
    #[snafu(display("expect {expect}: {type_name}"))]
    ValueType {
        expect: &'static str,
        type_name: &'static str,
    },
    #[snafu(display("{int_type_name} overflow: {integer}"))]
    IntegerOverflow {
        int_type_name: &'static str,
        integer: Integer,
    },
}

impl Error {
    /// True if the error is caused by the input ending too early rather than by malformed input.
    pub fn is_incomplete(&self) -> bool {
        matches!(self, Self::Eof | Self::Incomplete)
    }
}
