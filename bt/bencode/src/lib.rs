pub mod error;
pub mod value;

mod de;
mod governor;
mod json;
mod ser;

#[cfg(test)]
mod testing;

//
// Implementer's Notes:
//
// * Bencode is specified in BEP 3.
//
// * Neither engine recurses.  The decoder keeps an operand stack of values and container-open
//   markers, and the encoder keeps a work stack of nodes and container-close markers.  Both are
//   bounded by a governor, so hostile input costs at most a configured amount of memory.
//
// * The decoder is strict: integers must be canonical, and dictionary keys must be byte strings
//   in strictly ascending order.  The encoder only produces canonical output, so re-encoding a
//   decoded value reproduces the input bytes.
//
// * We divided the interface into pure-memory and I/O functions, which resulted in one error type
//   for each group of functions.
//

pub use crate::de::read::{BufSource, ReaderSource, Source};
pub use crate::de::{
    DEFAULT_MAX_BYTE_STRING_SIZE, DecodeOptions, Decoder, from_buf, from_buf_with, from_reader,
    from_reader_with, from_slice,
};
pub use crate::governor::{Cancel, DEFAULT_LIMIT};
pub use crate::ser::encode::{Encode, Shape};
pub use crate::ser::write::Sink;
pub use crate::ser::{
    EncodeOptions, Encoder, to_buf, to_buf_with, to_bytes, to_bytes_with, to_writer,
    to_writer_with,
};

pub use crate::value::Value;

pub use crate::json::{Json, to_writer as to_json_writer};
