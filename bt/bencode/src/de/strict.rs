use std::str;

use bytes::Bytes;
use num_bigint::BigInt;
use snafu::prelude::*;

use crate::error::{ByteStringSizeExceededSnafu, Error, IntegerSnafu, StrictDictionaryKeySnafu};
use crate::value::Integer;

// Only `0` may start with a zero, and there is no negative zero.
fn is_strict_integer(literal: &[u8]) -> bool {
    lazy_regex::regex_is_match!(r#"(?x-u) ^ (?: 0 | -? [1-9] \d* ) $ "#B, literal)
}

fn is_strict_length(literal: &[u8]) -> bool {
    lazy_regex::regex_is_match!(r#"(?x-u) ^ (?: 0 | [1-9] \d* ) $ "#B, literal)
}

pub(super) fn parse_integer(literal: &[u8], position: usize) -> Result<Integer, Error> {
    let context = || IntegerSnafu {
        integer: Bytes::copy_from_slice(literal),
        position,
    };
    ensure!(is_strict_integer(literal), context());
    BigInt::parse_bytes(literal, 10).with_context(context)
}

pub(super) fn parse_length(literal: &[u8], position: usize, limit: usize) -> Result<usize, Error> {
    ensure!(
        is_strict_length(literal),
        IntegerSnafu {
            integer: Bytes::copy_from_slice(literal),
            position,
        },
    );
    // A literal too long for `usize` is necessarily over the limit.
    let size = str::from_utf8(literal)
        .ok()
        .and_then(|literal| literal.parse::<usize>().ok())
        .filter(|size| *size <= limit);
    size.context(ByteStringSizeExceededSnafu {
        size: Bytes::copy_from_slice(literal),
        limit,
        position,
    })
}

pub(super) fn ensure_dictionary_key(last_key: &Bytes, key: &Bytes) -> Result<(), Error> {
    ensure!(
        last_key < key,
        StrictDictionaryKeySnafu {
            last_key: last_key.clone(),
            key: key.clone(),
        },
    );
    Ok(())
}
