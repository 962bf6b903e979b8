use bytes::Bytes;
use snafu::prelude::*;

use crate::error::{DuplicateKeySnafu, Error, MissingValueSnafu};
use crate::value::{Dictionary, Value};

use super::strict;

/// Assembles a dictionary from the alternating key/value items collected between `d` and `e`.
pub(super) fn assemble<I>(items: I, allow_unordered_keys: bool) -> Result<Dictionary, Error>
where
    I: IntoIterator<Item = Value>,
{
    let mut items: Vec<Value> = items.into_iter().collect();
    if items.len() % 2 == 1 {
        if let Some(key) = items.pop() {
            return Err(match Bytes::try_from(key) {
                Ok(key) => MissingValueSnafu { key }.build(),
                Err(key) => Error::KeyType {
                    type_name: key.type_name(),
                },
            });
        }
    }

    let mut dict = Dictionary::new();
    let mut last_key: Option<Bytes> = None;
    let mut items = items.into_iter();
    while let (Some(key), Some(value)) = (items.next(), items.next()) {
        let key = Bytes::try_from(key).map_err(|key| Error::KeyType {
            type_name: key.type_name(),
        })?;
        if !allow_unordered_keys {
            if let Some(last_key) = last_key.as_ref() {
                strict::ensure_dictionary_key(last_key, &key)?;
            }
        }
        ensure!(!dict.contains_key(&key), DuplicateKeySnafu { key });
        last_key = Some(key.clone());
        dict.insert(key, value);
    }
    Ok(dict)
}
