mod int;

use std::collections::BTreeMap;
use std::fmt;
use std::mem;
use std::str;

use bytes::Bytes;
use num_bigint::BigInt;

/// Bencode Value
///
/// `Value` trees may be nested far deeper than the native call stack allows.  Dropping and
/// comparing values are therefore implemented without recursion.  `Clone` and `Debug` are still
/// recursive; do not use them on adversarially deep values.
#[derive(Clone)]
pub enum Value {
    ByteString(ByteString),
    Integer(Integer),
    List(List),
    Dictionary(Dictionary),
}

pub type ByteString = Bytes;

// BEP 3 specifies integers as having unlimited precision.
pub type Integer = BigInt;

pub type List = Vec<Value>;

// Use `BTreeMap` because BEP 3 requires dictionary keys to be sorted.
pub type Dictionary = BTreeMap<ByteString, Value>;

impl Drop for Value {
    fn drop(&mut self) {
        let mut values = Vec::new();
        self.take_children(&mut values);
        // Each popped value is dropped with no children left, so this never recurses more than
        // one level deep.
        while let Some(mut value) = values.pop() {
            value.take_children(&mut values);
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        let mut pairs = vec![(self, other)];
        while let Some(pair) = pairs.pop() {
            match pair {
                (Self::ByteString(lhs), Self::ByteString(rhs)) => {
                    if lhs != rhs {
                        return false;
                    }
                }
                (Self::Integer(lhs), Self::Integer(rhs)) => {
                    if lhs != rhs {
                        return false;
                    }
                }
                (Self::List(lhs), Self::List(rhs)) => {
                    if lhs.len() != rhs.len() {
                        return false;
                    }
                    pairs.extend(lhs.iter().zip(rhs));
                }
                (Self::Dictionary(lhs), Self::Dictionary(rhs)) => {
                    if lhs.len() != rhs.len() {
                        return false;
                    }
                    for ((lhs_key, lhs_value), (rhs_key, rhs_value)) in lhs.iter().zip(rhs) {
                        if lhs_key != rhs_key {
                            return false;
                        }
                        pairs.push((lhs_value, rhs_value));
                    }
                }
                _ => return false,
            }
        }
        true
    }
}

impl Eq for Value {}

/// Escapes non-ASCII bytes to produce `fmt::Debug` output.
pub(crate) struct EscapeAscii<'a>(pub(crate) &'a [u8]);

impl fmt::Debug for EscapeAscii<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        std::write!(f, "\"{}\"", self.0.escape_ascii())
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ByteString(bytes) => f
                .debug_tuple("ByteString")
                .field(&EscapeAscii(bytes))
                .finish(),
            Self::Integer(integer) => f.debug_tuple("Integer").field(integer).finish(),
            Self::List(list) => f.debug_tuple("List").field(list).finish(),
            Self::Dictionary(dict) => f
                .debug_tuple("Dictionary")
                .field(&DebugDictionary(dict))
                .finish(),
        }
    }
}

struct DebugDictionary<'a>(&'a Dictionary);

impl fmt::Debug for DebugDictionary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.0.iter().map(|(k, v)| (EscapeAscii(k), v)))
            .finish()
    }
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::ByteString(_) => "byte string",
            Self::Integer(_) => "integer",
            Self::List(_) => "list",
            Self::Dictionary(_) => "dictionary",
        }
    }

    pub fn is_container(&self) -> bool {
        matches!(self, Self::List(_) | Self::Dictionary(_))
    }

    pub fn as_byte_string(&self) -> Option<&[u8]> {
        match self {
            Self::ByteString(bytes) => Some(bytes),
            _ => None,
        }
    }

    pub fn as_byte_string_mut(&mut self) -> Option<&mut ByteString> {
        match self {
            Self::ByteString(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// Returns the byte string as text when it is UTF-8 encoded.
    pub fn as_str(&self) -> Option<&str> {
        self.as_byte_string()
            .and_then(|bytes| str::from_utf8(bytes).ok())
    }

    pub fn as_integer(&self) -> Option<&Integer> {
        match self {
            Self::Integer(integer) => Some(integer),
            _ => None,
        }
    }

    pub fn as_integer_mut(&mut self) -> Option<&mut Integer> {
        match self {
            Self::Integer(integer) => Some(integer),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Self]> {
        match self {
            Self::List(list) => Some(list),
            _ => None,
        }
    }

    pub fn as_list_mut(&mut self) -> Option<&mut List> {
        match self {
            Self::List(list) => Some(list),
            _ => None,
        }
    }

    pub fn as_dictionary(&self) -> Option<&Dictionary> {
        match self {
            Self::Dictionary(dict) => Some(dict),
            _ => None,
        }
    }

    pub fn as_dictionary_mut(&mut self) -> Option<&mut Dictionary> {
        match self {
            Self::Dictionary(dict) => Some(dict),
            _ => None,
        }
    }

    fn take_children(&mut self, values: &mut Vec<Value>) {
        match self {
            Self::List(list) => values.append(list),
            Self::Dictionary(dict) => values.extend(mem::take(dict).into_values()),
            Self::ByteString(_) | Self::Integer(_) => {}
        }
    }
}

//
// `Value` implements `Drop`, so we cannot move a variant's content out by pattern matching.  We
// take it with `mem::take` instead and let the emptied `Value` drop.
//

impl TryFrom<Value> for ByteString {
    type Error = Value;

    fn try_from(mut value: Value) -> Result<Self, Self::Error> {
        match &mut value {
            Value::ByteString(bytes) => Ok(mem::take(bytes)),
            _ => Err(value),
        }
    }
}

impl TryFrom<Value> for Integer {
    type Error = Value;

    fn try_from(mut value: Value) -> Result<Self, Self::Error> {
        match &mut value {
            Value::Integer(integer) => Ok(mem::take(integer)),
            _ => Err(value),
        }
    }
}

impl TryFrom<Value> for List {
    type Error = Value;

    fn try_from(mut value: Value) -> Result<Self, Self::Error> {
        match &mut value {
            Value::List(list) => Ok(mem::take(list)),
            _ => Err(value),
        }
    }
}

impl TryFrom<Value> for Dictionary {
    type Error = Value;

    fn try_from(mut value: Value) -> Result<Self, Self::Error> {
        match &mut value {
            Value::Dictionary(dict) => Ok(mem::take(dict)),
            _ => Err(value),
        }
    }
}

impl From<ByteString> for Value {
    fn from(bytes: ByteString) -> Self {
        Self::ByteString(bytes)
    }
}

impl From<&[u8]> for Value {
    fn from(bytes: &[u8]) -> Self {
        Self::ByteString(Bytes::copy_from_slice(bytes))
    }
}

impl From<Vec<u8>> for Value {
    fn from(bytes: Vec<u8>) -> Self {
        Self::ByteString(bytes.into())
    }
}

impl From<&str> for Value {
    fn from(string: &str) -> Self {
        string.as_bytes().into()
    }
}

impl From<String> for Value {
    fn from(string: String) -> Self {
        string.into_bytes().into()
    }
}

impl From<Integer> for Value {
    fn from(integer: Integer) -> Self {
        Self::Integer(integer)
    }
}

impl From<i64> for Value {
    fn from(integer: i64) -> Self {
        Self::Integer(integer.into())
    }
}

impl From<u64> for Value {
    fn from(integer: u64) -> Self {
        Self::Integer(integer.into())
    }
}

impl From<List> for Value {
    fn from(list: List) -> Self {
        Self::List(list)
    }
}

impl From<Dictionary> for Value {
    fn from(dict: Dictionary) -> Self {
        Self::Dictionary(dict)
    }
}
