use std::borrow::Cow;
use std::io::Write;

use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};
use serde_json::Value as JsonValue;

use crate::ser::encode::{Encode, Shape};
use crate::value::{Integer, Value};

//
// TODO: Escaping binary data makes it difficult to convert the result back to Bencode.  How can
// we represent binary data in JSON that is also convertible?
//

/// Adapter that converts byte strings to UTF-8 strings right before sending them to `serde_json`.
///
/// ```
/// # use bt_bencode::{Json, Value};
/// let bencode = Value::from(0i64);
/// assert_eq!(serde_json::to_value(Json(&bencode)).unwrap(), serde_json::json!(0));
/// ```
///
/// Note that when a byte string is not UTF-8 encoded, it produces an escaped string instead of
/// returning an error.  An integer outside the 64-bit range is produced as a decimal string.
///
/// Serialization through `serde` recurses, and a very deeply nested value may exhaust the stack.
/// Use [`to_writer`] for values of unknown depth.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Json<V>(pub V);

impl Serialize for Json<&Value> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self.0 {
            Value::ByteString(bytes) => SerializeBytes(bytes).serialize(serializer),
            Value::Integer(integer) => SerializeInteger(integer).serialize(serializer),
            Value::List(list) => {
                let mut seq = serializer.serialize_seq(Some(list.len()))?;
                for element in list {
                    seq.serialize_element(&Json(element))?;
                }
                seq.end()
            }
            Value::Dictionary(dict) => {
                let mut map = serializer.serialize_map(Some(dict.len()))?;
                for (k, v) in dict {
                    map.serialize_entry(&SerializeBytes(k), &Json(v))?;
                }
                map.end()
            }
        }
    }
}

struct SerializeInteger<'a>(&'a Integer);

impl Serialize for SerializeInteger<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if let Ok(integer) = i64::try_from(self.0) {
            serializer.serialize_i64(integer)
        } else if let Ok(integer) = u64::try_from(self.0) {
            serializer.serialize_u64(integer)
        } else {
            serializer.collect_str(self.0)
        }
    }
}

struct SerializeBytes<'a>(&'a [u8]);

impl Serialize for SerializeBytes<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match str::from_utf8(self.0) {
            Ok(string) => serializer.serialize_str(string),
            Err(_) => serializer.collect_str(&self.0.escape_ascii()),
        }
    }
}

enum Item<'a> {
    Value(&'a Value),
    Key(&'a [u8]),
    Punct(&'static [u8]),
}

/// Writes `value` as compact JSON, producing the same output as serializing `Json(value)`.
///
/// Unlike the `serde` path, it walks the value with a work stack, so it handles any value that
/// the decoder can produce.
pub fn to_writer<W>(mut writer: W, value: &Value) -> Result<(), serde_json::Error>
where
    W: Write,
{
    let mut stack = vec![Item::Value(value)];
    while let Some(item) = stack.pop() {
        match item {
            Item::Value(Value::ByteString(bytes)) => {
                serde_json::to_writer(&mut writer, &SerializeBytes(bytes))?;
            }
            Item::Key(key) => serde_json::to_writer(&mut writer, &SerializeBytes(key))?,
            Item::Value(Value::Integer(integer)) => {
                serde_json::to_writer(&mut writer, &SerializeInteger(integer))?;
            }
            Item::Value(Value::List(list)) => {
                writer.write_all(b"[").map_err(serde_json::Error::io)?;
                stack.push(Item::Punct(b"]"));
                for (i, element) in list.iter().enumerate().rev() {
                    stack.push(Item::Value(element));
                    if i > 0 {
                        stack.push(Item::Punct(b","));
                    }
                }
            }
            Item::Value(Value::Dictionary(dict)) => {
                writer.write_all(b"{").map_err(serde_json::Error::io)?;
                stack.push(Item::Punct(b"}"));
                for (i, (key, value)) in dict.iter().enumerate().rev() {
                    stack.push(Item::Value(value));
                    stack.push(Item::Punct(b":"));
                    stack.push(Item::Key(&key[..]));
                    if i > 0 {
                        stack.push(Item::Punct(b","));
                    }
                }
            }
            Item::Punct(punct) => writer.write_all(punct).map_err(serde_json::Error::io)?,
        }
    }
    Ok(())
}

/// Encodes JSON documents as Bencode.
///
/// Strings become byte strings, integral numbers become integers, and objects become
/// dictionaries.  `null` is rejected where it appears, and so are booleans and fractional numbers.
impl Encode for JsonValue {
    fn shape(&self) -> Shape<'_, Self> {
        match self {
            Self::Null => Shape::Null,
            Self::Bool(_) => Shape::Unsupported { type_name: "bool" },
            Self::Number(number) => {
                if let Some(integer) = number.as_i64() {
                    Shape::Integer(Cow::Owned(integer.into()))
                } else if let Some(integer) = number.as_u64() {
                    Shape::Integer(Cow::Owned(integer.into()))
                } else {
                    Shape::Unsupported { type_name: "float" }
                }
            }
            Self::String(string) => Shape::ByteString(string.as_bytes()),
            Self::Array(array) => Shape::List(array.iter().collect()),
            // Do not rely on the map order; `preserve_order` may be enabled elsewhere in the build.
            Self::Object(object) => Shape::Dictionary {
                entries: object
                    .iter()
                    .map(|(k, v)| (Some(k.as_bytes()), v))
                    .collect(),
                sorted: false,
            },
        }
    }
}
