use std::borrow::Cow;

use crate::value::{Integer, Value};

/// Node of a value graph that the encoder can walk.
///
/// The encoder asks one node at a time for its shape, so an implementation only describes its
/// immediate children and never recurses itself.
pub trait Encode {
    fn shape(&self) -> Shape<'_, Self>;
}

pub enum Shape<'a, T: ?Sized> {
    Null,
    ByteString(&'a [u8]),
    Integer(Cow<'a, Integer>),
    List(Vec<&'a T>),
    Dictionary {
        entries: Vec<(Option<&'a [u8]>, &'a T)>,
        /// Whether `entries` are already in strictly ascending key order.  The encoder trusts this
        /// flag and sorts the entries itself only when it is false.
        sorted: bool,
    },
    Unsupported {
        type_name: &'static str,
    },
}

impl Encode for Value {
    fn shape(&self) -> Shape<'_, Self> {
        match self {
            Self::ByteString(bytes) => Shape::ByteString(bytes),
            Self::Integer(integer) => Shape::Integer(Cow::Borrowed(integer)),
            Self::List(list) => Shape::List(list.iter().collect()),
            Self::Dictionary(dict) => Shape::Dictionary {
                entries: dict.iter().map(|(k, v)| (Some(k.as_ref()), v)).collect(),
                sorted: true,
            },
        }
    }
}
