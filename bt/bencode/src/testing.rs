use std::collections::BTreeMap;

use bytes::Bytes;

use crate::value::Value;

pub(crate) fn vb(bytes: &[u8]) -> Value {
    Value::ByteString(Bytes::copy_from_slice(bytes))
}

pub(crate) fn vi(integer: i64) -> Value {
    Value::Integer(integer.into())
}

pub(crate) fn vl<const N: usize>(items: [Value; N]) -> Value {
    Value::List(items.into())
}

pub(crate) fn vd<const N: usize>(items: [(&[u8], Value); N]) -> Value {
    Value::Dictionary(
        items
            .into_iter()
            .map(|(key, value)| (Bytes::copy_from_slice(key), value))
            .collect::<BTreeMap<_, _>>(),
    )
}

/// Stable stand-in for `std::assert_matches::assert_matches`.
macro_rules! assert_matches {
    ($value:expr, $($pattern:pat_param)|+ $(if $guard:expr)? $(,)?) => {
        match $value {
            $($pattern)|+ $(if $guard)? => {}
            ref value => std::panic!(
                "assertion failed: `{:?}` does not match `{}`",
                value,
                std::stringify!($($pattern)|+ $(if $guard)?),
            ),
        }
    };
}

pub(crate) use assert_matches;
