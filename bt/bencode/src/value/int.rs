use std::any;

use crate::error::Error;

use super::Value;

// Narrows an arbitrary-precision integer into a fixed-width one.  The storage type stays
// `Integer`; this is only a convenience for consumers that know the expected range.
macro_rules! impl_try_from_value {
    ($($int:ty),* $(,)?) => {
        $(
            impl TryFrom<&Value> for $int {
                type Error = Error;

                fn try_from(value: &Value) -> Result<Self, Self::Error> {
                    let integer = value.as_integer().ok_or_else(|| Error::ValueType {
                        expect: "integer",
                        type_name: value.type_name(),
                    })?;
                    <$int>::try_from(integer).map_err(|_| Error::IntegerOverflow {
                        int_type_name: any::type_name::<$int>(),
                        integer: integer.clone(),
                    })
                }
            }
        )*
    };
}

impl_try_from_value!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);
