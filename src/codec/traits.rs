//! Value model: how Rust types map onto encoder writes and decoder reads.
//!
//! | Rust type                          | Schema                |
//! |------------------------------------|-----------------------|
//! | `()`                               | `null`                |
//! | `bool`                             | `boolean`             |
//! | `i32` / `i64`                      | `int` / `long`        |
//! | `f32` / `f64`                      | `float` / `double`    |
//! | `Bytes`                            | `bytes`               |
//! | `String`, `str`                    | `string`              |
//! | `[u8; N]`                          | `fixed` of size `N`   |
//! | `Option<T>`                        | union `["null", T]`   |
//! | `Vec<T>`, `[T]`                    | `array`               |
//! | `HashMap` / `BTreeMap<String, V>`  | `map`                 |
//! | `(A, B, ...)`                      | `record`              |
//!
//! Named records implement the traits by hand, writing fields in declared
//! order.

use std::collections::{BTreeMap, HashMap};
use std::hash::BuildHasher;

use bytes::Bytes;

use super::decoder::Decoder;
use super::encoder::Encoder;
use crate::error::{AvroError, Result};

/// A value that can be written to an [`Encoder`].
pub trait Encode {
    fn encode(&self, encoder: &mut dyn Encoder) -> Result<()>;
}

/// A value that can be read from a [`Decoder`].
pub trait Decode: Sized {
    fn decode(decoder: &mut dyn Decoder) -> Result<Self>;
}

impl<T: Encode + ?Sized> Encode for &T {
    fn encode(&self, encoder: &mut dyn Encoder) -> Result<()> {
        (**self).encode(encoder)
    }
}

impl<T: Encode + ?Sized> Encode for Box<T> {
    fn encode(&self, encoder: &mut dyn Encoder) -> Result<()> {
        (**self).encode(encoder)
    }
}

impl<T: Decode> Decode for Box<T> {
    fn decode(decoder: &mut dyn Decoder) -> Result<Self> {
        T::decode(decoder).map(Box::new)
    }
}

macro_rules! primitive {
    ($ty:ty, $encode:ident, $decode:ident) => {
        impl Encode for $ty {
            fn encode(&self, encoder: &mut dyn Encoder) -> Result<()> {
                encoder.$encode(*self)
            }
        }

        impl Decode for $ty {
            fn decode(decoder: &mut dyn Decoder) -> Result<Self> {
                decoder.$decode()
            }
        }
    };
}

primitive!(bool, encode_bool, decode_bool);
primitive!(i32, encode_int, decode_int);
primitive!(i64, encode_long, decode_long);
primitive!(f32, encode_float, decode_float);
primitive!(f64, encode_double, decode_double);

impl Encode for () {
    fn encode(&self, encoder: &mut dyn Encoder) -> Result<()> {
        encoder.encode_null()
    }
}

impl Decode for () {
    fn decode(decoder: &mut dyn Decoder) -> Result<Self> {
        decoder.decode_null()
    }
}

impl Encode for str {
    fn encode(&self, encoder: &mut dyn Encoder) -> Result<()> {
        encoder.encode_string(self)
    }
}

impl Encode for String {
    fn encode(&self, encoder: &mut dyn Encoder) -> Result<()> {
        encoder.encode_string(self)
    }
}

impl Decode for String {
    fn decode(decoder: &mut dyn Decoder) -> Result<Self> {
        decoder.decode_string()
    }
}

impl Encode for Bytes {
    fn encode(&self, encoder: &mut dyn Encoder) -> Result<()> {
        encoder.encode_bytes(self)
    }
}

impl Decode for Bytes {
    fn decode(decoder: &mut dyn Decoder) -> Result<Self> {
        decoder.decode_bytes().map(Bytes::from)
    }
}

impl<const N: usize> Encode for [u8; N] {
    fn encode(&self, encoder: &mut dyn Encoder) -> Result<()> {
        encoder.encode_fixed(self)
    }
}

impl<const N: usize> Decode for [u8; N] {
    fn decode(decoder: &mut dyn Decoder) -> Result<Self> {
        let data = decoder.decode_fixed(N)?;
        data.try_into().map_err(|data: Vec<u8>| {
            AvroError::SchemaMismatch(format!("expected {} fixed bytes, got {}", N, data.len()))
        })
    }
}

// Tuples are records with positional fields.
macro_rules! tuple {
    ($($name:ident),+) => {
        impl<$($name: Encode),+> Encode for ($($name,)+) {
            #[allow(non_snake_case)]
            fn encode(&self, encoder: &mut dyn Encoder) -> Result<()> {
                let ($($name,)+) = self;
                $($name.encode(encoder)?;)+
                Ok(())
            }
        }

        impl<$($name: Decode),+> Decode for ($($name,)+) {
            fn decode(decoder: &mut dyn Decoder) -> Result<Self> {
                Ok(($($name::decode(decoder)?,)+))
            }
        }
    };
}

tuple!(A, B);
tuple!(A, B, C);
tuple!(A, B, C, D);
tuple!(A, B, C, D, E);

impl<T: Encode> Encode for Option<T> {
    fn encode(&self, encoder: &mut dyn Encoder) -> Result<()> {
        match self {
            None => {
                encoder.encode_union_index(0)?;
                encoder.encode_null()
            }
            Some(value) => {
                encoder.encode_union_index(1)?;
                value.encode(encoder)
            }
        }
    }
}

impl<T: Decode> Decode for Option<T> {
    fn decode(decoder: &mut dyn Decoder) -> Result<Self> {
        match decoder.decode_union_index()? {
            0 => decoder.decode_null().map(|_| None),
            1 => T::decode(decoder).map(Some),
            other => Err(AvroError::SchemaMismatch(format!(
                "optional value has no union branch {}",
                other
            ))),
        }
    }
}

impl<T: Encode> Encode for [T] {
    fn encode(&self, encoder: &mut dyn Encoder) -> Result<()> {
        encoder.array_start()?;
        encoder.set_item_count(self.len())?;
        for item in self {
            encoder.start_item()?;
            item.encode(encoder)?;
        }
        encoder.array_end()
    }
}

impl<T: Encode> Encode for Vec<T> {
    fn encode(&self, encoder: &mut dyn Encoder) -> Result<()> {
        self.as_slice().encode(encoder)
    }
}

impl<T: Decode> Decode for Vec<T> {
    fn decode(decoder: &mut dyn Decoder) -> Result<Self> {
        let mut items = Vec::new();
        let mut count = decoder.array_start()?;
        while count > 0 {
            // Cap the reservation; the count comes from untrusted input
            items.reserve(count.min(1024));
            decode_block(decoder, count, |decoder| {
                items.push(T::decode(decoder)?);
                Ok(())
            })?;
            count = decoder.array_next()?;
        }
        Ok(items)
    }
}

/// Largest block accepted when its items read no input at all.
pub const MAX_EMPTY_ITEMS: usize = 1 << 16;

/// Run `item` for each of the `count` items of one block.
///
/// A block of more than [`MAX_EMPTY_ITEMS`] items whose first item consumed
/// no input fails with [`AvroError::SchemaMismatch`].
pub(crate) fn decode_block(
    decoder: &mut dyn Decoder,
    count: usize,
    mut item: impl FnMut(&mut dyn Decoder) -> Result<()>,
) -> Result<()> {
    for i in 0..count {
        let before = decoder.bytes_remaining();
        item(&mut *decoder)?;
        if i == 0 && count > MAX_EMPTY_ITEMS && decoder.bytes_remaining() == before {
            return Err(AvroError::SchemaMismatch(format!(
                "block of {} items that read no input",
                count
            )));
        }
    }
    Ok(())
}

/// Write map entries as a single block.
pub(crate) fn encode_entries<'v, V, I>(
    encoder: &mut dyn Encoder,
    len: usize,
    entries: I,
) -> Result<()>
where
    V: Encode + 'v,
    I: IntoIterator<Item = (&'v String, &'v V)>,
{
    encoder.map_start()?;
    encoder.set_item_count(len)?;
    for (key, value) in entries {
        encoder.start_item()?;
        encoder.encode_string(key)?;
        value.encode(encoder)?;
    }
    encoder.map_end()
}

/// Read map entries block by block, handing each pair to `insert`.
pub(crate) fn decode_entries<V: Decode>(
    decoder: &mut dyn Decoder,
    mut insert: impl FnMut(String, V),
) -> Result<()> {
    let mut count = decoder.map_start()?;
    while count > 0 {
        for _ in 0..count {
            let key = decoder.decode_string()?;
            let value = V::decode(decoder)?;
            insert(key, value);
        }
        count = decoder.map_next()?;
    }
    Ok(())
}

impl<V: Encode, S> Encode for HashMap<String, V, S> {
    fn encode(&self, encoder: &mut dyn Encoder) -> Result<()> {
        encode_entries(encoder, self.len(), self)
    }
}

impl<V: Decode, S: BuildHasher + Default> Decode for HashMap<String, V, S> {
    fn decode(decoder: &mut dyn Decoder) -> Result<Self> {
        let mut map = HashMap::default();
        decode_entries(decoder, |k, v| {
            map.insert(k, v);
        })?;
        Ok(map)
    }
}

impl<V: Encode> Encode for BTreeMap<String, V> {
    fn encode(&self, encoder: &mut dyn Encoder) -> Result<()> {
        encode_entries(encoder, self.len(), self)
    }
}

impl<V: Decode> Decode for BTreeMap<String, V> {
    fn decode(decoder: &mut dyn Decoder) -> Result<Self> {
        let mut map = BTreeMap::new();
        decode_entries(decoder, |k, v| {
            map.insert(k, v);
        })?;
        Ok(map)
    }
}
