//! Lenient coercion deserializer
//!
//! Reads a `serde_json::Value` the way payload validation usually wants it read:
//! numeric strings become numbers, integral floats become integers, and common
//! boolean spellings become booleans. Strings are never produced from numbers.
//! Maps and sequences are walked recursively so nested fields coerce too.
//!
//! Anything the lenient rules do not cover is handed to `serde_json`'s own
//! deserializer, which also produces the error messages.
//!
//! Structs read named fields only: a sequence never fills a struct by position.
//!
//! Coercion is driven by the type being deserialized. Types that buffer their
//! input through `deserialize_any` before deciding what they are, such as
//! `#[serde(flatten)]` fields and untagged enums, see values as they are and
//! get no coercion.

use serde::de::value::{MapDeserializer, SeqDeserializer};
use serde::de::{Deserializer, IntoDeserializer, Visitor};
use serde_json::{Error, Map, Value};

/// A lenient deserializer over a borrowed JSON value
#[derive(Debug, Clone, Copy)]
pub struct Lenient<'a> {
    value: &'a Value,
}

impl<'a> Lenient<'a> {
    pub fn new(value: &'a Value) -> Self {
        Self { value }
    }

    fn visit_object<V: Visitor<'a>>(
        map: &'a Map<String, Value>,
        visitor: V,
    ) -> Result<V::Value, Error> {
        let mut access: MapDeserializer<'_, _, Error> =
            MapDeserializer::new(map.iter().map(|(k, v)| (k.as_str(), Lenient::new(v))));
        let value = visitor.visit_map(&mut access)?;
        access.end()?;
        Ok(value)
    }

    fn visit_array<V: Visitor<'a>>(items: &'a [Value], visitor: V) -> Result<V::Value, Error> {
        let mut access: SeqDeserializer<_, Error> =
            SeqDeserializer::new(items.iter().map(Lenient::new));
        let value = visitor.visit_seq(&mut access)?;
        access.end()?;
        Ok(value)
    }
}

/// Deserialize `T` from `value` with lenient coercion
pub fn from_value<T: serde::de::DeserializeOwned>(value: &Value) -> Result<T, Error> {
    T::deserialize(Lenient::new(value))
}

fn integral_i64(f: f64) -> Option<i64> {
    (f.is_finite() && f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64)
        .then_some(f as i64)
}

fn integral_u64(f: f64) -> Option<u64> {
    (f.is_finite() && f.fract() == 0.0 && f >= 0.0 && f < u64::MAX as f64).then_some(f as u64)
}

/// Integer digits of a numeric string, allowing only a zero fraction (`"12.00"`)
fn integral_digits(s: &str) -> Option<&str> {
    let s = s.trim();
    match s.split_once('.') {
        None => Some(s),
        Some((digits, fraction)) if is_zero_fraction(fraction) => Some(digits),
        Some(_) => None,
    }
}

fn is_zero_fraction(fraction: &str) -> bool {
    !fraction.is_empty() && fraction.bytes().all(|b| b == b'0')
}

fn lenient_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(integral_i64)),
        Value::String(s) => integral_digits(s).and_then(|digits| digits.parse::<i64>().ok()),
        _ => None,
    }
}

fn lenient_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64().or_else(|| n.as_f64().and_then(integral_u64)),
        Value::String(s) => integral_digits(s).and_then(|digits| digits.parse::<u64>().ok()),
        _ => None,
    }
}

fn lenient_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
}

fn lenient_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => match n.as_u64() {
            Some(0) => Some(false),
            Some(1) => Some(true),
            _ => None,
        },
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Some(true),
            "false" | "0" | "no" | "off" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

macro_rules! lenient_signed {
    ($($method:ident)*) => {
        $(
            fn $method<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
                match lenient_i64(self.value) {
                    Some(n) => visitor.visit_i64(n),
                    None => self.value.$method(visitor),
                }
            }
        )*
    };
}

macro_rules! lenient_unsigned {
    ($($method:ident)*) => {
        $(
            fn $method<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
                match lenient_u64(self.value) {
                    Some(n) => visitor.visit_u64(n),
                    None => self.value.$method(visitor),
                }
            }
        )*
    };
}

macro_rules! strict {
    ($($method:ident)*) => {
        $(
            fn $method<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
                self.value.$method(visitor)
            }
        )*
    };
}

impl<'de> Deserializer<'de> for Lenient<'de> {
    type Error = Error;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        match self.value {
            Value::Object(map) => Self::visit_object(map, visitor),
            Value::Array(items) => Self::visit_array(items, visitor),
            other => other.deserialize_any(visitor),
        }
    }

    lenient_signed! { deserialize_i8 deserialize_i16 deserialize_i32 deserialize_i64 }
    lenient_unsigned! { deserialize_u8 deserialize_u16 deserialize_u32 deserialize_u64 }
    strict! {
        deserialize_i128 deserialize_u128 deserialize_char deserialize_str deserialize_string
        deserialize_bytes deserialize_byte_buf deserialize_unit deserialize_identifier
        deserialize_ignored_any
    }

    fn deserialize_bool<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        match lenient_bool(self.value) {
            Some(b) => visitor.visit_bool(b),
            None => self.value.deserialize_bool(visitor),
        }
    }

    fn deserialize_f32<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        self.deserialize_f64(visitor)
    }

    fn deserialize_f64<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        match lenient_f64(self.value) {
            Some(f) => visitor.visit_f64(f),
            None => self.value.deserialize_f64(visitor),
        }
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        match self.value {
            Value::Null => visitor.visit_none(),
            _ => visitor.visit_some(self),
        }
    }

    fn deserialize_unit_struct<V: Visitor<'de>>(
        self,
        name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Error> {
        self.value.deserialize_unit_struct(name, visitor)
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Error> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_seq<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        match self.value {
            Value::Array(items) => Self::visit_array(items, visitor),
            other => other.deserialize_seq(visitor),
        }
    }

    fn deserialize_tuple<V: Visitor<'de>>(
        self,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value, Error> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_tuple_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value, Error> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_map<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        match self.value {
            Value::Object(map) => Self::visit_object(map, visitor),
            other => other.deserialize_map(visitor),
        }
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Error> {
        match self.value {
            Value::Object(map) => Self::visit_object(map, visitor),
            other => other.deserialize_map(visitor),
        }
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        name: &'static str,
        variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Error> {
        self.value.deserialize_enum(name, variants, visitor)
    }
}

impl<'de> IntoDeserializer<'de, Error> for Lenient<'de> {
    type Deserializer = Self;

    fn into_deserializer(self) -> Self {
        self
    }
}
