use serde::de::{self, DeserializeOwned, DeserializeSeed, Deserializer, IntoDeserializer, MapAccess, SeqAccess, VariantAccess, Visitor};
use serde::forward_to_deserialize_any;

use crate::parser::from_str as model_from_str;
use crate::ser::SerdeError;
use crate::value::{Key, Kind, Value};

/// A small helper that wraps a `&Value` and implements
/// `serde::Deserializer`.
#[derive(Clone, Copy)]
pub struct ValueDeserializer<'a> {
    input: &'a Value,
}

impl<'a> ValueDeserializer<'a> {
    pub fn new(input: &'a Value) -> Self {
        ValueDeserializer { input }
    }

    fn visit_signed<'de, V>(self, visitor: V) -> Result<V::Value, SerdeError>
    where
        V: Visitor<'de>,
    {
        match self.input {
            Value::Number(n) if n.fract() == 0.0 && *n >= i64::MIN as f64 && *n <= i64::MAX as f64 => {
                visitor.visit_i64(*n as i64)
            }
            _ => self.deserialize_any(visitor),
        }
    }

    fn visit_unsigned<'de, V>(self, visitor: V) -> Result<V::Value, SerdeError>
    where
        V: Visitor<'de>,
    {
        match self.input {
            Value::Number(n) if n.fract() == 0.0 && *n >= 0.0 && *n <= u64::MAX as f64 => {
                visitor.visit_u64(*n as u64)
            }
            _ => self.deserialize_any(visitor),
        }
    }
}

impl<'de, 'a> Deserializer<'de> for ValueDeserializer<'a> {
    type Error = SerdeError;

    fn deserialize_any<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        match self.input {
            Value::Null => visitor.visit_unit(),
            Value::Bool(b) => visitor.visit_bool(*b),
            Value::Number(n) => visitor.visit_f64(*n),
            Value::String(s) => visitor.visit_str(s),
            Value::Array(values) => visitor.visit_seq(ValueSeqAccess { values, index: 0 }),
            Value::Dictionary(entries) => {
                visitor.visit_map(ValueMapAccess { iter: entries.iter(), pending: None })
            }
        }
    }

    fn deserialize_i8<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        self.visit_signed(visitor)
    }

    fn deserialize_i16<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        self.visit_signed(visitor)
    }

    fn deserialize_i32<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        self.visit_signed(visitor)
    }

    fn deserialize_i64<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        self.visit_signed(visitor)
    }

    fn deserialize_u8<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        self.visit_unsigned(visitor)
    }

    fn deserialize_u16<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        self.visit_unsigned(visitor)
    }

    fn deserialize_u32<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        self.visit_unsigned(visitor)
    }

    fn deserialize_u64<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        self.visit_unsigned(visitor)
    }

    fn deserialize_f32<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        self.deserialize_f64(visitor)
    }

    fn deserialize_f64<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        match self.input {
            Value::Number(n) => visitor.visit_f64(*n),
            _ => self.deserialize_any(visitor),
        }
    }

    fn deserialize_option<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        match self.input {
            Value::Null => visitor.visit_none(),
            _ => visitor.visit_some(self),
        }
    }

    fn deserialize_unit<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        if let Value::Null = self.input {
            visitor.visit_unit()
        } else {
            self.deserialize_any(visitor)
        }
    }

    fn deserialize_unit_struct<V>(self, _name: &'static str, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        self.deserialize_unit(visitor)
    }

    fn deserialize_newtype_struct<V>(self, _name: &'static str, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_seq<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        match self.input {
            Value::Array(values) => visitor.visit_seq(ValueSeqAccess { values, index: 0 }),
            _ => self.deserialize_any(visitor),
        }
    }

    fn deserialize_tuple<V>(self, _len: usize, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        self.deserialize_seq(visitor)
    }

    fn deserialize_tuple_struct<V>(
        self,
        _name: &'static str,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        self.deserialize_seq(visitor)
    }

    fn deserialize_map<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        match self.input {
            Value::Dictionary(entries) => {
                visitor.visit_map(ValueMapAccess { iter: entries.iter(), pending: None })
            }
            _ => self.deserialize_any(visitor),
        }
    }

    fn deserialize_struct<V>(
        self,
        _name: &'static str,
        _fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        self.deserialize_map(visitor)
    }

    fn deserialize_enum<V>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        match self.input {
            Value::String(text) => visitor.visit_enum(text.as_str().into_deserializer()),
            Value::Dictionary(entries) => {
                let mut iter = entries.iter();
                let (key, content) = match iter.next() {
                    Some(entry) => entry,
                    None => return Err(de::Error::custom("cannot deserialize an enum from an empty dictionary")),
                };
                if iter.next().is_some() {
                    return Err(de::Error::custom("expected a single-entry dictionary for an enum"));
                }
                if key.kind() != Kind::String {
                    return Err(de::Error::custom("enum variant key must be a string"));
                }
                visitor.visit_enum(EnumDeserializer { variant: key.as_text(), content })
            }
            _ => Err(de::Error::custom("unsupported enum representation")),
        }
    }

    fn deserialize_identifier<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        match self.input {
            Value::String(s) => visitor.visit_str(s),
            _ => self.deserialize_any(visitor),
        }
    }

    fn deserialize_ignored_any<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        visitor.visit_unit()
    }

    forward_to_deserialize_any! {
        bool char str string bytes byte_buf
    }
}

/// Minimal SeqAccess implementation for arrays
struct ValueSeqAccess<'a> {
    values: &'a [Value],
    index: usize,
}

impl<'de, 'a> SeqAccess<'de> for ValueSeqAccess<'a> {
    type Error = SerdeError;

    fn next_element_seed<T>(&mut self, seed: T) -> Result<Option<T::Value>, SerdeError>
    where
        T: DeserializeSeed<'de>,
    {
        if self.index < self.values.len() {
            let deserializer = ValueDeserializer { input: &self.values[self.index] };
            self.index += 1;
            seed.deserialize(deserializer).map(Some)
        } else {
            Ok(None)
        }
    }
}

/// Minimal MapAccess implementation for dictionaries; entries come out in
/// the collection's key order.
struct ValueMapAccess<'a> {
    iter: std::collections::btree_map::Iter<'a, Key, Value>,
    pending: Option<&'a Value>,
}

impl<'de, 'a> MapAccess<'de> for ValueMapAccess<'a> {
    type Error = SerdeError;

    fn next_key_seed<K>(&mut self, seed: K) -> Result<Option<K::Value>, SerdeError>
    where
        K: DeserializeSeed<'de>,
    {
        match self.iter.next() {
            Some((key, value)) => {
                self.pending = Some(value);
                seed.deserialize(KeyDeserializer { key }).map(Some)
            }
            None => Ok(None),
        }
    }

    fn next_value_seed<V>(&mut self, seed: V) -> Result<V::Value, SerdeError>
    where
        V: DeserializeSeed<'de>,
    {
        match self.pending.take() {
            Some(value) => seed.deserialize(ValueDeserializer { input: value }),
            None => Err(de::Error::custom("value requested before key")),
        }
    }
}

/// Dictionary keys deserialize from their kind: Number keys as numbers,
/// String keys (including struct field names) as text.
#[derive(Clone, Copy)]
struct KeyDeserializer<'a> {
    key: &'a Key,
}

impl<'a> KeyDeserializer<'a> {
    fn visit_signed<'de, V>(self, visitor: V) -> Result<V::Value, SerdeError>
    where
        V: Visitor<'de>,
    {
        match self.key.as_number() {
            Some(n) if n.fract() == 0.0 => visitor.visit_i64(n as i64),
            _ => self.deserialize_any(visitor),
        }
    }

    fn visit_unsigned<'de, V>(self, visitor: V) -> Result<V::Value, SerdeError>
    where
        V: Visitor<'de>,
    {
        match self.key.as_number() {
            Some(n) if n.fract() == 0.0 && n >= 0.0 => visitor.visit_u64(n as u64),
            _ => self.deserialize_any(visitor),
        }
    }
}

impl<'de, 'a> Deserializer<'de> for KeyDeserializer<'a> {
    type Error = SerdeError;

    fn deserialize_any<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        match self.key.as_number() {
            Some(n) => visitor.visit_f64(n),
            None => visitor.visit_str(self.key.as_text()),
        }
    }

    fn deserialize_i8<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        self.visit_signed(visitor)
    }

    fn deserialize_i16<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        self.visit_signed(visitor)
    }

    fn deserialize_i32<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        self.visit_signed(visitor)
    }

    fn deserialize_i64<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        self.visit_signed(visitor)
    }

    fn deserialize_u8<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        self.visit_unsigned(visitor)
    }

    fn deserialize_u16<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        self.visit_unsigned(visitor)
    }

    fn deserialize_u32<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        self.visit_unsigned(visitor)
    }

    fn deserialize_u64<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        self.visit_unsigned(visitor)
    }

    fn deserialize_identifier<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        visitor.visit_str(self.key.as_text())
    }

    forward_to_deserialize_any! {
        bool f32 f64 char str string bytes byte_buf
        option unit unit_struct newtype_struct seq tuple tuple_struct map
        struct enum ignored_any
    }
}

/// If you need to handle complex enum representations:
struct EnumDeserializer<'a> {
    variant: &'a str,
    content: &'a Value,
}

impl<'de, 'a> de::EnumAccess<'de> for EnumDeserializer<'a> {
    type Error = SerdeError;
    type Variant = ValueDeserializer<'a>;

    fn variant_seed<V>(self, seed: V) -> Result<(V::Value, Self::Variant), SerdeError>
    where
        V: DeserializeSeed<'de>,
    {
        let val = seed.deserialize(self.variant.into_deserializer())?;
        Ok((val, ValueDeserializer { input: self.content }))
    }
}

impl<'de, 'a> VariantAccess<'de> for ValueDeserializer<'a> {
    type Error = SerdeError;

    fn unit_variant(self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn newtype_variant_seed<T>(self, seed: T) -> Result<T::Value, Self::Error>
    where
        T: DeserializeSeed<'de>,
    {
        seed.deserialize(self)
    }

    fn tuple_variant<V>(self, _len: usize, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        self.deserialize_seq(visitor)
    }

    fn struct_variant<V>(
        self,
        _fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        self.deserialize_map(visitor)
    }
}

/// Deserializes out of an already-built tree.
pub fn from_value<T>(value: &Value) -> Result<T, SerdeError>
where
    T: DeserializeOwned,
{
    T::deserialize(ValueDeserializer { input: value })
}

/// Parses the text into the document model, then deserializes the caller's
/// type out of it.
pub fn from_str<T>(text: &str) -> Result<T, SerdeError>
where
    T: DeserializeOwned,
{
    let model = model_from_str(text).map_err(|err| SerdeError::Custom(err.to_string()))?;
    from_value(&model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::collections::HashMap;

    #[derive(Debug, Deserialize, PartialEq)]
    struct MyData {
        name: String,
        count: i64,
        maybe: Option<f64>,
    }

    #[test]
    fn test_struct_from_str() {
        let parsed: MyData = from_str("{\"name\":\"x\",\"count\":42,\"maybe\":null}").unwrap();
        assert_eq!(parsed, MyData { name: "x".to_string(), count: 42, maybe: None });
    }

    #[test]
    fn test_optional_field_present() {
        let parsed: MyData = from_str("{\"name\":\"x\",\"count\":1,\"maybe\":2.5}").unwrap();
        assert_eq!(parsed.maybe, Some(2.5));
    }

    #[test]
    fn test_sequences_and_tuples() {
        let parsed: Vec<f64> = from_str("[1,2.5,3]").unwrap();
        assert_eq!(parsed, vec![1.0, 2.5, 3.0]);
        let parsed: (f64, String) = from_str("[1,\"two\"]").unwrap();
        assert_eq!(parsed, (1.0, "two".to_string()));
    }

    #[test]
    fn test_map_with_string_keys() {
        let parsed: HashMap<String, f64> = from_str("{\"a\":1,\"b\":2}").unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed["b"], 2.0);
    }

    #[test]
    fn test_map_with_number_keys() {
        let parsed: HashMap<u32, String> = from_str("{1:\"one\",2:\"two\"}").unwrap();
        assert_eq!(parsed[&1], "one");
        assert_eq!(parsed[&2], "two");
    }

    #[test]
    fn test_integer_narrowing() {
        let parsed: u8 = from_str("200").unwrap();
        assert_eq!(parsed, 200);
        from_str::<u8>("1.5").unwrap_err();
        from_str::<u8>("300").unwrap_err();
    }

    #[test]
    fn test_bool_and_unit() {
        assert!(from_str::<bool>("true").unwrap());
        from_str::<()>("null").unwrap();
    }

    #[derive(Debug, Deserialize, PartialEq)]
    enum Shape {
        Point,
        Circle(f64),
        Rect { w: f64, h: f64 },
    }

    #[test]
    fn test_enum_representations() {
        assert_eq!(from_str::<Shape>("\"Point\"").unwrap(), Shape::Point);
        assert_eq!(from_str::<Shape>("{\"Circle\":2.5}").unwrap(), Shape::Circle(2.5));
        assert_eq!(
            from_str::<Shape>("{\"Rect\":{\"w\":1,\"h\":2}}").unwrap(),
            Shape::Rect { w: 1.0, h: 2.0 }
        );
    }

    #[test]
    fn test_wrong_kind_is_an_error() {
        from_str::<String>("1").unwrap_err();
        from_str::<Vec<f64>>("{\"a\":1}").unwrap_err();
    }

    #[test]
    fn test_parse_error_is_surfaced() {
        let err = from_str::<MyData>("{\"name\":}").unwrap_err();
        let SerdeError::Custom(message) = err;
        assert!(message.contains("ParsingError"));
    }

    #[test]
    fn test_from_value() {
        let mut dict = Value::new_dictionary();
        dict.insert("name", "y").unwrap();
        dict.insert("count", 7.0).unwrap();
        dict.insert("maybe", Value::Null).unwrap();
        let parsed: MyData = from_value(&dict).unwrap();
        assert_eq!(parsed, MyData { name: "y".to_string(), count: 7, maybe: None });
    }

    #[test]
    fn test_round_trip_with_ser() {
        #[derive(Debug, serde::Serialize, Deserialize, PartialEq)]
        struct Config {
            threshold: f64,
            labels: Vec<String>,
            active: bool,
        }
        let original = Config {
            threshold: 0.75,
            labels: vec!["a".to_string(), "b".to_string()],
            active: true,
        };
        let text = crate::ser::to_string(&original).unwrap();
        let parsed: Config = from_str(&text).unwrap();
        assert_eq!(parsed, original);
    }
}
