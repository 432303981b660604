use std::collections::BTreeMap;
use std::fmt;

use serde::ser::{
    self, Serialize, SerializeMap, SerializeSeq, SerializeStruct, SerializeStructVariant,
    SerializeTuple, SerializeTupleStruct, SerializeTupleVariant, Serializer,
};

use crate::value::{Key, Value};

/// Builds a [Value] tree from any `T: Serialize`.
pub fn to_value<T>(value: &T) -> Result<Value, SerdeError>
where
    T: Serialize,
{
    value.serialize(ValueSerializer)
}

/// Serializes straight to the compact text form.
pub fn to_string<T>(value: &T) -> Result<String, SerdeError>
where
    T: Serialize,
{
    Ok(to_value(value)?.serialize_compact())
}

/// Serializes to the indented text form.
pub fn to_string_pretty<T>(value: &T, indent: usize) -> Result<String, SerdeError>
where
    T: Serialize,
{
    Ok(to_value(value)?.serialize_pretty(indent))
}

#[derive(Debug)]
pub enum SerdeError {
    Custom(String),
}

impl std::error::Error for SerdeError {}

impl fmt::Display for SerdeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SerdeError::Custom(msg) => write!(f, "{}", msg),
        }
    }
}

impl ser::Error for SerdeError {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        SerdeError::Custom(msg.to_string())
    }
}

impl serde::de::Error for SerdeError {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        SerdeError::Custom(msg.to_string())
    }
}

fn number(value: f64) -> Result<Value, SerdeError> {
    if value.is_finite() {
        Ok(Value::Number(value))
    } else {
        Err(ser::Error::custom("cannot serialize a non-finite number"))
    }
}

fn key_from_value(value: Value) -> Result<Key, SerdeError> {
    match value {
        Value::String(text) => Ok(Key::string(text)),
        Value::Number(n) => Ok(Key::number(n)),
        other => Err(ser::Error::custom(format!(
            "map keys must be strings or numbers, got {}",
            other.kind()
        ))),
    }
}

/// Used for a normal sequence `[elem, elem, ...]` or a tuple `(elem, ...)`.
pub struct CompoundSeq {
    elements: Vec<Value>,
}

impl CompoundSeq {
    fn push<T>(&mut self, value: &T) -> Result<(), SerdeError>
    where
        T: ?Sized + Serialize,
    {
        self.elements.push(value.serialize(ValueSerializer)?);
        Ok(())
    }
}

impl SerializeSeq for CompoundSeq {
    type Ok = Value;
    type Error = SerdeError;

    fn serialize_element<T>(&mut self, value: &T) -> Result<(), Self::Error>
    where
        T: ?Sized + Serialize,
    {
        self.push(value)
    }

    fn end(self) -> Result<Self::Ok, Self::Error> {
        Ok(Value::Array(self.elements))
    }
}

impl SerializeTuple for CompoundSeq {
    type Ok = Value;
    type Error = SerdeError;

    fn serialize_element<T>(&mut self, value: &T) -> Result<(), Self::Error>
    where
        T: ?Sized + Serialize,
    {
        self.push(value)
    }

    fn end(self) -> Result<Self::Ok, Self::Error> {
        Ok(Value::Array(self.elements))
    }
}

impl SerializeTupleStruct for CompoundSeq {
    type Ok = Value;
    type Error = SerdeError;

    fn serialize_field<T>(&mut self, value: &T) -> Result<(), Self::Error>
    where
        T: ?Sized + Serialize,
    {
        self.push(value)
    }

    fn end(self) -> Result<Self::Ok, Self::Error> {
        Ok(Value::Array(self.elements))
    }
}

/// For a tuple variant (e.g. `MyEnum::Variant(...)`), stored as
/// `{ "Variant": [ ... elements ... ] }`.
pub struct CompoundSeqVariant {
    variant: &'static str,
    elements: Vec<Value>,
}

impl SerializeTupleVariant for CompoundSeqVariant {
    type Ok = Value;
    type Error = SerdeError;

    fn serialize_field<T>(&mut self, value: &T) -> Result<(), Self::Error>
    where
        T: ?Sized + Serialize,
    {
        self.elements.push(value.serialize(ValueSerializer)?);
        Ok(())
    }

    fn end(self) -> Result<Self::Ok, Self::Error> {
        let entries = BTreeMap::from([(Key::string(self.variant), Value::Array(self.elements))]);
        Ok(Value::Dictionary(entries))
    }
}

/// For a normal map or a struct.
pub struct CompoundMap {
    entries: BTreeMap<Key, Value>,
    next_key: Option<Key>,
}

impl SerializeMap for CompoundMap {
    type Ok = Value;
    type Error = SerdeError;

    fn serialize_key<T>(&mut self, key: &T) -> Result<(), Self::Error>
    where
        T: ?Sized + Serialize,
    {
        let key = key_from_value(key.serialize(ValueSerializer)?)?;
        self.next_key = Some(key);
        Ok(())
    }

    fn serialize_value<T>(&mut self, value: &T) -> Result<(), Self::Error>
    where
        T: ?Sized + Serialize,
    {
        let key = self
            .next_key
            .take()
            .ok_or_else(|| ser::Error::custom("serialize_value called before serialize_key"))?;
        self.entries.insert(key, value.serialize(ValueSerializer)?);
        Ok(())
    }

    fn end(self) -> Result<Self::Ok, Self::Error> {
        Ok(Value::Dictionary(self.entries))
    }
}

impl SerializeStruct for CompoundMap {
    type Ok = Value;
    type Error = SerdeError;

    fn serialize_field<T>(&mut self, field: &'static str, value: &T) -> Result<(), Self::Error>
    where
        T: ?Sized + Serialize,
    {
        self.entries
            .insert(Key::string(field), value.serialize(ValueSerializer)?);
        Ok(())
    }

    fn end(self) -> Result<Self::Ok, Self::Error> {
        Ok(Value::Dictionary(self.entries))
    }
}

/// For a struct variant (e.g. `MyEnum::Variant { x: 1 }`), stored as
/// `{ "Variant": { x: 1 } }`.
pub struct CompoundMapVariant {
    variant: &'static str,
    entries: BTreeMap<Key, Value>,
}

impl SerializeStructVariant for CompoundMapVariant {
    type Ok = Value;
    type Error = SerdeError;

    fn serialize_field<T>(&mut self, field: &'static str, value: &T) -> Result<(), Self::Error>
    where
        T: ?Sized + Serialize,
    {
        self.entries
            .insert(Key::string(field), value.serialize(ValueSerializer)?);
        Ok(())
    }

    fn end(self) -> Result<Self::Ok, Self::Error> {
        let fields = Value::Dictionary(self.entries);
        let entries = BTreeMap::from([(Key::string(self.variant), fields)]);
        Ok(Value::Dictionary(entries))
    }
}

pub struct ValueSerializer;

impl Serializer for ValueSerializer {
    type Ok = Value;
    type Error = SerdeError;

    type SerializeSeq = CompoundSeq;
    type SerializeTuple = CompoundSeq;
    type SerializeTupleStruct = CompoundSeq;
    type SerializeTupleVariant = CompoundSeqVariant;
    type SerializeMap = CompoundMap;
    type SerializeStruct = CompoundMap;
    type SerializeStructVariant = CompoundMapVariant;

    fn serialize_bool(self, v: bool) -> Result<Self::Ok, Self::Error> {
        Ok(Value::Bool(v))
    }

    fn serialize_i8(self, v: i8) -> Result<Self::Ok, Self::Error> {
        number(f64::from(v))
    }

    fn serialize_i16(self, v: i16) -> Result<Self::Ok, Self::Error> {
        number(f64::from(v))
    }

    fn serialize_i32(self, v: i32) -> Result<Self::Ok, Self::Error> {
        number(f64::from(v))
    }

    fn serialize_i64(self, v: i64) -> Result<Self::Ok, Self::Error> {
        number(v as f64)
    }

    fn serialize_u8(self, v: u8) -> Result<Self::Ok, Self::Error> {
        number(f64::from(v))
    }

    fn serialize_u16(self, v: u16) -> Result<Self::Ok, Self::Error> {
        number(f64::from(v))
    }

    fn serialize_u32(self, v: u32) -> Result<Self::Ok, Self::Error> {
        number(f64::from(v))
    }

    fn serialize_u64(self, v: u64) -> Result<Self::Ok, Self::Error> {
        number(v as f64)
    }

    fn serialize_f32(self, v: f32) -> Result<Self::Ok, Self::Error> {
        self.serialize_f64(f64::from(v))
    }

    fn serialize_f64(self, v: f64) -> Result<Self::Ok, Self::Error> {
        number(v)
    }

    fn serialize_char(self, v: char) -> Result<Self::Ok, Self::Error> {
        Ok(Value::String(v.to_string()))
    }

    fn serialize_str(self, v: &str) -> Result<Self::Ok, Self::Error> {
        Ok(Value::String(v.to_string()))
    }

    fn serialize_bytes(self, v: &[u8]) -> Result<Self::Ok, Self::Error> {
        let elements = v.iter().map(|b| Value::Number(f64::from(*b))).collect();
        Ok(Value::Array(elements))
    }

    fn serialize_none(self) -> Result<Self::Ok, Self::Error> {
        Ok(Value::Null)
    }

    fn serialize_some<T>(self, value: &T) -> Result<Self::Ok, Self::Error>
    where
        T: ?Sized + Serialize,
    {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<Self::Ok, Self::Error> {
        Ok(Value::Null)
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<Self::Ok, Self::Error> {
        Ok(Value::Null)
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> Result<Self::Ok, Self::Error> {
        Ok(Value::String(variant.to_string()))
    }

    fn serialize_newtype_struct<T>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<Self::Ok, Self::Error>
    where
        T: ?Sized + Serialize,
    {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T>(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        value: &T,
    ) -> Result<Self::Ok, Self::Error>
    where
        T: ?Sized + Serialize,
    {
        let inner = value.serialize(ValueSerializer)?;
        let entries = BTreeMap::from([(Key::string(variant), inner)]);
        Ok(Value::Dictionary(entries))
    }

    fn serialize_seq(self, _len: Option<usize>) -> Result<Self::SerializeSeq, Self::Error> {
        Ok(CompoundSeq { elements: Vec::new() })
    }

    fn serialize_tuple(self, _len: usize) -> Result<Self::SerializeTuple, Self::Error> {
        Ok(CompoundSeq { elements: Vec::new() })
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleStruct, Self::Error> {
        Ok(CompoundSeq { elements: Vec::new() })
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleVariant, Self::Error> {
        Ok(CompoundSeqVariant { variant, elements: Vec::new() })
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Self::SerializeMap, Self::Error> {
        Ok(CompoundMap { entries: BTreeMap::new(), next_key: None })
    }

    fn serialize_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStruct, Self::Error> {
        Ok(CompoundMap { entries: BTreeMap::new(), next_key: None })
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant, Self::Error> {
        Ok(CompoundMapVariant { variant, entries: BTreeMap::new() })
    }
}
