use crate::{
    domain::{DbArrayFilter, DbFilters, DbJsonFilter, DbResponse, HistoricMessage},
    stream::ValueStream,
};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::{
    collections::{BTreeMap, HashMap},
    fmt,
    str::FromStr,
};
use thiserror::Error;

/// The closed set of types that can cross the wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum WireType {
    String,
    Int,
    Uint32,
    Float32,
    Float64,
    Bool,
    List(Box<WireType>),
    /// String-keyed map.
    Map(Box<WireType>),
    Struct(DomainType),
    /// Output-only marker for a function that produces incremental values.
    Stream,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DomainType {
    DbArrayFilter,
    DbFilters,
    DbJsonFilter,
    DbResponse,
    HistoricMessage,
}

impl DomainType {
    const ALL: [DomainType; 5] = [
        DomainType::DbArrayFilter,
        DomainType::DbFilters,
        DomainType::DbJsonFilter,
        DomainType::DbResponse,
        DomainType::HistoricMessage,
    ];

    pub fn name(&self) -> &'static str {
        use DomainType::*;
        match self {
            DbArrayFilter => "DbArrayFilter",
            DbFilters => "DbFilters",
            DbJsonFilter => "DbJsonFilter",
            DbResponse => "DbResponse",
            HistoricMessage => "HistoricMessage",
        }
    }
}

impl WireType {
    pub fn list(inner: WireType) -> Self {
        WireType::List(Box::new(inner))
    }

    pub fn map(inner: WireType) -> Self {
        WireType::Map(Box::new(inner))
    }

    /// Coarse classification reported alongside the exact tag.
    pub fn simple_type(&self) -> &'static str {
        use WireType::*;
        match self {
            String => "string",
            Int | Uint32 | Float32 | Float64 => "number",
            Bool => "boolean",
            List(_) | Map(_) | Struct(_) | Stream => "json",
        }
    }

    pub fn is_stream(&self) -> bool {
        matches!(self, WireType::Stream)
    }

    /// Literal an empty wire string stands for, if the type has one.
    pub(crate) fn empty_literal(&self) -> Option<&'static str> {
        match self {
            WireType::List(_) => Some("[]"),
            WireType::Map(_) | WireType::Struct(_) => Some("{}"),
            _ => None,
        }
    }

    fn parse_tag(tag: &str) -> Option<Self> {
        let tag = tag.trim();
        let scalar = match tag {
            "string" => Some(WireType::String),
            "int" => Some(WireType::Int),
            "uint32" => Some(WireType::Uint32),
            "float32" => Some(WireType::Float32),
            "float64" => Some(WireType::Float64),
            "bool" => Some(WireType::Bool),
            "stream" => Some(WireType::Stream),
            _ => None,
        };
        if scalar.is_some() {
            return scalar;
        }
        if let Some(domain) = DomainType::ALL.into_iter().find(|d| d.name() == tag) {
            return Some(WireType::Struct(domain));
        }

        let (outer, inner) = tag.strip_suffix('>')?.split_once('<')?;
        let inner = Self::parse_tag(inner)?;
        if inner.is_stream() {
            return None;
        }
        match outer.trim() {
            "list" => Some(WireType::list(inner)),
            "map" => Some(WireType::map(inner)),
            _ => None,
        }
    }
}

impl fmt::Display for WireType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use WireType::*;
        match self {
            String => f.write_str("string"),
            Int => f.write_str("int"),
            Uint32 => f.write_str("uint32"),
            Float32 => f.write_str("float32"),
            Float64 => f.write_str("float64"),
            Bool => f.write_str("bool"),
            List(inner) => write!(f, "list<{inner}>"),
            Map(inner) => write!(f, "map<{inner}>"),
            Struct(domain) => f.write_str(domain.name()),
            Stream => f.write_str("stream"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unsupported wire type: '{0}'")]
pub struct UnsupportedType(pub String);

impl FromStr for WireType {
    type Err = UnsupportedType;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        WireType::parse_tag(tag).ok_or_else(|| UnsupportedType(tag.to_owned()))
    }
}

impl Serialize for WireType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for WireType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let tag = String::deserialize(deserializer)?;
        tag.parse().map_err(de::Error::custom)
    }
}

/// A native value, tagged with its wire type.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Placeholder for a slot that is filled by the callable (streams).
    Nil,
    String(String),
    Int(i64),
    Uint32(u32),
    Float32(f32),
    Float64(f64),
    Bool(bool),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
    DbArrayFilter(DbArrayFilter),
    DbFilters(DbFilters),
    DbJsonFilter(DbJsonFilter),
    DbResponse(DbResponse),
    HistoricMessage(HistoricMessage),
}

impl Value {
    pub fn kind(&self) -> &'static str {
        use Value::*;
        match self {
            Nil => "nil",
            String(_) => "string",
            Int(_) => "int",
            Uint32(_) => "uint32",
            Float32(_) => "float32",
            Float64(_) => "float64",
            Bool(_) => "bool",
            List(_) => "list",
            Map(_) => "map",
            DbArrayFilter(_) => "DbArrayFilter",
            DbFilters(_) => "DbFilters",
            DbJsonFilter(_) => "DbJsonFilter",
            DbResponse(_) => "DbResponse",
            HistoricMessage(_) => "HistoricMessage",
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_owned())
    }
}

impl<T: Encode> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        items.encode()
    }
}

/// A single native result slot of a callable.
#[derive(Debug)]
pub enum Output {
    Value(Value),
    Stream(ValueStream),
}

pub trait Typed {
    fn wire_type() -> WireType;
}

pub trait Encode {
    fn encode(self) -> Value;
}

pub trait Decode: Sized {
    fn decode(value: Value) -> Result<Self, TypeMismatch>;
}

/// Anything a callable may return in one of its result positions.
pub trait IntoOutput {
    fn output_type() -> WireType;
    fn into_output(self) -> Output;
}

/// A closed enumeration of string options accepted by an input.
pub trait Choice: Sized {
    fn options() -> &'static [&'static str];
    fn from_option(option: &str) -> Option<Self>;
    fn as_option(&self) -> &'static str;
}

macro_rules! impl_encode_decode {
    ($rust_type:ty, $wire_type:expr, $variant:ident) => {
        impl Typed for $rust_type {
            fn wire_type() -> WireType {
                $wire_type
            }
        }

        impl Encode for $rust_type {
            fn encode(self) -> Value {
                Value::$variant(self)
            }
        }

        impl Decode for $rust_type {
            fn decode(value: Value) -> Result<Self, TypeMismatch> {
                match value {
                    Value::$variant(v) => Ok(v),
                    other => Err(TypeMismatch::new(&other, <Self as Typed>::wire_type())),
                }
            }
        }

        impl IntoOutput for $rust_type {
            fn output_type() -> WireType {
                <Self as Typed>::wire_type()
            }

            fn into_output(self) -> Output {
                Output::Value(self.encode())
            }
        }
    };
}

impl_encode_decode!(String, WireType::String, String);
impl_encode_decode!(i64, WireType::Int, Int);
impl_encode_decode!(u32, WireType::Uint32, Uint32);
impl_encode_decode!(f32, WireType::Float32, Float32);
impl_encode_decode!(f64, WireType::Float64, Float64);
impl_encode_decode!(bool, WireType::Bool, Bool);
impl_encode_decode!(DbArrayFilter, WireType::Struct(DomainType::DbArrayFilter), DbArrayFilter);
impl_encode_decode!(DbFilters, WireType::Struct(DomainType::DbFilters), DbFilters);
impl_encode_decode!(DbJsonFilter, WireType::Struct(DomainType::DbJsonFilter), DbJsonFilter);
impl_encode_decode!(DbResponse, WireType::Struct(DomainType::DbResponse), DbResponse);
impl_encode_decode!(
    HistoricMessage,
    WireType::Struct(DomainType::HistoricMessage),
    HistoricMessage
);

impl<T: Typed> Typed for Vec<T> {
    fn wire_type() -> WireType {
        WireType::list(T::wire_type())
    }
}

impl<T: Encode> Encode for Vec<T> {
    fn encode(self) -> Value {
        Value::List(self.into_iter().map(Encode::encode).collect())
    }
}

impl<T: Typed + Decode> Decode for Vec<T> {
    fn decode(value: Value) -> Result<Self, TypeMismatch> {
        match value {
            Value::List(items) => items.into_iter().map(T::decode).collect(),
            other => Err(TypeMismatch::new(&other, Self::wire_type())),
        }
    }
}

impl<T: Typed + Encode> IntoOutput for Vec<T> {
    fn output_type() -> WireType {
        Self::wire_type()
    }

    fn into_output(self) -> Output {
        Output::Value(self.encode())
    }
}

impl<T: Typed> Typed for BTreeMap<String, T> {
    fn wire_type() -> WireType {
        WireType::map(T::wire_type())
    }
}

impl<T: Encode> Encode for BTreeMap<String, T> {
    fn encode(self) -> Value {
        Value::Map(self.into_iter().map(|(k, v)| (k, v.encode())).collect())
    }
}

impl<T: Typed + Decode> Decode for BTreeMap<String, T> {
    fn decode(value: Value) -> Result<Self, TypeMismatch> {
        match value {
            Value::Map(entries) => entries
                .into_iter()
                .map(|(k, v)| Ok((k, T::decode(v)?)))
                .collect(),
            other => Err(TypeMismatch::new(&other, Self::wire_type())),
        }
    }
}

impl<T: Typed + Encode> IntoOutput for BTreeMap<String, T> {
    fn output_type() -> WireType {
        Self::wire_type()
    }

    fn into_output(self) -> Output {
        Output::Value(self.encode())
    }
}

impl<T: Typed> Typed for HashMap<String, T> {
    fn wire_type() -> WireType {
        WireType::map(T::wire_type())
    }
}

impl<T: Encode> Encode for HashMap<String, T> {
    fn encode(self) -> Value {
        Value::Map(self.into_iter().map(|(k, v)| (k, v.encode())).collect())
    }
}

impl<T: Typed + Decode> Decode for HashMap<String, T> {
    fn decode(value: Value) -> Result<Self, TypeMismatch> {
        BTreeMap::<String, T>::decode(value).map(|entries| entries.into_iter().collect())
    }
}

impl<T: Typed + Encode> IntoOutput for HashMap<String, T> {
    fn output_type() -> WireType {
        Self::wire_type()
    }

    fn into_output(self) -> Output {
        Output::Value(self.encode())
    }
}

impl IntoOutput for ValueStream {
    fn output_type() -> WireType {
        WireType::Stream
    }

    fn into_output(self) -> Output {
        Output::Stream(self)
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("type mismatch: expected {expected}, found {found}")]
pub struct TypeMismatch {
    found: &'static str,
    expected: WireType,
}

impl TypeMismatch {
    pub fn new(value: &Value, expected: WireType) -> Self {
        Self {
            found: value.kind(),
            expected,
        }
    }

    pub fn expected(&self) -> &WireType {
        &self.expected
    }
}
