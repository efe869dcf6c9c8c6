//! Conversion between wire strings and native [`Value`]s.
//!
//! Scalars travel as plain text, containers and domain structs as JSON. The
//! stream marker has no wire form of its own: it decodes to [`Value::Nil`] and
//! encodes to the empty string.

use crate::types::{DomainType, TypeMismatch, UnsupportedType, Value, WireType};
use serde_json::{Number, Value as Json};
use std::{collections::BTreeMap, fmt::Display, str::FromStr};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum MarshalError {
    #[error(transparent)]
    UnsupportedType(#[from] UnsupportedType),

    #[error("malformed {wire_type} value: {reason}")]
    MalformedValue { wire_type: WireType, reason: String },

    #[error(transparent)]
    TypeMismatch(#[from] TypeMismatch),
}

impl MarshalError {
    fn malformed(wire_type: &WireType, reason: impl Display) -> Self {
        MarshalError::MalformedValue {
            wire_type: wire_type.clone(),
            reason: reason.to_string(),
        }
    }
}

pub type MarshalResult<T> = Result<T, MarshalError>;

pub fn decode(wire: &str, wire_type: &WireType) -> MarshalResult<Value> {
    use WireType::*;
    match wire_type {
        String => Ok(Value::String(wire.to_owned())),
        Int => parse_scalar(wire, wire_type).map(Value::Int),
        Uint32 => parse_scalar(wire, wire_type).map(Value::Uint32),
        Float32 => parse_scalar(wire, wire_type).map(Value::Float32),
        Float64 => parse_scalar(wire, wire_type).map(Value::Float64),
        Bool => match wire.trim() {
            "true" | "1" => Ok(Value::Bool(true)),
            "false" | "0" => Ok(Value::Bool(false)),
            other => Err(MarshalError::malformed(
                wire_type,
                format!("'{other}' is not a boolean"),
            )),
        },
        List(_) | Map(_) | Struct(_) => {
            let text = match wire_type.empty_literal() {
                Some(empty) if wire.trim().is_empty() => empty,
                _ => wire,
            };
            let json: Json =
                serde_json::from_str(text).map_err(|e| MarshalError::malformed(wire_type, e))?;
            from_json(json, wire_type)
        }
        Stream => Ok(Value::Nil),
    }
}

/// Like [`decode`], for a textual type tag.
pub fn decode_tagged(wire: &str, tag: &str) -> MarshalResult<Value> {
    decode(wire, &tag.parse()?)
}

pub fn encode(value: &Value, wire_type: &WireType) -> MarshalResult<String> {
    use WireType::*;
    match (value, wire_type) {
        (_, Stream) => Ok(std::string::String::new()),
        (Value::String(s), String) => Ok(s.clone()),
        (Value::Int(n), Int) => Ok(n.to_string()),
        (Value::Uint32(n), Uint32) => Ok(n.to_string()),
        (Value::Float32(x), Float32) => Ok(x.to_string()),
        (Value::Float64(x), Float64) => Ok(x.to_string()),
        (Value::Bool(b), Bool) => Ok(b.to_string()),
        (_, List(_) | Map(_) | Struct(_)) => {
            let json = to_json(value, wire_type)?;
            serde_json::to_string(&json).map_err(|e| MarshalError::malformed(wire_type, e))
        }
        (value, wire_type) => Err(TypeMismatch::new(value, wire_type.clone()).into()),
    }
}

/// Like [`encode`], for a textual type tag.
pub fn encode_tagged(value: &Value, tag: &str) -> MarshalResult<String> {
    encode(value, &tag.parse()?)
}

fn parse_scalar<T>(wire: &str, wire_type: &WireType) -> MarshalResult<T>
where
    T: FromStr,
    T::Err: Display,
{
    if wire.trim().is_empty() {
        return Err(MarshalError::malformed(wire_type, "empty value"));
    }
    wire.trim()
        .parse()
        .map_err(|e| MarshalError::malformed(wire_type, e))
}

fn from_json(json: Json, wire_type: &WireType) -> MarshalResult<Value> {
    use WireType::*;
    let unexpected = |json: &Json| MarshalError::malformed(wire_type, format!("unexpected {json}"));
    match wire_type {
        String => match json {
            Json::String(s) => Ok(Value::String(s)),
            other => Err(unexpected(&other)),
        },
        Int => json.as_i64().map(Value::Int).ok_or_else(|| unexpected(&json)),
        Uint32 => json
            .as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .map(Value::Uint32)
            .ok_or_else(|| unexpected(&json)),
        Float32 => json
            .as_f64()
            .map(|x| Value::Float32(x as f32))
            .ok_or_else(|| unexpected(&json)),
        Float64 => json.as_f64().map(Value::Float64).ok_or_else(|| unexpected(&json)),
        Bool => json.as_bool().map(Value::Bool).ok_or_else(|| unexpected(&json)),
        List(inner) => match json {
            Json::Array(items) => items
                .into_iter()
                .map(|item| from_json(item, inner))
                .collect::<MarshalResult<_>>()
                .map(Value::List),
            other => Err(unexpected(&other)),
        },
        Map(inner) => match json {
            Json::Object(entries) => entries
                .into_iter()
                .map(|(k, v)| Ok((k, from_json(v, inner)?)))
                .collect::<MarshalResult<BTreeMap<_, _>>>()
                .map(Value::Map),
            other => Err(unexpected(&other)),
        },
        Struct(domain) => struct_from_json(json, *domain)
            .map_err(|e| MarshalError::malformed(wire_type, e)),
        Stream => Ok(Value::Nil),
    }
}

fn struct_from_json(json: Json, domain: DomainType) -> serde_json::Result<Value> {
    Ok(match domain {
        DomainType::DbArrayFilter => Value::DbArrayFilter(serde_json::from_value(json)?),
        DomainType::DbFilters => Value::DbFilters(serde_json::from_value(json)?),
        DomainType::DbJsonFilter => Value::DbJsonFilter(serde_json::from_value(json)?),
        DomainType::DbResponse => Value::DbResponse(serde_json::from_value(json)?),
        DomainType::HistoricMessage => Value::HistoricMessage(serde_json::from_value(json)?),
    })
}

fn to_json(value: &Value, wire_type: &WireType) -> MarshalResult<Json> {
    use WireType::*;
    let mismatch = || MarshalError::from(TypeMismatch::new(value, wire_type.clone()));
    match (value, wire_type) {
        (Value::String(s), String) => Ok(Json::String(s.clone())),
        (Value::Int(n), Int) => Ok((*n).into()),
        (Value::Uint32(n), Uint32) => Ok((*n).into()),
        // Through the shortest decimal form, so `0.1f32` stays `0.1` on the wire.
        (Value::Float32(x), Float32) => {
            float_to_json(x.to_string().parse().unwrap_or(f64::NAN), wire_type)
        }
        (Value::Float64(x), Float64) => float_to_json(*x, wire_type),
        (Value::Bool(b), Bool) => Ok(Json::Bool(*b)),
        (Value::List(items), List(inner)) => items
            .iter()
            .map(|item| to_json(item, inner))
            .collect::<MarshalResult<Vec<_>>>()
            .map(Json::Array),
        (Value::Map(entries), Map(inner)) => entries
            .iter()
            .map(|(k, v)| Ok((k.clone(), to_json(v, inner)?)))
            .collect::<MarshalResult<serde_json::Map<_, _>>>()
            .map(Json::Object),
        (Value::DbArrayFilter(v), Struct(DomainType::DbArrayFilter)) => {
            struct_to_json(v, wire_type)
        }
        (Value::DbFilters(v), Struct(DomainType::DbFilters)) => {
            struct_to_json(v, wire_type)
        }
        (Value::DbJsonFilter(v), Struct(DomainType::DbJsonFilter)) => {
            struct_to_json(v, wire_type)
        }
        (Value::DbResponse(v), Struct(DomainType::DbResponse)) => {
            struct_to_json(v, wire_type)
        }
        (Value::HistoricMessage(v), Struct(DomainType::HistoricMessage)) => {
            struct_to_json(v, wire_type)
        }
        _ => Err(mismatch()),
    }
}

fn float_to_json(x: f64, wire_type: &WireType) -> MarshalResult<Json> {
    Number::from_f64(x)
        .map(Json::Number)
        .ok_or_else(|| MarshalError::malformed(wire_type, format!("{x} has no JSON form")))
}

fn struct_to_json<T: serde::Serialize>(value: &T, wire_type: &WireType) -> MarshalResult<Json> {
    serde_json::to_value(value).map_err(|e| MarshalError::malformed(wire_type, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DbArrayFilter, DbFilters, DbJsonFilter, DbResponse, HistoricMessage};

    fn round_trip(value: Value, wire_type: WireType) {
        let wire = encode(&value, &wire_type).unwrap();
        let decoded = decode(&wire, &wire_type).unwrap();
        assert_eq!(decoded, value, "{wire_type} via {wire:?}");
    }

    #[test]
    fn scalars_round_trip() {
        round_trip(Value::String("hello, world".into()), WireType::String);
        round_trip(Value::String(String::new()), WireType::String);
        round_trip(Value::Int(-42), WireType::Int);
        round_trip(Value::Uint32(u32::MAX), WireType::Uint32);
        round_trip(Value::Float32(0.1), WireType::Float32);
        round_trip(Value::Float64(-1.5e300), WireType::Float64);
        round_trip(Value::Float64(f64::INFINITY), WireType::Float64);
        round_trip(Value::Bool(true), WireType::Bool);
        round_trip(Value::Bool(false), WireType::Bool);
    }

    #[test]
    fn containers_round_trip() {
        round_trip(
            Value::List(vec!["a".into(), "b \"quoted\"".into()]),
            WireType::list(WireType::String),
        );
        round_trip(
            Value::List(vec![Value::Float32(0.25), Value::Float32(3.1)]),
            WireType::list(WireType::Float32),
        );
        round_trip(Value::List(vec![]), WireType::list(WireType::Int));

        let entries = [("x", 1), ("y", -2)]
            .into_iter()
            .map(|(k, v)| (k.to_owned(), Value::Int(v)))
            .collect();
        round_trip(Value::Map(entries), WireType::map(WireType::Int));

        let nested = Value::List(vec![Value::List(vec![Value::Bool(true)]), Value::List(vec![])]);
        round_trip(nested, WireType::list(WireType::list(WireType::Bool)));
    }

    #[test]
    fn domain_structs_round_trip() {
        let filters = DbFilters {
            guid_filter: vec!["g1".into()],
            level_filter: vec!["leaf".into()],
            keywords_filter: DbArrayFilter {
                need_all: true,
                filter_data: vec!["beam".into()],
            },
            metadata_filter: vec![DbJsonFilter {
                field_name: "product".into(),
                field_type: "string".into(),
                filter_data: vec!["fluent".into()],
                need_all: false,
            }],
            ..Default::default()
        };
        round_trip(
            Value::DbFilters(filters),
            WireType::Struct(DomainType::DbFilters),
        );

        let response = DbResponse {
            guid: "abc".into(),
            text: "some text".into(),
            distance: 0.75,
            ..Default::default()
        };
        round_trip(
            Value::List(vec![Value::DbResponse(response)]),
            WireType::list(WireType::Struct(DomainType::DbResponse)),
        );

        round_trip(
            Value::HistoricMessage(HistoricMessage::new("user", "hi")),
            WireType::Struct(DomainType::HistoricMessage),
        );
    }

    #[test]
    fn empty_wire_values() {
        assert_eq!(
            decode("", &WireType::list(WireType::String)).unwrap(),
            Value::List(vec![])
        );
        assert_eq!(
            decode("", &WireType::map(WireType::Float64)).unwrap(),
            Value::Map(BTreeMap::new())
        );
        assert_eq!(
            decode("", &WireType::Struct(DomainType::DbArrayFilter)).unwrap(),
            Value::DbArrayFilter(DbArrayFilter::default())
        );
        assert_eq!(decode("", &WireType::String).unwrap(), Value::String(String::new()));

        for scalar in [
            WireType::Int,
            WireType::Uint32,
            WireType::Float32,
            WireType::Float64,
            WireType::Bool,
        ] {
            assert!(
                matches!(decode("", &scalar), Err(MarshalError::MalformedValue { .. })),
                "{scalar}"
            );
        }
    }

    #[test]
    fn malformed_values() {
        let cases = [
            ("abc", WireType::Int),
            ("-1", WireType::Uint32),
            ("yes", WireType::Bool),
            ("[1, 2", WireType::list(WireType::Int)),
            ("[1.5]", WireType::list(WireType::Int)),
            ("{\"a\": \"b\"}", WireType::list(WireType::String)),
            ("{\"a\": 1}", WireType::map(WireType::String)),
            ("{\"role\": 3}", WireType::Struct(DomainType::HistoricMessage)),
        ];
        for (wire, wire_type) in cases {
            let err = decode(wire, &wire_type).unwrap_err();
            assert!(
                matches!(err, MarshalError::MalformedValue { .. }),
                "{wire:?} as {wire_type}: {err}"
            );
        }
    }

    #[test]
    fn stream_marker_is_degenerate() {
        assert_eq!(decode("anything", &WireType::Stream).unwrap(), Value::Nil);
        assert_eq!(encode(&Value::Nil, &WireType::Stream).unwrap(), "");
        assert_eq!(encode(&Value::Int(3), &WireType::Stream).unwrap(), "");
    }

    #[test]
    fn encode_rejects_mismatched_values() {
        let err = encode(&Value::String("5".into()), &WireType::Int).unwrap_err();
        assert!(matches!(err, MarshalError::TypeMismatch(_)));

        let err = encode(
            &Value::List(vec![Value::Int(1), Value::String("two".into())]),
            &WireType::list(WireType::Int),
        )
        .unwrap_err();
        assert!(matches!(err, MarshalError::TypeMismatch(_)));

        let err = encode(
            &Value::List(vec![Value::Float64(f64::NAN)]),
            &WireType::list(WireType::Float64),
        )
        .unwrap_err();
        assert!(matches!(err, MarshalError::MalformedValue { .. }));
    }

    #[test]
    fn wire_type_tags() {
        for tag in [
            "string",
            "int",
            "uint32",
            "float32",
            "float64",
            "bool",
            "stream",
            "list<string>",
            "map<list<float32>>",
            "list<DbResponse>",
            "DbFilters",
        ] {
            let wire_type: WireType = tag.parse().unwrap();
            assert_eq!(wire_type.to_string(), tag);
        }

        for tag in ["", "integer", "list<stream>", "set<int>", "list<int", "Whatever"] {
            assert!(tag.parse::<WireType>().is_err(), "{tag:?}");
        }
        assert!(matches!(
            decode_tagged("1", "chan"),
            Err(MarshalError::UnsupportedType(_))
        ));
        assert!(matches!(
            encode_tagged(&Value::Int(1), "chan"),
            Err(MarshalError::UnsupportedType(_))
        ));
        assert_eq!(decode_tagged("7", "int").unwrap(), Value::Int(7));
    }
}
