//! Loading records from JSON documents.
//!
//! # Document Format
//!
//! An object is a leaf if its `"type"` member is a string; every other
//! object is a nested record whose members keep their document order.
//!
//! ```json
//! {
//!   "speed":  { "type": "single", "value": 12.5, "unit": "m/s" },
//!   "matrix": { "type": "int16", "dims": [2, 2], "value": [1, 2, 3, 4] },
//!   "gear":   { "type": "Enum: Gear", "storage": "uint8", "value": 2 },
//!   "status": { "ok": true, "count": 3.0 }
//! }
//! ```
//!
//! Leaf members:
//! - `type` (required): a type label, see [`crate::types`]
//! - `storage`: integer storage of an enumeration; required for `Enum:`
//!   labels that do not carry it as `Enum: Gear (uint8)`
//! - `dims`: shape; defaults to `[len]` for arrays and `[1]` for scalars
//! - `value`: a scalar or a flat row-major array; defaults to zeros, at most
//!   [`MAX_ZERO_FILL_BYTES`] of them
//! - `complex`, `unit`, `description`, `min`, `max`: metadata
//!
//! Shorthand: a bare boolean is a `boolean` scalar, a bare number a `double`
//! scalar, and a bare array of numbers a `double` vector.

use serde_json::{Map, Number, Value as Json};
use std::path::Path;

use crate::error::{Result, SchemaError};
use crate::record::{Record, SEPARATOR};
use crate::schema::{checked_element_count, FieldMeta};
use crate::types::{FieldType, PrimitiveType};
use crate::value::{Elements, Value};

/// Largest leaf, in bytes, filled with zeros when `value` is omitted.
pub const MAX_ZERO_FILL_BYTES: usize = 64 * 1024 * 1024;

/// Read a record document from a file.
pub fn load_record(path: &Path) -> Result<Record> {
    let text = std::fs::read_to_string(path)?;
    record_from_str(&text)
}

/// Parse a record document.
pub fn record_from_str(text: &str) -> Result<Record> {
    let json: Json = serde_json::from_str(text)?;
    record_from_json(&json)
}

/// Convert a parsed document into a record.
pub fn record_from_json(json: &Json) -> Result<Record> {
    node(json, "")
}

fn node(json: &Json, path: &str) -> Result<Record> {
    match json {
        Json::Object(map) if map.get("type").map_or(false, Json::is_string) => {
            Ok(Record::Leaf(leaf(map, path)?))
        }
        Json::Object(map) => {
            let mut record = Record::nested();
            for (name, member) in map {
                let child = if path.is_empty() {
                    name.clone()
                } else {
                    format!("{}{}{}", path, SEPARATOR, name)
                };
                record.push(name.clone(), node(member, &child)?);
            }
            Ok(record)
        }
        Json::Bool(b) => Ok(Value::from(*b).into()),
        Json::Number(_) | Json::Array(_) => {
            let elements = elements(PrimitiveType::Double, json, path)?;
            let dims = match json {
                Json::Array(items) => vec![items.len()],
                _ => vec![1],
            };
            Ok(Value::array(elements, dims).into())
        }
        Json::Null | Json::String(_) => Err(malformed(path, "expected an object, number, boolean or array")),
    }
}

fn leaf(map: &Map<String, Json>, path: &str) -> Result<Value> {
    let label = map.get("type").and_then(Json::as_str).unwrap_or_default();
    let ty: FieldType = label.parse().map_err(|e: String| malformed(path, &e))?;

    let storage = match (&ty, map.get("storage")) {
        (FieldType::Primitive(prim), None) => *prim,
        (FieldType::Primitive(_), Some(_)) => {
            return Err(malformed(path, "`storage` is only valid for enumerations"))
        }
        (FieldType::Enumerated { storage, .. }, explicit) => {
            let explicit = match explicit {
                Some(label) => Some(
                    label
                        .as_str()
                        .ok_or_else(|| malformed(path, "`storage` must be a type label"))?
                        .parse::<PrimitiveType>()
                        .map_err(|e| malformed(path, &e))?,
                ),
                None => None,
            };
            match (*storage, explicit) {
                (Some(a), Some(b)) if a != b => {
                    return Err(malformed(path, "conflicting enumeration storage"))
                }
                (Some(prim), _) | (None, Some(prim)) => prim,
                (None, None) => return Err(malformed(path, "enumeration needs a `storage` type")),
            }
        }
    };

    let value_json = map.get("value");
    let dims = match map.get("dims") {
        Some(dims) => dims_of(dims, path)?,
        None => match value_json {
            Some(Json::Array(items)) => vec![items.len()],
            _ => vec![1],
        },
    };

    let count = match checked_element_count(&dims) {
        Some(count) if count > 0 && !dims.is_empty() => count,
        _ => return Err(malformed(path, "`dims` must be non-empty, non-zero and not overflow")),
    };

    let elements = match value_json {
        Some(v) => elements(storage, v, path)?,
        None => {
            if count.saturating_mul(storage.width()) > MAX_ZERO_FILL_BYTES {
                return Err(malformed(path, "leaf too large to fill with zeros"));
            }
            Elements::zeroed(storage, count)
        }
    };

    let enumeration = match ty {
        FieldType::Enumerated { name, .. } => Some(name),
        FieldType::Primitive(_) => None,
    };

    let complex = match map.get("complex") {
        Some(flag) => flag
            .as_bool()
            .ok_or_else(|| malformed(path, "`complex` must be a boolean"))?,
        None => false,
    };

    Ok(Value::array(elements, dims)
        .with_complex(complex)
        .with_meta(meta_of(map, path)?)
        .with_enumeration(enumeration))
}

fn dims_of(json: &Json, path: &str) -> Result<Vec<usize>> {
    let bad = || malformed(path, "`dims` must be an array of non-negative integers");
    json.as_array()
        .ok_or_else(bad)?
        .iter()
        .map(|d| d.as_u64().and_then(|d| usize::try_from(d).ok()).ok_or_else(bad))
        .collect()
}

fn meta_of(map: &Map<String, Json>, path: &str) -> Result<FieldMeta> {
    let text = |key: &str| -> Result<Option<String>> {
        match map.get(key) {
            None => Ok(None),
            Some(Json::String(s)) => Ok(Some(s.clone())),
            Some(_) => Err(malformed(path, &format!("`{}` must be a string", key))),
        }
    };
    let number = |key: &str| -> Result<Option<f64>> {
        match map.get(key) {
            None => Ok(None),
            Some(v) => v
                .as_f64()
                .map(Some)
                .ok_or_else(|| malformed(path, &format!("`{}` must be a number", key))),
        }
    };

    Ok(FieldMeta {
        unit: text("unit")?,
        description: text("description")?,
        min: number("min")?,
        max: number("max")?,
    })
}

fn elements(prim: PrimitiveType, json: &Json, path: &str) -> Result<Elements> {
    let items: Vec<&Json> = match json {
        Json::Array(items) => items.iter().collect(),
        scalar => vec![scalar],
    };

    macro_rules! collect {
        ($variant:ident, $convert:expr) => {
            Elements::$variant(
                items
                    .iter()
                    .map(|item| {
                        $convert(*item).ok_or_else(|| {
                            malformed(path, &format!("{} is not a valid {}", item, prim))
                        })
                    })
                    .collect::<Result<Vec<_>>>()?,
            )
        };
    }

    Ok(match prim {
        PrimitiveType::Boolean => collect!(Boolean, |j: &Json| match j {
            Json::Bool(b) => Some(*b),
            Json::Number(n) => n.as_u64().filter(|n| *n <= 1).map(|n| n == 1),
            _ => None,
        }),
        PrimitiveType::Int8 => collect!(Int8, |j: &Json| int(j)),
        PrimitiveType::UInt8 => collect!(UInt8, |j: &Json| uint(j)),
        PrimitiveType::Int16 => collect!(Int16, |j: &Json| int(j)),
        PrimitiveType::UInt16 => collect!(UInt16, |j: &Json| uint(j)),
        PrimitiveType::Int32 => collect!(Int32, |j: &Json| int(j)),
        PrimitiveType::UInt32 => collect!(UInt32, |j: &Json| uint(j)),
        PrimitiveType::Int64 => collect!(Int64, |j: &Json| int(j)),
        PrimitiveType::UInt64 => collect!(UInt64, |j: &Json| uint(j)),
        PrimitiveType::Single => collect!(Single, |j: &Json| j.as_f64().map(|f| f as f32)),
        PrimitiveType::Double => collect!(Double, |j: &Json| j.as_f64()),
    })
}

fn int<T: TryFrom<i64>>(json: &Json) -> Option<T> {
    json.as_i64().and_then(|n| T::try_from(n).ok())
}

fn uint<T: TryFrom<u64>>(json: &Json) -> Option<T> {
    json.as_u64().and_then(|n| T::try_from(n).ok())
}

fn malformed(path: &str, reason: &str) -> crate::error::Error {
    SchemaError::Malformed {
        path: if path.is_empty() { "<root>".to_string() } else { path.to_string() },
        reason: reason.to_string(),
    }
    .into()
}

/// Render a record as a document [`record_from_json`] reads back.
pub fn record_to_json(record: &Record) -> Json {
    match record {
        Record::Nested(members) => Json::Object(
            members
                .iter()
                .map(|(name, member)| (name.clone(), record_to_json(member)))
                .collect(),
        ),
        Record::Leaf(value) => Json::Object(leaf_to_json(value)),
    }
}

fn leaf_to_json(value: &Value) -> Map<String, Json> {
    let mut map = Map::new();
    map.insert("type".to_string(), Json::String(value.field_type().to_string()));
    map.insert(
        "dims".to_string(),
        Json::Array(value.dims().iter().map(|d| Json::from(*d)).collect()),
    );

    let items: Vec<Json> = match value.elements() {
        Elements::Boolean(v) => v.iter().map(|x| Json::Bool(*x)).collect(),
        Elements::Int8(v) => v.iter().map(|x| Json::from(*x)).collect(),
        Elements::UInt8(v) => v.iter().map(|x| Json::from(*x)).collect(),
        Elements::Int16(v) => v.iter().map(|x| Json::from(*x)).collect(),
        Elements::UInt16(v) => v.iter().map(|x| Json::from(*x)).collect(),
        Elements::Int32(v) => v.iter().map(|x| Json::from(*x)).collect(),
        Elements::UInt32(v) => v.iter().map(|x| Json::from(*x)).collect(),
        Elements::Int64(v) => v.iter().map(|x| Json::from(*x)).collect(),
        Elements::UInt64(v) => v.iter().map(|x| Json::from(*x)).collect(),
        Elements::Single(v) => v.iter().map(|x| float(f64::from(*x))).collect(),
        Elements::Double(v) => v.iter().map(|x| float(*x)).collect(),
    };
    map.insert("value".to_string(), Json::Array(items));

    if value.is_complex() {
        map.insert("complex".to_string(), Json::Bool(true));
    }
    let meta = value.meta();
    if let Some(unit) = &meta.unit {
        map.insert("unit".to_string(), Json::String(unit.clone()));
    }
    if let Some(description) = &meta.description {
        map.insert("description".to_string(), Json::String(description.clone()));
    }
    if let Some(min) = meta.min {
        map.insert("min".to_string(), float(min));
    }
    if let Some(max) = meta.max {
        map.insert("max".to_string(), float(max));
    }
    map
}

// JSON has no NaN or infinity
fn float(x: f64) -> Json {
    Number::from_f64(x).map_or(Json::Null, Json::Number)
}
