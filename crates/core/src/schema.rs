//! Schema extraction: flatten a nested record into an ordered field list.
//!
//! # Algorithm
//!
//! Members are visited depth-first in declaration order. A nested record
//! contributes no field of its own; its leaves are spliced into the output
//! at the position of the nested member, with the member name prepended to
//! their paths. A leaf contributes exactly one [`Field`].
//!
//! ```text
//! { a: double, b: { x: int32, y: int32 }, c: boolean }
//!
//!   -> a, b.x, b.y, c
//! ```
//!
//! The order is a pure function of the record's shape, so extracting the
//! same shape twice yields equal field lists. Layout offsets and decoder
//! reconstruction both rely on this.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

use crate::error::{Result, SchemaError};
use crate::record::{Record, SEPARATOR};
use crate::types::FieldType;
use crate::value::Value;

/// Descriptive metadata carried through to emitted artifacts.
///
/// Never affects layout or codec behavior.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

impl FieldMeta {
    pub fn is_empty(&self) -> bool {
        self == &FieldMeta::default()
    }
}

/// One flattened leaf of a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    /// Dot-delimited path from the record root
    pub name: String,

    /// Semantic type
    #[serde(rename = "type")]
    pub ty: FieldType,

    /// Shape; a scalar is `[1]`
    pub dims: Vec<usize>,

    /// Complex flag (metadata only)
    #[serde(default)]
    pub is_complex: bool,

    #[serde(default, skip_serializing_if = "FieldMeta::is_empty")]
    pub meta: FieldMeta,
}

impl Field {
    /// A real scalar field.
    pub fn new(name: impl Into<String>, ty: impl Into<FieldType>) -> Self {
        Self {
            name: name.into(),
            ty: ty.into(),
            dims: vec![1],
            is_complex: false,
            meta: FieldMeta::default(),
        }
    }

    pub fn with_dims(mut self, dims: Vec<usize>) -> Self {
        self.dims = dims;
        self
    }

    /// Product of the dimensions.
    pub fn element_count(&self) -> usize {
        self.dims.iter().product()
    }

    /// Whether two fields agree on everything layout depends on.
    pub fn same_shape(&self, other: &Field) -> bool {
        self.name == other.name && self.ty == other.ty && self.dims == other.dims
    }
}

/// Product of `dims`, or `None` if it overflows `usize`.
pub fn checked_element_count(dims: &[usize]) -> Option<usize> {
    dims.iter().try_fold(1usize, |acc, &d| acc.checked_mul(d))
}

/// Collapse any shape holding a single element to `[1]`.
pub fn normalize_dims(dims: &[usize]) -> Vec<usize> {
    if !dims.is_empty() && checked_element_count(dims) == Some(1) {
        vec![1]
    } else {
        dims.to_vec()
    }
}

/// Flatten `record` into its ordered field list.
///
/// # Errors
/// - `SchemaError::NotARecord` if `record` is a leaf
/// - `SchemaError::EmptyRecord` if the root or any nested record is empty
/// - `SchemaError::InvalidMemberName` / `DuplicateMember` for bad names
/// - `SchemaError::InvalidDimensions` / `ElementCount` for malformed leaves
pub fn extract(record: &Record) -> Result<Vec<Field>> {
    let members = match record {
        Record::Nested(members) => members,
        Record::Leaf(_) => return Err(SchemaError::NotARecord.into()),
    };

    let mut fields = Vec::new();
    flatten(members, "", &mut fields)?;

    debug!(fields = fields.len(), "extracted schema");
    Ok(fields)
}

fn flatten(members: &[(String, Record)], prefix: &str, out: &mut Vec<Field>) -> Result<()> {
    if members.is_empty() {
        let path = if prefix.is_empty() { "<root>" } else { prefix };
        return Err(SchemaError::EmptyRecord {
            path: path.to_string(),
        }
        .into());
    }

    let mut seen = HashSet::with_capacity(members.len());

    for (name, member) in members {
        if name.is_empty() || name.contains(SEPARATOR) {
            return Err(SchemaError::InvalidMemberName {
                parent: if prefix.is_empty() { "<root>".to_string() } else { prefix.to_string() },
                name: name.clone(),
            }
            .into());
        }

        let path = if prefix.is_empty() {
            name.clone()
        } else {
            format!("{}{}{}", prefix, SEPARATOR, name)
        };

        if !seen.insert(name.as_str()) {
            return Err(SchemaError::DuplicateMember { path }.into());
        }

        match member {
            Record::Nested(children) => flatten(children, &path, out)?,
            Record::Leaf(value) => out.push(leaf_field(path, value)?),
        }
    }

    Ok(())
}

fn leaf_field(path: String, value: &Value) -> Result<Field> {
    let dims = value.dims();
    let expected = match checked_element_count(dims) {
        Some(count) if count > 0 && !dims.is_empty() => count,
        _ => {
            return Err(SchemaError::InvalidDimensions {
                path,
                dims: dims.to_vec(),
            }
            .into())
        }
    };

    if value.len() != expected {
        return Err(SchemaError::ElementCount {
            path,
            dims: dims.to_vec(),
            expected,
            actual: value.len(),
        }
        .into());
    }

    let ty = value.field_type();
    if let FieldType::Enumerated { storage: Some(prim), .. } = &ty {
        if !prim.is_integer() {
            return Err(SchemaError::EnumStorage {
                path,
                storage: prim.to_string(),
            }
            .into());
        }
    }

    Ok(Field {
        name: path,
        ty,
        dims: normalize_dims(dims),
        is_complex: value.is_complex(),
        meta: value.meta().clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::types::PrimitiveType;

    fn names(fields: &[Field]) -> Vec<&str> {
        fields.iter().map(|f| f.name.as_str()).collect()
    }

    #[test]
    fn test_nested_flattening() {
        let record = Record::nested()
            .with("a", 1.0f64)
            .with("b", Record::nested().with("x", 1i32).with("y", 2i32));

        let fields = extract(&record).unwrap();

        assert_eq!(names(&fields), ["a", "b.x", "b.y"]);
        assert_eq!(fields[0].ty, FieldType::Primitive(PrimitiveType::Double));
        assert_eq!(fields[1].ty, FieldType::Primitive(PrimitiveType::Int32));
    }

    #[test]
    fn test_depth_first_before_next_sibling() {
        let record = Record::nested()
            .with(
                "status",
                Record::nested()
                    .with("errorCode", 0u16)
                    .with("flags", Record::nested().with("ok", true).with("stale", false)),
            )
            .with("speed", 3.5f32)
            .with("gear", Value::enumerated("Gear", 2u8));

        let fields = extract(&record).unwrap();
        assert_eq!(
            names(&fields),
            ["status.errorCode", "status.flags.ok", "status.flags.stale", "speed", "gear"]
        );
        assert!(fields[4].ty.is_enumerated());
    }

    #[test]
    fn test_order_stability() {
        let record = Record::nested()
            .with("z", 1u8)
            .with("a", Record::nested().with("m", 2u8).with("b", 3u8));

        let first = extract(&record).unwrap();
        let second = extract(&record.clone()).unwrap();

        assert_eq!(first.len(), second.len());
        for (f, s) in first.iter().zip(&second) {
            assert!(f.same_shape(s));
        }
        // Declaration order, not alphabetical
        assert_eq!(names(&first), ["z", "a.m", "a.b"]);
    }

    #[test]
    fn test_scalar_collapse() {
        let record = Record::nested().with("k", Value::array(vec![4.0f64], vec![1, 1]));
        let fields = extract(&record).unwrap();
        assert_eq!(fields[0].dims, vec![1]);
    }

    #[test]
    fn test_matrix_dims_kept() {
        let record = Record::nested().with("m", Value::array(vec![0i16; 6], vec![2, 3]));
        let fields = extract(&record).unwrap();
        assert_eq!(fields[0].dims, vec![2, 3]);
        assert_eq!(fields[0].element_count(), 6);
    }

    #[test]
    fn test_metadata_carried() {
        let meta = FieldMeta {
            unit: Some("m/s".to_string()),
            description: Some("ground speed".to_string()),
            min: Some(0.0),
            max: Some(90.0),
        };
        let record = Record::nested().with(
            "v",
            Value::from(1.0f64).with_meta(meta.clone()).with_complex(true),
        );

        let fields = extract(&record).unwrap();
        assert_eq!(fields[0].meta, meta);
        assert!(fields[0].is_complex);
    }

    #[test]
    fn test_leaf_root_rejected() {
        let result = extract(&Record::from(Value::from(1.0f64)));
        assert!(matches!(result, Err(Error::Schema(SchemaError::NotARecord))));
    }

    #[test]
    fn test_empty_rejected() {
        let result = extract(&Record::nested());
        assert!(matches!(result, Err(Error::Schema(SchemaError::EmptyRecord { .. }))));

        let result = extract(&Record::nested().with("a", 1u8).with("b", Record::nested()));
        match result {
            Err(Error::Schema(SchemaError::EmptyRecord { path })) => assert_eq!(path, "b"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_bad_names_rejected() {
        let dotted = Record::nested().with("a.b", 1u8);
        assert!(matches!(
            extract(&dotted),
            Err(Error::Schema(SchemaError::InvalidMemberName { .. }))
        ));

        let duplicate = Record::nested().with("a", 1u8).with("a", 2u8);
        assert!(matches!(
            extract(&duplicate),
            Err(Error::Schema(SchemaError::DuplicateMember { .. }))
        ));
    }

    #[test]
    fn test_shape_mismatch_rejected() {
        let record = Record::nested().with("m", Value::array(vec![1.0f32; 5], vec![2, 3]));
        assert!(matches!(
            extract(&record),
            Err(Error::Schema(SchemaError::ElementCount { expected: 6, actual: 5, .. }))
        ));

        let record = Record::nested().with("m", Value::array(Vec::<f32>::new(), vec![0]));
        assert!(matches!(
            extract(&record),
            Err(Error::Schema(SchemaError::InvalidDimensions { .. }))
        ));
    }

    #[test]
    fn test_overflowing_dims_rejected() {
        let record = Record::nested().with("m", Value::array(Vec::<u8>::new(), vec![1 << 32, 1 << 32]));
        match extract(&record) {
            Err(Error::Schema(SchemaError::InvalidDimensions { path, dims })) => {
                assert_eq!(path, "m");
                assert_eq!(dims, vec![1 << 32, 1 << 32]);
            }
            other => panic!("unexpected result: {:?}", other),
        }

        assert_eq!(checked_element_count(&[usize::MAX, 2]), None);
        assert_eq!(normalize_dims(&[usize::MAX, 2]), vec![usize::MAX, 2]);
        assert_eq!(checked_element_count(&[2, 3, 4]), Some(24));
    }

    #[test]
    fn test_float_enum_rejected() {
        let record = Record::nested().with("e", Value::enumerated("Mode", 1.0f64));
        assert!(matches!(
            extract(&record),
            Err(Error::Schema(SchemaError::EnumStorage { .. }))
        ));
    }
}
