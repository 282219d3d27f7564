//! Layout planning: widths, offsets and the frame size.
//!
//! # Frame Format
//!
//! ```text
//! +------------------+------------------+-----+------------------+
//! | field 0          | field 1          | ... | field N-1        |
//! | width_0 bytes    | width_1 bytes    |     | width_N-1 bytes  |
//! +------------------+------------------+-----+------------------+
//! ^ offset 0         ^ offset width_0
//! ```
//!
//! `width = type_width(type) * product(dims)` and each offset is the sum of
//! the widths before it. There is no header, padding, alignment or length
//! prefix; the frame is exactly `total_bytes` long.
//!
//! A [`CodecPlan`] is computed once per schema and never mutated. It is
//! `Send + Sync`, so encoders and decoders on several threads can share one
//! through an `Arc`.

use serde::Serialize;
use std::collections::HashSet;
use std::ops::Range;
use tracing::debug;

use crate::error::{LayoutError, Result};
use crate::record::Record;
use crate::schema::{extract, Field};
use crate::types::{FieldType, PrimitiveType};
use crate::value::{Elements, Value};

/// A field annotated with its position in the frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlannedField {
    #[serde(flatten)]
    pub field: Field,

    /// Primitive each element is stored as
    pub storage: PrimitiveType,

    /// Product of the dimensions
    pub element_count: usize,

    pub width_bytes: usize,

    pub offset: usize,
}

impl PlannedField {
    /// Byte range of this field within the frame.
    pub fn range(&self) -> Range<usize> {
        self.offset..self.offset + self.width_bytes
    }

    pub fn name(&self) -> &str {
        &self.field.name
    }

    /// Wrap decoded elements in a value carrying this field's shape and metadata.
    pub(crate) fn value_from(&self, elements: Elements) -> Value {
        let enumeration = match &self.field.ty {
            FieldType::Enumerated { name, .. } => Some(name.clone()),
            FieldType::Primitive(_) => None,
        };

        Value::array(elements, self.field.dims.clone())
            .with_complex(self.field.is_complex)
            .with_meta(self.field.meta.clone())
            .with_enumeration(enumeration)
    }
}

/// The immutable layout shared by encoder and decoder.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CodecPlan {
    fields: Vec<PlannedField>,
    total_bytes: usize,
}

impl CodecPlan {
    /// Extract and plan in one step.
    pub fn from_record(record: &Record) -> Result<Self> {
        plan(&extract(record)?)
    }

    pub fn fields(&self) -> &[PlannedField] {
        &self.fields
    }

    /// Frame size in bytes.
    pub fn total_bytes(&self) -> usize {
        self.total_bytes
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn field(&self, name: &str) -> Option<&PlannedField> {
        self.fields.iter().find(|f| f.field.name == name)
    }

    /// A record holding zero (or `false`) at every field.
    pub fn default_record(&self) -> Record {
        let mut record = Record::nested();
        for planned in &self.fields {
            let zeros = Elements::zeroed(planned.storage, planned.element_count);
            record.insert_path(&planned.field.name, planned.value_from(zeros));
        }
        record
    }

    /// The plan as pretty-printed JSON.
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Compute widths, offsets and the frame size for `fields`.
///
/// Pure; offsets are assigned in list order starting at 0. On error no plan
/// is produced.
///
/// # Errors
/// - `LayoutError::UnsupportedType` if a field's type has no width (an
///   enumeration without integer storage)
/// - `LayoutError::EmptySchema` if `fields` is empty
/// - `LayoutError::DuplicateField` if two fields share a name
/// - `LayoutError::InvalidDimensions` if a shape is empty or has a zero
/// - `LayoutError::FrameTooLarge` on arithmetic overflow
pub fn plan(fields: &[Field]) -> Result<CodecPlan> {
    if fields.is_empty() {
        return Err(LayoutError::EmptySchema.into());
    }

    let mut seen = HashSet::with_capacity(fields.len());
    let mut planned = Vec::with_capacity(fields.len());
    let mut offset = 0usize;

    for field in fields {
        if !seen.insert(field.name.as_str()) {
            return Err(LayoutError::DuplicateField {
                field: field.name.clone(),
            }
            .into());
        }

        let storage = storage_of(field)?;

        if field.dims.is_empty() || field.dims.contains(&0) {
            return Err(LayoutError::InvalidDimensions {
                field: field.name.clone(),
                dims: field.dims.clone(),
            }
            .into());
        }

        let too_large = || LayoutError::FrameTooLarge {
            field: field.name.clone(),
        };

        let element_count = field
            .dims
            .iter()
            .try_fold(1usize, |acc, &d| acc.checked_mul(d))
            .ok_or_else(too_large)?;
        let width_bytes = storage
            .width()
            .checked_mul(element_count)
            .ok_or_else(too_large)?;

        planned.push(PlannedField {
            field: field.clone(),
            storage,
            element_count,
            width_bytes,
            offset,
        });

        offset = offset.checked_add(width_bytes).ok_or_else(too_large)?;
    }

    debug!(fields = planned.len(), total_bytes = offset, "planned frame layout");

    Ok(CodecPlan {
        fields: planned,
        total_bytes: offset,
    })
}

fn storage_of(field: &Field) -> Result<PrimitiveType> {
    let unsupported = || LayoutError::UnsupportedType {
        field: field.name.clone(),
        ty: field.ty.to_string(),
    };

    match &field.ty {
        FieldType::Primitive(prim) => Ok(*prim),
        FieldType::Enumerated {
            storage: Some(prim),
            ..
        } if prim.is_integer() => Ok(*prim),
        FieldType::Enumerated { .. } => Err(unsupported().into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn summary(plan: &CodecPlan) -> Vec<(&str, usize, usize)> {
        plan.fields()
            .iter()
            .map(|f| (f.name(), f.width_bytes, f.offset))
            .collect()
    }

    #[test]
    fn test_nested_example_layout() {
        let record = Record::nested()
            .with("a", 0.0f64)
            .with("b", Record::nested().with("x", 0i32).with("y", 0i32));

        let plan = CodecPlan::from_record(&record).unwrap();

        assert_eq!(summary(&plan), [("a", 8, 0), ("b.x", 4, 8), ("b.y", 4, 12)]);
        assert_eq!(plan.total_bytes(), 16);
    }

    #[test]
    fn test_width_uses_dims() {
        let fields = vec![
            Field::new("flag", PrimitiveType::Boolean),
            Field::new("m", PrimitiveType::Single).with_dims(vec![2, 3]),
            Field::new("c", PrimitiveType::UInt16).with_dims(vec![4]),
        ];

        let plan = plan(&fields).unwrap();
        assert_eq!(summary(&plan), [("flag", 1, 0), ("m", 24, 1), ("c", 8, 25)]);
        assert_eq!(plan.total_bytes(), 33);
        assert_eq!(plan.field("c").unwrap().range(), 25..33);
    }

    #[test]
    fn test_width_independent_of_values() {
        let a = Record::nested().with("v", Value::vector(vec![0i64, 0, 0]));
        let b = Record::nested().with("v", Value::vector(vec![i64::MAX, -1, 42]));

        let plan_a = CodecPlan::from_record(&a).unwrap();
        let plan_b = CodecPlan::from_record(&b).unwrap();
        assert_eq!(plan_a, plan_b);
        assert_eq!(plan_a.total_bytes(), 24);
    }

    #[test]
    fn test_complex_does_not_change_width() {
        let mut field = Field::new("z", PrimitiveType::Double);
        field.is_complex = true;
        let plan = plan(&[field]).unwrap();
        assert_eq!(plan.total_bytes(), 8);
    }

    #[test]
    fn test_resolved_enum_uses_storage_width() {
        let fields = vec![Field::new(
            "gear",
            FieldType::Enumerated {
                name: "Gear".to_string(),
                storage: Some(PrimitiveType::Int32),
            },
        )];
        assert_eq!(plan(&fields).unwrap().total_bytes(), 4);
    }

    #[test]
    fn test_unsupported_type_rejected() {
        let fields = vec![
            Field::new("ok", PrimitiveType::Double),
            Field::new("gear", "Enum: Gear".parse::<FieldType>().unwrap()),
        ];

        match plan(&fields) {
            Err(Error::Layout(LayoutError::UnsupportedType { field, .. })) => {
                assert_eq!(field, "gear")
            }
            other => panic!("expected UnsupportedType, got {:?}", other),
        }

        let float_enum = vec![Field::new(
            "mode",
            FieldType::Enumerated {
                name: "Mode".to_string(),
                storage: Some(PrimitiveType::Double),
            },
        )];
        assert!(matches!(
            plan(&float_enum),
            Err(Error::Layout(LayoutError::UnsupportedType { .. }))
        ));
    }

    #[test]
    fn test_structural_errors() {
        assert!(matches!(plan(&[]), Err(Error::Layout(LayoutError::EmptySchema))));

        let duplicate = vec![
            Field::new("a", PrimitiveType::UInt8),
            Field::new("a", PrimitiveType::UInt8),
        ];
        assert!(matches!(
            plan(&duplicate),
            Err(Error::Layout(LayoutError::DuplicateField { .. }))
        ));

        let zero = vec![Field::new("a", PrimitiveType::UInt8).with_dims(vec![3, 0])];
        assert!(matches!(
            plan(&zero),
            Err(Error::Layout(LayoutError::InvalidDimensions { .. }))
        ));

        let huge = vec![Field::new("a", PrimitiveType::Double).with_dims(vec![usize::MAX, 2])];
        assert!(matches!(
            plan(&huge),
            Err(Error::Layout(LayoutError::FrameTooLarge { .. }))
        ));
    }

    #[test]
    fn test_default_record() {
        let record = Record::nested()
            .with("a", 3.0f64)
            .with("b", Record::nested().with("on", true).with("n", Value::vector(vec![7u8, 8])));
        let plan = CodecPlan::from_record(&record).unwrap();

        let zero = plan.default_record();
        assert_eq!(zero.leaf("a"), Some(&Value::from(0.0f64)));
        assert_eq!(zero.leaf("b.on"), Some(&Value::from(false)));
        assert_eq!(zero.leaf("b.n"), Some(&Value::vector(vec![0u8, 0])));
    }

    #[test]
    fn test_layout_json() {
        let plan = plan(&[Field::new("speed", PrimitiveType::Single)]).unwrap();
        let json = plan.to_json_pretty().unwrap();
        assert!(json.contains("\"speed\""));
        assert!(json.contains("\"total_bytes\": 4"));
        assert!(json.contains("\"width_bytes\": 4"));
    }
}
