//! Frame encoding.
//!
//! Every field in the plan is looked up in the record by its dotted path,
//! checked against the plan, and written at its offset in native byte
//! order. Multi-dimensional values are written in row-major order.
//!
//! The frame is assembled in a local buffer and only returned once every
//! field has been written, so a failing record never yields a partial frame.

use bytes::{Bytes, BytesMut};

use crate::error::{EncodeError, Result};
use crate::layout::{CodecPlan, PlannedField};
use crate::record::Record;
use crate::schema::normalize_dims;
use crate::types::FieldType;
use crate::value::{describe_shape, Value};

/// Encode `record` into a frame of exactly `plan.total_bytes()` bytes.
///
/// # Errors
/// - `EncodeError::FieldMissing` if the record has nothing at a field's path
/// - `EncodeError::TypeMismatch` if the value's type, enumeration or shape
///   disagrees with the field, or the path names a nested record
pub fn encode(plan: &CodecPlan, record: &Record) -> Result<Bytes> {
    let mut frame = BytesMut::with_capacity(plan.total_bytes());

    for planned in plan.fields() {
        let value = lookup(record, planned)?;
        check_value(planned, value)?;

        debug_assert_eq!(frame.len(), planned.offset);
        value.elements().put_ne(&mut frame);
    }

    debug_assert_eq!(frame.len(), plan.total_bytes());
    Ok(frame.freeze())
}

fn lookup<'r>(record: &'r Record, planned: &PlannedField) -> Result<&'r Value> {
    match record.get(planned.name()) {
        Some(Record::Leaf(value)) => Ok(value),
        Some(Record::Nested(_)) => Err(EncodeError::TypeMismatch {
            path: planned.name().to_string(),
            expected: expected_label(planned),
            actual: "nested record".to_string(),
        }
        .into()),
        None => Err(EncodeError::FieldMissing {
            path: planned.name().to_string(),
        }
        .into()),
    }
}

fn check_value(planned: &PlannedField, value: &Value) -> Result<()> {
    let expected_enum = match &planned.field.ty {
        FieldType::Enumerated { name, .. } => Some(name.as_str()),
        FieldType::Primitive(_) => None,
    };

    let matches = value.elements().primitive() == planned.storage
        && value.enumeration() == expected_enum
        && value.len() == planned.element_count
        && normalize_dims(value.dims()) == normalize_dims(&planned.field.dims);

    if matches {
        Ok(())
    } else {
        Err(EncodeError::TypeMismatch {
            path: planned.name().to_string(),
            expected: expected_label(planned),
            actual: value.describe(),
        }
        .into())
    }
}

fn expected_label(planned: &PlannedField) -> String {
    describe_shape(&planned.field.ty, &planned.field.dims)
}
