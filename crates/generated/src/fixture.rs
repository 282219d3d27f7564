//! The record the build script emits sources for.

use busframe_core::{FieldMeta, Record, Value};

pub const TYPE_NAME: &str = "Telemetry";

pub fn record() -> Record {
    let timestamp = Value::from(123_456_789u64).with_meta(FieldMeta {
        unit: Some("us".to_string()),
        min: Some(0.0),
        max: Some(1e12),
        ..FieldMeta::default()
    });

    Record::nested()
        .with("timestamp", timestamp)
        .with(
            "pose",
            Record::nested()
                .with("position", Value::vector(vec![1.0f64, -2.0, 0.5]))
                .with("valid", true),
        )
        .with("mode", Value::enumerated("Mode", -3i16))
        .with("gains", Value::array(vec![1.5f32, 2.0, 3.0, 4.0, 5.0, -6.25], vec![2, 3]))
        .with("flags", Value::vector(vec![true, false, false, true]))
        .with("type", 7u8)
}
