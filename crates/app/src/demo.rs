//! Built-in demo record.
//!
//! Used when no `--record` is given. It covers the interesting corners of
//! the layout rules: nested records, a row-major matrix, booleans, an
//! enumeration, a complex-flagged scalar and field metadata.

use busframe_core::{FieldMeta, Record, Value};

fn meta(unit: &str, description: &str) -> FieldMeta {
    FieldMeta {
        unit: Some(unit.to_string()),
        description: Some(description.to_string()),
        ..FieldMeta::default()
    }
}

/// A vehicle telemetry record.
pub fn demo_record() -> Record {
    let pose = Record::nested()
        .with(
            "position",
            Value::vector(vec![0.0f64; 3]).with_meta(meta("m", "Position in the local frame")),
        )
        .with(
            "attitude",
            Value::vector(vec![1.0f32, 0.0, 0.0, 0.0]).with_meta(meta("1", "Unit quaternion, scalar first")),
        )
        .with("valid", true);

    let imu = Record::nested()
        .with("accel", Value::vector(vec![0i16; 3]).with_meta(meta("mg", "Raw accelerometer counts")))
        .with("gyro", Value::vector(vec![0i16; 3]).with_meta(meta("mdps", "Raw gyro counts")))
        .with("temperature", Value::from(25.0f32).with_meta(meta("degC", "Die temperature")));

    Record::nested()
        .with("timestamp", Value::from(0u64).with_meta(meta("us", "Time since boot")))
        .with("pose", pose)
        .with("imu", imu)
        .with("mode", Value::enumerated("FlightMode", 0u8))
        .with("covariance", Value::array(vec![0.0f32; 9], vec![3, 3]))
        .with("rf_gain", Value::from(1.0f64).with_complex(true))
        .with(
            "status",
            Record::nested()
                .with("armed", false)
                .with("battery_mv", 12_600u16)
                .with("faults", 0u32),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use busframe_core::CodecPlan;

    #[test]
    fn test_demo_record_plans() {
        let plan = CodecPlan::from_record(&demo_record()).unwrap();

        // 8 + (24 + 16 + 1) + (6 + 6 + 4) + 1 + 36 + 8 + (1 + 2 + 4)
        assert_eq!(plan.total_bytes(), 117);
        assert_eq!(plan.fields()[0].name(), "timestamp");
        assert_eq!(plan.field("pose.attitude").unwrap().offset, 32);
        assert_eq!(plan.field("status.faults").unwrap().range(), 113..117);
    }
}
