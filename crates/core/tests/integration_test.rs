//! Integration tests for the full busframe pipeline.
//!
//! These tests verify end-to-end behavior: record document -> schema ->
//! plan -> encode -> simulated link -> decode, with verification that every
//! accepted frame reproduces the record that was sent.

use busframe_core::{
    check_frame, decode, encode, extract,
    emit::{RustEmitter, TargetEmitter},
    json::record_from_str,
    metrics::Metrics,
    network::{Datagram, DatagramSimulator, NetworkConfig},
    plan,
    sample::{generate_record, SampleGenerator},
    CodecPlan, Elements, FrameCheck, Record, Value,
};
use std::sync::Arc;
use std::thread;

const TELEMETRY: &str = r#"{
    "timestamp": { "type": "uint64", "value": 123456789, "unit": "us" },
    "pose": {
        "position": { "type": "double", "dims": [3], "value": [1.0, -2.0, 0.5] },
        "valid": true
    },
    "mode": { "type": "Enum: Mode", "storage": "int16", "value": 3 },
    "gains": { "type": "single", "dims": [2, 3], "value": [1, 2, 3, 4, 5, 6] },
    "flags": { "type": "boolean", "dims": [4], "value": [true, false, false, true] }
}"#;

fn telemetry() -> (Record, CodecPlan) {
    let record = record_from_str(TELEMETRY).expect("document should load");
    let plan = CodecPlan::from_record(&record).expect("plan should build");
    (record, plan)
}

/// Document to frame and back over a perfect link.
#[test]
fn test_full_pipeline_perfect_link() {
    let (record, plan) = telemetry();

    // 8 + 24 + 1 + 2 + 24 + 4
    assert_eq!(plan.total_bytes(), 63);

    let frame = encode(&plan, &record).expect("encoding failed");
    assert_eq!(frame.len(), plan.total_bytes());

    let mut link = DatagramSimulator::new(NetworkConfig::perfect(42));
    link.send(Datagram::new(0, frame));

    let datagram = link.recv().expect("datagram should be ready");
    let decoded = decode(&plan, &datagram.payload, datagram.declared_len);

    assert!(decoded.success);
    assert_eq!(decoded.record, record);
    assert_eq!(
        decoded.record.leaf("gains").unwrap().elements(),
        &Elements::Single(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0])
    );
}

/// The field offsets are the byte positions actually written.
#[test]
fn test_frame_matches_layout() {
    let (record, plan) = telemetry();
    let frame = encode(&plan, &record).unwrap();

    let mode = plan.field("mode").unwrap();
    assert_eq!(&frame[mode.range()], &3i16.to_ne_bytes());

    let timestamp = plan.field("timestamp").unwrap();
    assert_eq!(&frame[timestamp.range()], &123456789u64.to_ne_bytes());

    let flags = plan.field("flags").unwrap();
    assert_eq!(&frame[flags.range()], &[1, 0, 0, 1]);
}

/// Every accepted frame must verify; truncated ones must be rejected.
#[test]
fn test_impaired_link() {
    let (_, plan) = telemetry();

    let config = NetworkConfig {
        base_latency_ms: 0,
        jitter_ms: 0,
        loss_rate: 0.2,
        truncate_rate: 0.3,
        seed: 777,
    };
    let mut link = DatagramSimulator::new(config);
    let mut metrics = Metrics::new();

    let sent: Vec<Record> = SampleGenerator::new(&plan, 5).take(200).collect();
    for (seq, record) in sent.iter().enumerate() {
        let frame = encode(&plan, record).unwrap();
        metrics.record_encoded(frame.len());
        link.send(Datagram::new(seq as u64, frame));
    }

    for datagram in link.drain() {
        let check = check_frame(&plan, datagram.payload.len(), datagram.declared_len);
        metrics.record_check(check);

        let decoded = decode(&plan, &datagram.payload, datagram.declared_len);
        assert_eq!(decoded.success, !datagram.is_truncated());

        if decoded.success {
            if decoded.record != sent[datagram.seq as usize] {
                metrics.verify_mismatches += 1;
            }
        } else {
            assert!(matches!(check, FrameCheck::ShortBuffer { .. }));
            assert_eq!(decoded.record, plan.default_record());
        }
    }
    metrics.absorb_network(&link.stats());

    assert!(metrics.passed());
    assert_eq!(metrics.rejected_short, metrics.datagrams_truncated);
    assert_eq!(metrics.rejected_length, 0);
    assert_eq!(
        metrics.frames_decoded + metrics.frames_rejected(),
        metrics.datagrams_received
    );
    assert_eq!(
        metrics.datagrams_received + metrics.datagrams_dropped,
        metrics.frames_encoded
    );
    assert!(metrics.datagrams_dropped > 0);
    assert!(metrics.datagrams_truncated > 0);
}

/// A sender with a different schema declares a different length.
#[test]
fn test_schema_disagreement_rejected() {
    let (record, plan) = telemetry();

    let wider = record_from_str(&TELEMETRY.replace("\"int16\"", "\"int32\"")).unwrap();
    let wider_plan = CodecPlan::from_record(&wider).unwrap();
    assert_eq!(wider_plan.total_bytes(), plan.total_bytes() + 2);

    let frame = encode(&wider_plan, &wider).unwrap();
    let decoded = decode(&plan, &frame, frame.len());
    assert!(!decoded.success);

    // The receiver's own frames still decode
    let own = encode(&plan, &record).unwrap();
    assert!(decode(&plan, &own, own.len()).success);
}

/// Randomized round-trips across several shapes and seeds.
#[test]
fn test_randomized_round_trips() {
    let shapes = [
        Record::nested().with("x", 0u8),
        Record::nested()
            .with("a", 0.0f64)
            .with("b", Record::nested().with("x", 0i32).with("y", 0i32)),
        Record::nested()
            .with("deep", Record::nested().with("er", Record::nested().with("est", Value::vector(vec![0i64; 5]))))
            .with("cube", Value::array(vec![0.0f32; 24], vec![2, 3, 4]))
            .with("e", Value::enumerated("E", Elements::from(vec![0u32; 3]))),
    ];

    for shape in &shapes {
        let plan = CodecPlan::from_record(shape).unwrap();
        for seed in 0..25 {
            let record = generate_record(&plan, seed);
            let frame = encode(&plan, &record).unwrap();
            let decoded = decode(&plan, &frame, plan.total_bytes());
            assert!(decoded.success);
            assert_eq!(decoded.record, record, "seed {}", seed);
        }
    }
}

/// Extraction is stable and planning is independent of leaf values.
#[test]
fn test_extract_and_plan_are_stable() {
    let (record, plan_a) = telemetry();
    let fields = extract(&record).unwrap();
    assert_eq!(fields, extract(&record).unwrap());

    let other = generate_record(&plan_a, 99);
    let plan_b = plan(&extract(&other).unwrap()).unwrap();
    assert_eq!(plan_a, plan_b);
}

/// One plan shared by encoders and decoders on several threads.
#[test]
fn test_shared_plan_across_threads() {
    let (_, plan) = telemetry();
    let plan = Arc::new(plan);

    let handles: Vec<_> = (0..4u64)
        .map(|t| {
            let plan = Arc::clone(&plan);
            thread::spawn(move || {
                for seed in 0..50 {
                    let record = generate_record(&plan, t * 1000 + seed);
                    let frame = encode(&plan, &record).unwrap();
                    let decoded = decode(&plan, &frame, frame.len());
                    assert!(decoded.success);
                    assert_eq!(decoded.record, record);
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("worker panicked");
    }
}

/// Emitted sources follow the same layout and length rules.
#[test]
fn test_emitted_sources() {
    let (_, plan) = telemetry();
    let artifacts = RustEmitter::new("Telemetry").emit(&plan).unwrap();

    assert!(artifacts.definition.contains("pub const TELEMETRY_FRAME_BYTES: usize = 63;"));
    assert!(artifacts.definition.contains("pub pose__position: [f64; 3],"));
    assert!(artifacts.definition.contains("pub gains: [f32; 6],"));
    assert!(artifacts.definition.contains("pub mode: i16,"));
    assert!(artifacts.packer.contains("pack_telemetry"));
    assert!(artifacts.unpacker.contains("unpack_telemetry"));
    assert!(syn::parse_file(&artifacts.combined()).is_ok());

    let dir = std::env::temp_dir().join(format!("busframe-emit-{}", std::process::id()));
    let written = artifacts.write_to(&dir, "telemetry").unwrap();
    assert_eq!(written.len(), 3);
    assert!(written.iter().all(|p| p.exists()));
    std::fs::remove_dir_all(&dir).unwrap();
}
