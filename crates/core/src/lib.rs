//! busframe-core: schema-driven fixed-layout frame codec
//!
//! This library turns a nested record into a flat binary frame and back:
//! - Flattens a record into an ordered list of dotted-path fields
//! - Plans a fixed layout: byte width and offset per field, total frame size
//! - Encodes records into frames in native byte order, row-major
//! - Decodes frames with two-sided length validation
//!
//! # Architecture
//!
//! - `types`: Semantic types and the width table
//! - `value` / `record`: In-memory records
//! - `schema`: Field extraction from a record
//! - `layout`: Layout planning (`CodecPlan`)
//! - `encoder` / `decoder`: The codec
//! - `json`: Record documents
//! - `emit`: Source artifacts (definition, packer, unpacker) for a plan
//! - `sample`: Seeded random records matching a plan
//! - `network`: Datagram link simulator with seeded randomness
//! - `metrics`: Run counters and reports
//!
//! # Example
//!
//! ```
//! use busframe_core::{decode, encode, CodecPlan, Record};
//!
//! let record = Record::nested()
//!     .with("a", 1.5f64)
//!     .with("b", Record::nested().with("x", 3i32).with("y", 4i32));
//!
//! let plan = CodecPlan::from_record(&record)?;
//! assert_eq!(plan.total_bytes(), 16);
//!
//! let frame = encode(&plan, &record)?;
//! let decoded = decode(&plan, &frame, frame.len());
//! assert!(decoded.success);
//! assert_eq!(decoded.record, record);
//! # Ok::<(), busframe_core::Error>(())
//! ```
//!
//! # Design Principles
//!
//! - **No panics**: Structural problems are errors; malformed frames are data
//! - **Immutable plans**: A `CodecPlan` is built once and shared freely
//! - **Deterministic**: Seeded randomness makes simulated runs reproducible

pub mod decoder;
pub mod emit;
pub mod encoder;
pub mod error;
pub mod json;
pub mod layout;
pub mod metrics;
pub mod network;
pub mod record;
pub mod sample;
pub mod schema;
pub mod types;
pub mod value;

// Re-export commonly used types
pub use decoder::{check_frame, decode, Decoded, FrameCheck};
pub use emit::{Artifacts, RustEmitter, TargetEmitter};
pub use encoder::encode;
pub use error::{Error, Result};
pub use layout::{plan, CodecPlan, PlannedField};
pub use record::Record;
pub use schema::{extract, Field, FieldMeta};
pub use types::{type_width, FieldType, PrimitiveType};
pub use value::{Elements, Value};
