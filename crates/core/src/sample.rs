//! Sample record generation.
//!
//! Produces random records that match a plan, for exercising the codec and
//! the simulated link. All randomness comes from a seeded ChaCha8 RNG, so the
//! same plan and seed always produce the same records.
//!
//! Floating-point elements are finite and drawn from a bounded range, and
//! enumeration tags are small non-negative integers, so generated records
//! compare equal to themselves after a round trip.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::layout::{CodecPlan, PlannedField};
use crate::record::Record;
use crate::types::PrimitiveType;
use crate::value::Elements;

/// Largest enumeration tag generated.
const MAX_ENUM_TAG: u8 = 8;

/// Deterministic source of records for one plan.
pub struct SampleGenerator<'p> {
    plan: &'p CodecPlan,
    rng: ChaCha8Rng,
}

impl<'p> SampleGenerator<'p> {
    pub fn new(plan: &'p CodecPlan, seed: u64) -> Self {
        Self {
            plan,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Generate the next record.
    pub fn next_record(&mut self) -> Record {
        let mut record = Record::nested();
        for planned in self.plan.fields() {
            let elements = self.elements_for(planned);
            record.insert_path(planned.name(), planned.value_from(elements));
        }
        record
    }

    fn elements_for(&mut self, planned: &PlannedField) -> Elements {
        let count = planned.element_count;
        let rng = &mut self.rng;

        if planned.field.ty.is_enumerated() {
            let tags: Vec<u8> = (0..count).map(|_| rng.gen_range(0..=MAX_ENUM_TAG)).collect();
            return enum_tags(planned.storage, tags);
        }

        match planned.storage {
            PrimitiveType::Boolean => Elements::Boolean((0..count).map(|_| rng.gen()).collect()),
            PrimitiveType::Int8 => Elements::Int8((0..count).map(|_| rng.gen()).collect()),
            PrimitiveType::UInt8 => Elements::UInt8((0..count).map(|_| rng.gen()).collect()),
            PrimitiveType::Int16 => Elements::Int16((0..count).map(|_| rng.gen()).collect()),
            PrimitiveType::UInt16 => Elements::UInt16((0..count).map(|_| rng.gen()).collect()),
            PrimitiveType::Int32 => Elements::Int32((0..count).map(|_| rng.gen()).collect()),
            PrimitiveType::UInt32 => Elements::UInt32((0..count).map(|_| rng.gen()).collect()),
            PrimitiveType::Int64 => Elements::Int64((0..count).map(|_| rng.gen()).collect()),
            PrimitiveType::UInt64 => Elements::UInt64((0..count).map(|_| rng.gen()).collect()),
            PrimitiveType::Single => {
                Elements::Single((0..count).map(|_| rng.gen_range(-1.0e3f32..1.0e3)).collect())
            }
            PrimitiveType::Double => {
                Elements::Double((0..count).map(|_| rng.gen_range(-1.0e6f64..1.0e6)).collect())
            }
        }
    }
}

impl Iterator for SampleGenerator<'_> {
    type Item = Record;

    fn next(&mut self) -> Option<Record> {
        Some(self.next_record())
    }
}

// Widen small tags into the enumeration's storage type.
fn enum_tags(storage: PrimitiveType, tags: Vec<u8>) -> Elements {
    match storage {
        PrimitiveType::Int8 => Elements::Int8(tags.iter().map(|&t| t as i8).collect()),
        PrimitiveType::UInt8 => Elements::UInt8(tags),
        PrimitiveType::Int16 => Elements::Int16(tags.iter().map(|&t| i16::from(t)).collect()),
        PrimitiveType::UInt16 => Elements::UInt16(tags.iter().map(|&t| u16::from(t)).collect()),
        PrimitiveType::Int32 => Elements::Int32(tags.iter().map(|&t| i32::from(t)).collect()),
        PrimitiveType::UInt32 => Elements::UInt32(tags.iter().map(|&t| u32::from(t)).collect()),
        PrimitiveType::Int64 => Elements::Int64(tags.iter().map(|&t| i64::from(t)).collect()),
        PrimitiveType::UInt64 => Elements::UInt64(tags.iter().map(|&t| u64::from(t)).collect()),
        // Planning only admits integer enumeration storage
        PrimitiveType::Boolean | PrimitiveType::Single | PrimitiveType::Double => {
            Elements::zeroed(storage, tags.len())
        }
    }
}

/// Generate one record matching `plan`.
pub fn generate_record(plan: &CodecPlan, seed: u64) -> Record {
    SampleGenerator::new(plan, seed).next_record()
}
