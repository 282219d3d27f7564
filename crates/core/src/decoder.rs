//! Frame decoding with two-sided length validation.
//!
//! A receiver gets a byte buffer plus a declared length (how many bytes the
//! sender says make up the frame). The frame is accepted only if:
//!
//! 1. the declared length equals the plan's frame size exactly, and
//! 2. the buffer actually holds at least the declared number of bytes.
//!
//! Checking only "enough bytes available" would accept a frame whose sender
//! disagrees about the schema; checking only the declared length would read
//! past a truncated buffer. Both must hold.
//!
//! A rejected frame is routine on a lossy link, so it is reported through
//! [`Decoded::success`] rather than as an error, and the record is the plan's
//! default (all zeros). Buffers longer than the frame are accepted; only the
//! first `total_bytes` bytes are read.

use tracing::trace;

use crate::layout::CodecPlan;
use crate::record::Record;
use crate::value::Elements;

/// Outcome of the length validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameCheck {
    /// Both checks hold
    Valid,

    /// Declared length differs from the plan's frame size
    LengthMismatch { declared: usize, expected: usize },

    /// Fewer bytes are available than were declared
    ShortBuffer { declared: usize, available: usize },
}

impl FrameCheck {
    pub fn is_valid(&self) -> bool {
        matches!(self, FrameCheck::Valid)
    }
}

/// Result of decoding one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded {
    /// Reconstructed record, or the plan's default record on failure
    pub record: Record,

    /// Whether the frame passed validation
    pub success: bool,
}

impl Decoded {
    pub fn into_parts(self) -> (Record, bool) {
        (self.record, self.success)
    }
}

/// Validate a frame's lengths against `plan` without touching its bytes.
pub fn check_frame(plan: &CodecPlan, available: usize, declared_length: usize) -> FrameCheck {
    if declared_length != plan.total_bytes() {
        return FrameCheck::LengthMismatch {
            declared: declared_length,
            expected: plan.total_bytes(),
        };
    }

    if available < declared_length {
        return FrameCheck::ShortBuffer {
            declared: declared_length,
            available,
        };
    }

    FrameCheck::Valid
}

/// Decode `buffer` against `plan`. Never fails and never reads past the
/// available bytes.
pub fn decode(plan: &CodecPlan, buffer: &[u8], declared_length: usize) -> Decoded {
    let check = check_frame(plan, buffer.len(), declared_length);
    if !check.is_valid() {
        trace!(?check, "rejected frame");
        return Decoded {
            record: plan.default_record(),
            success: false,
        };
    }

    let mut frame = &buffer[..plan.total_bytes()];
    let mut record = Record::nested();

    for planned in plan.fields() {
        let elements = Elements::get_ne(planned.storage, planned.element_count, &mut frame);
        record.insert_path(planned.name(), planned.value_from(elements));
    }

    Decoded {
        record,
        success: true,
    }
}
