//! Sources emitted by [`busframe_core::emit::RustEmitter`] for
//! [`fixture::record`], compiled as part of this crate.
//!
//! Tests pack and unpack with the generated functions and compare against
//! the library's own `encode` and `decode` for the same plan.

pub mod fixture;

// Nested paths become `outer__inner` field names
#[allow(non_snake_case)]
mod generated {
    include!(concat!(env!("OUT_DIR"), "/fixture_frame.rs"));
}

pub use generated::*;
