//! Emits Rust frame sources for the fixture record into `OUT_DIR`.

#[path = "src/fixture.rs"]
mod fixture;

use anyhow::Context;
use busframe_core::{
    emit::{RustEmitter, TargetEmitter},
    CodecPlan,
};
use std::path::PathBuf;

fn main() -> anyhow::Result<()> {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=src/fixture.rs");

    let plan = CodecPlan::from_record(&fixture::record()).context("fixture record does not plan")?;
    let artifacts = RustEmitter::new(fixture::TYPE_NAME)
        .emit(&plan)
        .context("failed to emit fixture sources")?;

    let out = PathBuf::from(std::env::var("OUT_DIR")?).join("fixture_frame.rs");
    std::fs::write(&out, artifacts.combined())
        .with_context(|| format!("failed to write {}", out.display()))?;
    Ok(())
}
