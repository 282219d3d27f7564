//! busframe: derive a fixed frame layout from a record and exercise it
//!
//! USAGE:
//!   busframe [OPTIONS]
//!
//! Pipeline:
//! record -> schema -> plan -> [emit sources] -> sample frames -> link -> decode -> verify

mod config;
mod demo;

use anyhow::{bail, Context};
use busframe_core::{
    check_frame, decode, encode,
    emit::{RustEmitter, TargetEmitter},
    json,
    metrics::Metrics,
    network::{Datagram, DatagramSimulator},
    sample::SampleGenerator,
    CodecPlan, Record,
};
use clap::Parser;
use config::{Args, Config};
use std::fs;
use std::time::Duration;
use tracing::{debug, error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    init_tracing(args.verbose)?;

    let config = Config::from_args(args)?;
    if config.print_config {
        config.print();
    }

    let record = match &config.record {
        Some(path) => json::load_record(path)
            .with_context(|| format!("failed to load record from {}", path.display()))?,
        None => demo::demo_record(),
    };

    let plan = CodecPlan::from_record(&record).context("failed to plan frame layout")?;
    info!(fields = plan.len(), total_bytes = plan.total_bytes(), "frame layout ready");

    if config.print_layout {
        print_layout(&plan);
    }

    if let Some(path) = &config.layout_out {
        fs::write(path, plan.to_json_pretty()?)
            .with_context(|| format!("failed to write layout to {}", path.display()))?;
        info!(path = %path.display(), "wrote layout");
    }

    if let Some(dir) = &config.emit_dir {
        let artifacts = RustEmitter::new(config.type_name.clone())
            .emit(&plan)
            .context("failed to emit sources")?;
        let stem = config.type_name.to_lowercase();
        for path in artifacts.write_to(dir, &stem)? {
            println!("Wrote {}", path.display());
        }
    }

    let metrics = run_frames(&config, &plan)?;

    if config.print_metrics {
        metrics.print_summary();
    }
    metrics.print_result();

    if !metrics.passed() {
        bail!("{} accepted frames failed verification", metrics.verify_mismatches);
    }
    Ok(())
}

fn log_level(verbose: u8) -> Level {
    match verbose {
        0 => Level::WARN,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

fn init_tracing(verbose: u8) -> anyhow::Result<()> {
    let subscriber = FmtSubscriber::builder().with_max_level(log_level(verbose)).finish();
    tracing::subscriber::set_global_default(subscriber).context("failed to install tracing subscriber")
}

fn print_layout(plan: &CodecPlan) {
    println!("=== Frame Layout ===");
    println!("{:<32} {:<28} {:>10} {:>8} {:>8}", "field", "type", "dims", "offset", "width");
    for planned in plan.fields() {
        let dims: Vec<String> = planned.field.dims.iter().map(|d| d.to_string()).collect();
        println!(
            "{:<32} {:<28} {:>10} {:>8} {:>8}",
            planned.name(),
            planned.field.ty.to_string(),
            dims.join("x"),
            planned.offset,
            planned.width_bytes
        );
    }
    println!("Total: {} bytes", plan.total_bytes());
    println!();
}

/// Send sample frames through the simulated link and verify what arrives.
fn run_frames(config: &Config, plan: &CodecPlan) -> anyhow::Result<Metrics> {
    let mut metrics = Metrics::new();
    let mut link = DatagramSimulator::new(config.network);
    let mut sent: Vec<Record> = Vec::with_capacity(config.frames as usize);

    for (seq, record) in (0..config.frames).zip(SampleGenerator::new(plan, config.seed)) {
        let frame = encode(plan, &record).context("failed to encode sample record")?;
        metrics.record_encoded(frame.len());
        sent.push(record);

        link.send(Datagram::new(seq, frame));

        while let Some(datagram) = link.recv() {
            receive(plan, &sent, &datagram, &mut metrics);
        }
    }

    let settle = Duration::from_millis(config.network.base_latency_ms + config.network.jitter_ms + 50);
    while link.has_pending() {
        match link.recv_wait(settle) {
            Some(datagram) => receive(plan, &sent, &datagram, &mut metrics),
            None => break,
        }
    }
    for datagram in link.drain() {
        receive(plan, &sent, &datagram, &mut metrics);
    }

    metrics.absorb_network(&link.stats());
    metrics.complete();
    Ok(metrics)
}

fn receive(plan: &CodecPlan, sent: &[Record], datagram: &Datagram, metrics: &mut Metrics) {
    let check = check_frame(plan, datagram.payload.len(), datagram.declared_len);
    metrics.record_check(check);

    let decoded = decode(plan, &datagram.payload, datagram.declared_len);
    if !decoded.success {
        warn!(seq = datagram.seq, ?check, "frame rejected");
        return;
    }

    let expected = usize::try_from(datagram.seq).ok().and_then(|i| sent.get(i));
    if expected == Some(&decoded.record) {
        debug!(seq = datagram.seq, "frame verified");
    } else {
        error!(seq = datagram.seq, "decoded record differs from the one sent");
        metrics.verify_mismatches += 1;
    }
}
