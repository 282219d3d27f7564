//! Metrics collection and reporting for a frame run.
//!
//! Tracks what happened to frames at each pipeline stage:
//! - Encoding (frames and bytes)
//! - The simulated link (sent, dropped, truncated, received)
//! - Decoding (accepted, rejected by reason, verification mismatches)
//!
//! # Thread Safety
//!
//! The `Metrics` struct is NOT thread-safe. For multi-threaded use, wrap in
//! `Arc<Mutex<Metrics>>` or keep per-thread metrics and merge them at the end.

use std::time::{Duration, Instant};

use crate::decoder::FrameCheck;
use crate::network::NetworkStats;

#[derive(Debug, Clone)]
pub struct Metrics {
    // === Timing ===
    pub start_time: Instant,

    /// Set on completion
    pub end_time: Option<Instant>,

    // === Encoding ===
    pub frames_encoded: u64,

    /// Total encoded bytes
    pub bytes_encoded: u64,

    // === Link ===
    pub datagrams_sent: u64,
    pub datagrams_dropped: u64,
    pub datagrams_truncated: u64,
    pub datagrams_received: u64,

    // === Decoding ===
    /// Frames that passed length validation
    pub frames_decoded: u64,

    /// Rejected because the declared length was not the frame size
    pub rejected_length: u64,

    /// Rejected because the buffer held fewer bytes than declared
    pub rejected_short: u64,

    /// Accepted frames whose record differed from the one sent
    pub verify_mismatches: u64,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            end_time: None,
            frames_encoded: 0,
            bytes_encoded: 0,
            datagrams_sent: 0,
            datagrams_dropped: 0,
            datagrams_truncated: 0,
            datagrams_received: 0,
            frames_decoded: 0,
            rejected_length: 0,
            rejected_short: 0,
            verify_mismatches: 0,
        }
    }

    pub fn complete(&mut self) {
        self.end_time = Some(Instant::now());
    }

    /// Total duration, or time elapsed so far if not complete.
    pub fn duration(&self) -> Duration {
        match self.end_time {
            Some(end) => end.duration_since(self.start_time),
            None => self.start_time.elapsed(),
        }
    }

    pub fn record_encoded(&mut self, frame_len: usize) {
        self.frames_encoded += 1;
        self.bytes_encoded += frame_len as u64;
    }

    /// Count one decode attempt by its validation outcome.
    pub fn record_check(&mut self, check: FrameCheck) {
        match check {
            FrameCheck::Valid => self.frames_decoded += 1,
            FrameCheck::LengthMismatch { .. } => self.rejected_length += 1,
            FrameCheck::ShortBuffer { .. } => self.rejected_short += 1,
        }
    }

    /// Copy link counters from the simulator.
    pub fn absorb_network(&mut self, stats: &NetworkStats) {
        self.datagrams_sent = stats.datagrams_sent;
        self.datagrams_dropped = stats.datagrams_dropped;
        self.datagrams_truncated = stats.datagrams_truncated;
        self.datagrams_received = stats.datagrams_delivered;
    }

    pub fn frames_rejected(&self) -> u64 {
        self.rejected_length + self.rejected_short
    }

    /// Dropped / sent.
    pub fn loss_rate(&self) -> f64 {
        if self.datagrams_sent == 0 {
            0.0
        } else {
            self.datagrams_dropped as f64 / self.datagrams_sent as f64
        }
    }

    /// Accepted / encoded.
    pub fn acceptance_rate(&self) -> f64 {
        if self.frames_encoded == 0 {
            0.0
        } else {
            self.frames_decoded as f64 / self.frames_encoded as f64
        }
    }

    /// Encoded frames per second.
    pub fn frame_rate(&self) -> f64 {
        let duration_secs = self.duration().as_secs_f64();
        if duration_secs == 0.0 {
            0.0
        } else {
            self.frames_encoded as f64 / duration_secs
        }
    }

    /// A run passes when every accepted frame matched what was sent.
    pub fn passed(&self) -> bool {
        self.verify_mismatches == 0
    }

    /// Print a human-readable summary to stdout.
    pub fn print_summary(&self) {
        println!("\n=== Run Summary ===");
        println!("Duration: {} ms", self.duration().as_millis());
        println!();

        println!("=== Encoding ===");
        println!("Frames encoded: {}", self.frames_encoded);
        println!("Bytes encoded: {}", self.bytes_encoded);
        println!();

        println!("=== Link ===");
        println!("Datagrams sent: {}", self.datagrams_sent);
        println!("Datagrams dropped: {} ({:.2}%)", self.datagrams_dropped, self.loss_rate() * 100.0);
        println!("Datagrams truncated: {}", self.datagrams_truncated);
        println!("Datagrams received: {}", self.datagrams_received);
        println!();

        println!("=== Decoding ===");
        println!("Frames decoded: {} ({:.2}% of encoded)", self.frames_decoded, self.acceptance_rate() * 100.0);
        println!("Rejected (length mismatch): {}", self.rejected_length);
        println!("Rejected (short buffer): {}", self.rejected_short);
        println!("Verification mismatches: {}", self.verify_mismatches);
        println!();

        println!("=== Performance ===");
        println!("Frame rate: {:.0} frames/s", self.frame_rate());
        println!();
    }

    /// Print just the final result (pass/fail).
    pub fn print_result(&self) {
        if self.passed() {
            println!("✓ All accepted frames verified");
            println!(
                "  {} of {} frames decoded, {} rejected, in {} ms",
                self.frames_decoded,
                self.frames_encoded,
                self.frames_rejected(),
                self.duration().as_millis()
            );
        } else {
            println!("✗ Verification failed: {} accepted frames differed from the sent record", self.verify_mismatches);
        }
    }

    /// Export metrics as `key=value` lines.
    pub fn export_text(&self) -> String {
        format!(
            "duration_ms={}\n\
             frames_encoded={}\n\
             bytes_encoded={}\n\
             datagrams_sent={}\n\
             datagrams_dropped={}\n\
             datagrams_truncated={}\n\
             datagrams_received={}\n\
             loss_rate={:.4}\n\
             frames_decoded={}\n\
             rejected_length={}\n\
             rejected_short={}\n\
             verify_mismatches={}\n",
            self.duration().as_millis(),
            self.frames_encoded,
            self.bytes_encoded,
            self.datagrams_sent,
            self.datagrams_dropped,
            self.datagrams_truncated,
            self.datagrams_received,
            self.loss_rate(),
            self.frames_decoded,
            self.rejected_length,
            self.rejected_short,
            self.verify_mismatches,
        )
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
