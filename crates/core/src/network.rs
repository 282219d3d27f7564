//! Datagram link simulator with latency, jitter, loss and truncation.
//!
//! Frames travel as datagrams that carry the sender's declared length next to
//! the payload. The simulator impairs them the way a lossy bus or UDP link
//! would, so the decoder's length validation can be exercised end to end.
//!
//! # Simulated Effects
//!
//! - **Latency**: Base delay for all datagrams
//! - **Jitter**: Random variation in latency (uniform distribution), which
//!   also reorders datagrams
//! - **Loss**: Random drops (Bernoulli distribution)
//! - **Truncation**: The payload is cut short while the declared length is
//!   kept, as when a receive buffer is too small
//!
//! # Implementation
//!
//! Uses a priority queue (min-heap) keyed by delivery time, with the send
//! sequence number as a tiebreak so equal delivery times keep send order.
//!
//! # Determinism
//!
//! All randomness comes from a seeded ChaCha8 RNG. Given the same seed
//! and inputs, drops and truncations are identical.

use bytes::Bytes;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::time::{Duration, Instant};

/// Configuration for the simulated link.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NetworkConfig {
    /// Base latency in milliseconds
    pub base_latency_ms: u64,

    /// Jitter range in milliseconds (uniform ±jitter)
    pub jitter_ms: u64,

    /// Drop probability [0.0, 1.0]
    pub loss_rate: f64,

    /// Truncation probability [0.0, 1.0], applied to datagrams not dropped
    pub truncate_rate: f64,

    /// Random seed for determinism
    pub seed: u64,
}

impl NetworkConfig {
    /// A link with no impairments.
    pub fn perfect(seed: u64) -> Self {
        Self {
            base_latency_ms: 0,
            jitter_ms: 0,
            loss_rate: 0.0,
            truncate_rate: 0.0,
            seed,
        }
    }

    /// Moderate impairments.
    pub fn default_with_seed(seed: u64) -> Self {
        Self {
            base_latency_ms: 20,
            jitter_ms: 10,
            loss_rate: 0.01,
            truncate_rate: 0.02,
            seed,
        }
    }
}

/// One frame in flight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Datagram {
    /// Send sequence number
    pub seq: u64,

    /// Bytes as received; shorter than `declared_len` if truncated
    pub payload: Bytes,

    /// Frame length the sender declared
    pub declared_len: usize,
}

impl Datagram {
    /// A datagram declaring its full payload length.
    pub fn new(seq: u64, payload: Bytes) -> Self {
        let declared_len = payload.len();
        Self {
            seq,
            payload,
            declared_len,
        }
    }

    pub fn is_truncated(&self) -> bool {
        self.payload.len() < self.declared_len
    }
}

#[derive(Debug, Clone)]
struct Scheduled {
    datagram: Datagram,
    delivery_time: Instant,
}

impl PartialEq for Scheduled {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Scheduled {}

impl PartialOrd for Scheduled {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Scheduled {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed for a min-heap: earliest delivery, then lowest seq
        other
            .delivery_time
            .cmp(&self.delivery_time)
            .then_with(|| other.datagram.seq.cmp(&self.datagram.seq))
    }
}

/// Simulated datagram link.
///
/// # Thread Safety
/// Not thread-safe; use one instance per thread or synchronize externally.
pub struct DatagramSimulator {
    config: NetworkConfig,
    rng: ChaCha8Rng,
    queue: BinaryHeap<Scheduled>,

    // Statistics
    datagrams_sent: u64,
    datagrams_dropped: u64,
    datagrams_truncated: u64,
    datagrams_delivered: u64,
}

impl DatagramSimulator {
    pub fn new(config: NetworkConfig) -> Self {
        Self {
            config,
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            queue: BinaryHeap::new(),
            datagrams_sent: 0,
            datagrams_dropped: 0,
            datagrams_truncated: 0,
            datagrams_delivered: 0,
        }
    }

    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    /// Send a datagram through the link.
    ///
    /// The datagram may be dropped, truncated to a random shorter length
    /// (its declared length is left unchanged), and is delayed by latency
    /// plus jitter.
    pub fn send(&mut self, mut datagram: Datagram) {
        self.datagrams_sent += 1;

        if self.config.loss_rate > 0.0 && self.rng.gen::<f64>() < self.config.loss_rate {
            self.datagrams_dropped += 1;
            return;
        }

        if self.config.truncate_rate > 0.0
            && !datagram.payload.is_empty()
            && self.rng.gen::<f64>() < self.config.truncate_rate
        {
            let keep = self.rng.gen_range(0..datagram.payload.len());
            datagram.payload.truncate(keep);
            self.datagrams_truncated += 1;
        }

        let delay_ms = self.compute_delay();
        let delivery_time = Instant::now() + Duration::from_millis(delay_ms);

        self.queue.push(Scheduled {
            datagram,
            delivery_time,
        });
    }

    /// Take the next datagram whose delivery time has arrived, if any.
    ///
    /// Non-blocking; see [`DatagramSimulator::recv_wait`].
    pub fn recv(&mut self) -> Option<Datagram> {
        let ready = self
            .queue
            .peek()
            .is_some_and(|s| Instant::now() >= s.delivery_time);
        if !ready {
            return None;
        }

        let scheduled = self.queue.pop()?;
        self.datagrams_delivered += 1;
        Some(scheduled.datagram)
    }

    /// Receive a datagram, waiting up to `timeout`.
    ///
    /// Polls with short sleeps.
    pub fn recv_wait(&mut self, timeout: Duration) -> Option<Datagram> {
        let deadline = Instant::now() + timeout;

        loop {
            if let Some(datagram) = self.recv() {
                return Some(datagram);
            }

            if Instant::now() >= deadline {
                return None;
            }

            std::thread::sleep(Duration::from_micros(100));
        }
    }

    pub fn has_pending(&self) -> bool {
        !self.queue.is_empty()
    }

    pub fn pending_count(&self) -> usize {
        self.queue.len()
    }

    /// Deliver every datagram still in flight, in delivery order, ignoring
    /// delivery times.
    pub fn drain(&mut self) -> Vec<Datagram> {
        let mut datagrams = Vec::with_capacity(self.queue.len());
        while let Some(scheduled) = self.queue.pop() {
            datagrams.push(scheduled.datagram);
            self.datagrams_delivered += 1;
        }
        datagrams
    }

    pub fn stats(&self) -> NetworkStats {
        NetworkStats {
            datagrams_sent: self.datagrams_sent,
            datagrams_dropped: self.datagrams_dropped,
            datagrams_truncated: self.datagrams_truncated,
            datagrams_delivered: self.datagrams_delivered,
            datagrams_in_flight: self.queue.len(),
        }
    }

    /// Delay = base_latency ± jitter, floored at zero.
    fn compute_delay(&mut self) -> u64 {
        let base = self.config.base_latency_ms;

        if self.config.jitter_ms == 0 {
            return base;
        }

        let jitter_range = self.config.jitter_ms * 2;
        let jitter = self.rng.gen_range(0..=jitter_range);
        let jitter_offset = jitter as i64 - self.config.jitter_ms as i64;

        (base as i64 + jitter_offset).max(0) as u64
    }
}

/// Link statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkStats {
    pub datagrams_sent: u64,

    /// Dropped by simulated loss
    pub datagrams_dropped: u64,

    /// Delivered with a shortened payload
    pub datagrams_truncated: u64,

    pub datagrams_delivered: u64,

    pub datagrams_in_flight: usize,
}

impl NetworkStats {
    pub fn loss_rate(&self) -> f64 {
        if self.datagrams_sent == 0 {
            0.0
        } else {
            self.datagrams_dropped as f64 / self.datagrams_sent as f64
        }
    }

    /// Delivered / sent.
    pub fn delivery_rate(&self) -> f64 {
        if self.datagrams_sent == 0 {
            0.0
        } else {
            self.datagrams_delivered as f64 / self.datagrams_sent as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_datagram(seq: u64) -> Datagram {
        Datagram::new(seq, Bytes::from(vec![seq as u8; 16]))
    }

    fn config(base_latency_ms: u64, jitter_ms: u64, loss_rate: f64, truncate_rate: f64) -> NetworkConfig {
        NetworkConfig {
            base_latency_ms,
            jitter_ms,
            loss_rate,
            truncate_rate,
            seed: 42,
        }
    }

    #[test]
    fn test_perfect_link() {
        let mut sim = DatagramSimulator::new(NetworkConfig::perfect(42));

        sim.send(make_datagram(0));

        let received = sim.recv().unwrap();
        assert_eq!(received, make_datagram(0));
        assert!(!received.is_truncated());

        let stats = sim.stats();
        assert_eq!(stats.datagrams_sent, 1);
        assert_eq!(stats.datagrams_dropped, 0);
        assert_eq!(stats.datagrams_delivered, 1);
    }

    #[test]
    fn test_send_order_kept_without_jitter() {
        let mut sim = DatagramSimulator::new(NetworkConfig::perfect(1));
        for seq in 0..10 {
            sim.send(make_datagram(seq));
        }

        let seqs: Vec<u64> = sim.drain().into_iter().map(|d| d.seq).collect();
        assert_eq!(seqs, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn test_latency() {
        let mut sim = DatagramSimulator::new(config(50, 0, 0.0, 0.0));

        let start = Instant::now();
        sim.send(make_datagram(0));

        assert!(sim.recv().is_none());

        let received = sim.recv_wait(Duration::from_millis(200)).unwrap();
        assert_eq!(received.seq, 0);
        assert!(start.elapsed() >= Duration::from_millis(50));
    }

    #[test]
    fn test_loss() {
        let mut sim = DatagramSimulator::new(config(0, 0, 0.5, 0.0));

        for seq in 0..100 {
            sim.send(make_datagram(seq));
        }

        let stats = sim.stats();
        assert_eq!(stats.datagrams_sent, 100);
        // Allow 30-70% due to randomness
        assert!(stats.datagrams_dropped >= 30 && stats.datagrams_dropped <= 70);
        assert!(stats.loss_rate() > 0.3 && stats.loss_rate() < 0.7);
    }

    #[test]
    fn test_truncation_keeps_declared_length() {
        let mut sim = DatagramSimulator::new(config(0, 0, 0.0, 1.0));

        for seq in 0..20 {
            sim.send(make_datagram(seq));
        }

        let delivered = sim.drain();
        assert_eq!(delivered.len(), 20);
        for datagram in &delivered {
            assert_eq!(datagram.declared_len, 16);
            assert!(datagram.payload.len() < 16);
            assert!(datagram.is_truncated());
        }
        assert_eq!(sim.stats().datagrams_truncated, 20);
    }

    #[test]
    fn test_determinism() {
        let config = NetworkConfig::default_with_seed(12345);

        let mut sim1 = DatagramSimulator::new(config);
        let mut sim2 = DatagramSimulator::new(config);

        for seq in 0..50 {
            sim1.send(make_datagram(seq));
            sim2.send(make_datagram(seq));
        }

        assert_eq!(sim1.stats(), sim2.stats());

        let lens = |sim: &mut DatagramSimulator| -> Vec<(u64, usize)> {
            let mut v: Vec<_> = sim.drain().into_iter().map(|d| (d.seq, d.payload.len())).collect();
            v.sort_unstable();
            v
        };
        assert_eq!(lens(&mut sim1), lens(&mut sim2));
    }

    #[test]
    fn test_drain() {
        let mut sim = DatagramSimulator::new(config(1000, 0, 0.0, 0.0));

        sim.send(make_datagram(0));
        sim.send(make_datagram(1));
        assert_eq!(sim.pending_count(), 2);
        assert!(sim.has_pending());

        let datagrams = sim.drain();
        assert_eq!(datagrams.len(), 2);
        assert_eq!(sim.pending_count(), 0);
        assert_eq!(sim.stats().delivery_rate(), 1.0);
    }

    #[test]
    fn test_jitter_delivers_everything() {
        let mut sim = DatagramSimulator::new(NetworkConfig {
            base_latency_ms: 20,
            jitter_ms: 15,
            loss_rate: 0.0,
            truncate_rate: 0.0,
            seed: 99,
        });

        for seq in 0..10 {
            sim.send(make_datagram(seq));
        }

        // drain() follows delivery order, so reordering shows without sleeping
        let received: Vec<u64> = sim.drain().into_iter().map(|d| d.seq).collect();
        assert_eq!(received.len(), 10);

        let mut sorted = received.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, (0..10).collect::<Vec<_>>());
    }
}
