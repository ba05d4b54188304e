/// Feed statistics tracking
///
/// Two layers: DecoderStats is the decoder-owned counter set exposed through
/// SimbaDecoder::statistics(); FeedStats tracks replay-level throughput and
/// decode latency for the shipping report.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

const WINDOW_SIZE: usize = 10000;

/// Counters owned by the decoder. All fields are monotonic non-decreasing
/// over the life of a decoder instance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecoderStats {
    /// Datagrams handed to decode() whose market-data header parsed.
    pub packets_seen: u64,
    /// Fully-decoded logical messages returned to the caller.
    pub messages_decoded: u64,
    /// Successful snapshot completions (EndOfSnapshot decodes).
    pub snapshots_processed: u64,
    /// Snapshot datagrams whose instrument differed from the previous
    /// snapshot datagram, signalling interleaved snapshot streams.
    pub mixed_snapshots_detected: u64,
    /// Datagrams ignored because the first SBE template is not handled.
    pub unknown_templates: u64,
    /// Datagrams dropped due to truncation or malformed framing.
    pub decode_errors: u64,
    /// Distinct msg_seq_num gap events in the transport stream.
    pub gap_events: u64,
    /// Total packets missing across all gap events.
    pub missing_packets: u64,
}

impl DecoderStats {
    pub fn print_summary(&self) {
        println!("=== Decoder Statistics ===");
        println!("Packets seen: {}", self.packets_seen);
        println!("Messages decoded: {}", self.messages_decoded);
        println!("Snapshots processed: {}", self.snapshots_processed);
        println!("Mixed snapshots detected: {}", self.mixed_snapshots_detected);
        println!("Unknown templates skipped: {}", self.unknown_templates);
        println!("Decode errors: {}", self.decode_errors);
        println!(
            "Sequence gaps: {} events, {} packets missing",
            self.gap_events, self.missing_packets
        );
    }
}

#[derive(Debug, Clone, Copy)]
pub struct LatencyStats {
    pub min_us: u64,
    pub max_us: u64,
    pub mean_us: f64,
    pub p50_us: u64,
    pub p99_us: u64,
}

/// Replay-level throughput tracker.
#[derive(Debug, Clone)]
pub struct FeedStats {
    start_time: Option<Instant>,
    total_datagrams: u64,
    total_bytes: u64,
    decode_latencies: VecDeque<u64>,
}

impl FeedStats {
    pub fn new() -> Self {
        FeedStats {
            start_time: None,
            total_datagrams: 0,
            total_bytes: 0,
            decode_latencies: VecDeque::with_capacity(WINDOW_SIZE),
        }
    }

    /// Record a datagram handed to the decoder.
    pub fn record_datagram(&mut self, size: usize) {
        if self.start_time.is_none() {
            self.start_time = Some(Instant::now());
        }
        self.total_datagrams += 1;
        self.total_bytes += size as u64;
    }

    /// Record decode latency in microseconds (sliding window).
    pub fn record_decode_latency(&mut self, micros: u64) {
        if self.decode_latencies.len() >= WINDOW_SIZE {
            self.decode_latencies.pop_front();
        }
        self.decode_latencies.push_back(micros);
    }

    pub fn datagrams_per_sec(&self) -> f64 {
        match self.start_time {
            None => 0.0,
            Some(start) => {
                let elapsed = start.elapsed().as_secs_f64();
                if elapsed > 0.0 {
                    self.total_datagrams as f64 / elapsed
                } else {
                    0.0
                }
            }
        }
    }

    pub fn bytes_per_sec(&self) -> f64 {
        match self.start_time {
            None => 0.0,
            Some(start) => {
                let elapsed = start.elapsed().as_secs_f64();
                if elapsed > 0.0 {
                    self.total_bytes as f64 / elapsed
                } else {
                    0.0
                }
            }
        }
    }

    pub fn decode_latency_stats(&self) -> Option<LatencyStats> {
        if self.decode_latencies.is_empty() {
            return None;
        }

        let mut sorted: Vec<u64> = self.decode_latencies.iter().copied().collect();
        sorted.sort_unstable();

        Some(LatencyStats {
            min_us: sorted[0],
            max_us: sorted[sorted.len() - 1],
            mean_us: sorted.iter().sum::<u64>() as f64 / sorted.len() as f64,
            p50_us: sorted[sorted.len() / 2],
            p99_us: sorted[(sorted.len() * 99) / 100],
        })
    }

    pub fn elapsed(&self) -> Option<Duration> {
        self.start_time.map(|st| st.elapsed())
    }

    pub fn total_datagrams(&self) -> u64 {
        self.total_datagrams
    }

    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    pub fn reset(&mut self) {
        self.start_time = None;
        self.total_datagrams = 0;
        self.total_bytes = 0;
        self.decode_latencies.clear();
    }

    pub fn print_summary(&self) {
        println!("=== Feed Statistics ===");
        println!("Total datagrams: {}", self.total_datagrams);
        println!("Total bytes: {}", self.total_bytes);
        println!("Elapsed: {:?}", self.elapsed());
        println!("Datagrams/sec: {:.2}", self.datagrams_per_sec());
        println!("Bytes/sec: {:.2}", self.bytes_per_sec());

        if let Some(stats) = self.decode_latency_stats() {
            println!("\nDecode Latency (us):");
            println!(
                "  Min: {}, Max: {}, Mean: {:.2}",
                stats.min_us, stats.max_us, stats.mean_us
            );
            println!("  P50: {}, P99: {}", stats.p50_us, stats.p99_us);
        }
    }
}

impl Default for FeedStats {
    fn default() -> Self {
        Self::new()
    }
}
