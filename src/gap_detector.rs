/// Transport sequence gap detection
///
/// Observes the msg_seq_num of every market-data packet header and records
/// ranges of missing sequence numbers. Observation only: the decoder assumes
/// lossless in-order delivery and never requests retransmission; the ranges
/// exist so a capture with holes is visible in the final report.

#[derive(Debug, Clone, Default)]
pub struct GapDetector {
    last_seq: Option<u32>,
    gaps: Vec<(u32, u32)>, // (first missing, last missing), inclusive
    missing: u64,
}

impl GapDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the next observed msg_seq_num.
    pub fn observe(&mut self, seq: u32) {
        if let Some(last) = self.last_seq {
            let expected = last.wrapping_add(1);
            if seq != expected {
                let missed = seq.wrapping_sub(expected);
                self.gaps.push((expected, seq.wrapping_sub(1)));
                self.missing += u64::from(missed);
            }
        }
        self.last_seq = Some(seq);
    }

    /// All detected gaps as inclusive (start, end) ranges.
    pub fn gaps(&self) -> &[(u32, u32)] {
        &self.gaps
    }

    /// Count of distinct gap events.
    pub fn gap_events(&self) -> usize {
        self.gaps.len()
    }

    /// Total number of missing packets across all gaps.
    pub fn missing_packets(&self) -> u64 {
        self.missing
    }

    pub fn reset(&mut self) {
        self.last_seq = None;
        self.gaps.clear();
        self.missing = 0;
    }
}
