/// SIMBA message decoder and fragment reassembler
///
/// Consumes one UDP payload per call, in capture order, and yields fully
/// reassembled, decoded application messages. Multi-datagram incremental
/// transactions and multi-datagram snapshots are buffered per instrument
/// until their terminal fragment arrives. All wire reads are explicit
/// field-by-field offset arithmetic; no struct is ever overlaid on the
/// input bytes.

use std::collections::HashMap;

use thiserror::Error;
use tracing::{debug, trace, warn};

use crate::codec;
use crate::gap_detector::GapDetector;
use crate::protocol::{
    DecodedMessage, IncrementalPacketHeader, MarketDataPacketHeader, MsgFlags, OrderBookEntry,
    OrderBookSnapshot, OrderExecution, OrderUpdate, SbeHeader, INCREMENTAL_HEADER_SIZE,
    MD_HEADER_SIZE, ORDER_EXECUTION_BLOCK_SIZE, ORDER_UPDATE_BLOCK_SIZE, SBE_HEADER_SIZE,
    SNAPSHOT_ENTRY_MIN_SIZE, SNAPSHOT_GROUP_SIZE, SNAPSHOT_PRELUDE_SIZE, TEMPLATE_ORDER_BOOK_SNAPSHOT,
    TEMPLATE_ORDER_EXECUTION, TEMPLATE_ORDER_UPDATE,
};
use crate::stats::DecoderStats;

// Initial buffer reserves; buffers are cleared (capacity retained) on
// completion, so each instrument settles at its largest observed message.
const INCREMENTAL_BUFFER_RESERVE: usize = 64 * 1024;
const SNAPSHOT_BUFFER_RESERVE: usize = 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderKind {
    MarketData,
    Incremental,
    Sbe,
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    #[error("truncated {0:?} header")]
    TruncatedHeader(HeaderKind),

    #[error("truncated body for template {template}: need {required} bytes, have {available}")]
    TruncatedBody {
        template: u16,
        required: usize,
        available: usize,
    },

    #[error("unhandled template id {0}")]
    UnknownTemplate(u16),

    #[error("repeating group stride {stride} below minimum entry size {minimum}")]
    InvalidBlockLength { stride: usize, minimum: usize },
}

pub type DecodeResult<T> = Result<T, DecodeError>;

/// Parse the 16-byte Market Data Packet Header at `offset`.
pub fn parse_market_data_header(
    buf: &[u8],
    offset: usize,
) -> DecodeResult<(MarketDataPacketHeader, usize)> {
    if buf.len() < offset + MD_HEADER_SIZE {
        return Err(DecodeError::TruncatedHeader(HeaderKind::MarketData));
    }
    let header = MarketDataPacketHeader {
        msg_seq_num: codec::read_u32(buf, offset),
        msg_size: codec::read_u16(buf, offset + 4),
        msg_flags: codec::read_u16(buf, offset + 6),
        sending_time: codec::read_u64(buf, offset + 8),
    };
    Ok((header, offset + MD_HEADER_SIZE))
}

/// Parse the 12-byte Incremental Packet Header at `offset`.
pub fn parse_incremental_header(
    buf: &[u8],
    offset: usize,
) -> DecodeResult<(IncrementalPacketHeader, usize)> {
    if buf.len() < offset + INCREMENTAL_HEADER_SIZE {
        return Err(DecodeError::TruncatedHeader(HeaderKind::Incremental));
    }
    let header = IncrementalPacketHeader {
        transact_time: codec::read_u64(buf, offset),
        exchange_trading_session_id: codec::read_u32(buf, offset + 8),
    };
    Ok((header, offset + INCREMENTAL_HEADER_SIZE))
}

/// Parse the 8-byte SBE block header at `offset`.
pub fn parse_sbe_header(buf: &[u8], offset: usize) -> DecodeResult<(SbeHeader, usize)> {
    if buf.len() < offset + SBE_HEADER_SIZE {
        return Err(DecodeError::TruncatedHeader(HeaderKind::Sbe));
    }
    let header = SbeHeader {
        block_length: codec::read_u16(buf, offset),
        template_id: codec::read_u16(buf, offset + 2),
        schema_id: codec::read_u16(buf, offset + 4),
        version: codec::read_u16(buf, offset + 6),
    };
    Ok((header, offset + SBE_HEADER_SIZE))
}

/// Stateful decoder: one instance per input stream.
///
/// Owns three per-template fragment buffers keyed by SecurityID, plus the
/// observability counters. Not safe for concurrent use; partition input by
/// instrument and run one decoder per partition to parallelize.
pub struct SimbaDecoder {
    order_update_fragments: HashMap<i32, Vec<u8>>,
    order_execution_fragments: HashMap<i32, Vec<u8>>,
    snapshot_fragments: HashMap<i32, Vec<u8>>,
    last_snapshot_security: Option<i32>,
    gap_detector: GapDetector,
    stats: DecoderStats,
}

impl SimbaDecoder {
    pub fn new() -> Self {
        SimbaDecoder {
            order_update_fragments: HashMap::new(),
            order_execution_fragments: HashMap::new(),
            snapshot_fragments: HashMap::new(),
            last_snapshot_security: None,
            gap_detector: GapDetector::new(),
            stats: DecoderStats::default(),
        }
    }

    /// Decode one UDP payload. Returns a message when this datagram
    /// completes a logical message; malformed input yields None after a
    /// warning, never a panic or process abort.
    pub fn decode(&mut self, payload: &[u8]) -> Option<DecodedMessage> {
        match self.try_decode(payload) {
            Ok(message) => message,
            Err(DecodeError::UnknownTemplate(id)) => {
                self.stats.unknown_templates += 1;
                debug!(template = id, "ignoring unhandled template");
                None
            }
            Err(err) => {
                self.stats.decode_errors += 1;
                warn!(%err, "dropping undecodable datagram");
                None
            }
        }
    }

    /// Fallible variant of [`decode`](Self::decode) for callers that need
    /// the failure reason.
    pub fn try_decode(&mut self, payload: &[u8]) -> DecodeResult<Option<DecodedMessage>> {
        let (md_header, mut offset) = parse_market_data_header(payload, 0)?;
        self.stats.packets_seen += 1;
        self.gap_detector.observe(md_header.msg_seq_num);
        self.stats.gap_events = self.gap_detector.gap_events() as u64;
        self.stats.missing_packets = self.gap_detector.missing_packets();

        let flags = MsgFlags(md_header.msg_flags);

        if flags.incremental_packet() {
            let (inc_header, next) = parse_incremental_header(payload, offset)?;
            offset = next;
            trace!(
                transact_time = inc_header.transact_time,
                session = inc_header.exchange_trading_session_id,
                "incremental packet"
            );
        }

        let (sbe_header, body_offset) = parse_sbe_header(payload, offset)?;
        match sbe_header.template_id {
            TEMPLATE_ORDER_UPDATE | TEMPLATE_ORDER_EXECUTION | TEMPLATE_ORDER_BOOK_SNAPSHOT => {}
            other => return Err(DecodeError::UnknownTemplate(other)),
        }

        // The reassembly key is the leading SecurityID of the first block
        // body, peeked here without consuming it: the fragment handed to
        // reassembly still starts at the SBE header so the body decoders can
        // re-parse it.
        if payload.len() < body_offset + 4 {
            return Err(DecodeError::TruncatedBody {
                template: sbe_header.template_id,
                required: SBE_HEADER_SIZE + 4,
                available: payload.len() - offset,
            });
        }
        let security_id = codec::read_i32(payload, body_offset);

        let message =
            self.process_fragment(&payload[offset..], flags, sbe_header.template_id, security_id)?;
        if message.is_some() {
            self.stats.messages_decoded += 1;
        }
        Ok(message)
    }

    /// Snapshot of the decoder counters.
    pub fn statistics(&self) -> DecoderStats {
        self.stats
    }

    /// Inclusive ranges of msg_seq_num values missing from the transport
    /// stream so far.
    pub fn sequence_gaps(&self) -> &[(u32, u32)] {
        self.gap_detector.gaps()
    }

    /// Lazy iterator over the decoded messages of a datagram sequence.
    pub fn messages<I>(&mut self, payloads: I) -> Messages<'_, I::IntoIter>
    where
        I: IntoIterator,
        I::Item: AsRef<[u8]>,
    {
        Messages {
            decoder: self,
            payloads: payloads.into_iter(),
        }
    }

    fn process_fragment(
        &mut self,
        fragment: &[u8],
        flags: MsgFlags,
        template_id: u16,
        security_id: i32,
    ) -> DecodeResult<Option<DecodedMessage>> {
        if flags.incremental_packet() {
            match template_id {
                TEMPLATE_ORDER_UPDATE | TEMPLATE_ORDER_EXECUTION => {
                    self.process_incremental_fragment(fragment, flags, template_id, security_id)
                }
                other => {
                    warn!(template = other, "snapshot template inside incremental packet");
                    Ok(None)
                }
            }
        } else if template_id == TEMPLATE_ORDER_BOOK_SNAPSHOT {
            self.process_snapshot_fragment(fragment, flags, security_id)
        } else {
            warn!(
                template = template_id,
                "incremental template outside incremental packet"
            );
            Ok(None)
        }
    }

    fn process_incremental_fragment(
        &mut self,
        fragment: &[u8],
        flags: MsgFlags,
        template_id: u16,
        security_id: i32,
    ) -> DecodeResult<Option<DecodedMessage>> {
        let buffers = if template_id == TEMPLATE_ORDER_UPDATE {
            &mut self.order_update_fragments
        } else {
            &mut self.order_execution_fragments
        };

        if !flags.last_fragment() {
            buffers
                .entry(security_id)
                .or_insert_with(|| Vec::with_capacity(INCREMENTAL_BUFFER_RESERVE))
                .extend_from_slice(fragment);
            return Ok(None);
        }

        match buffers.get_mut(&security_id) {
            Some(buffer) if !buffer.is_empty() => {
                buffer.extend_from_slice(fragment);
                let result = decode_incremental(buffer);
                buffer.clear();
                result
            }
            _ => decode_incremental(fragment),
        }
    }

    fn process_snapshot_fragment(
        &mut self,
        fragment: &[u8],
        flags: MsgFlags,
        security_id: i32,
    ) -> DecodeResult<Option<DecodedMessage>> {
        if let Some(previous) = self.last_snapshot_security {
            if previous != security_id {
                self.stats.mixed_snapshots_detected += 1;
                debug!(
                    previous,
                    current = security_id,
                    "interleaved snapshot streams"
                );
            }
        }
        self.last_snapshot_security = Some(security_id);

        let buffer = self
            .snapshot_fragments
            .entry(security_id)
            .or_insert_with(|| Vec::with_capacity(SNAPSHOT_BUFFER_RESERVE));

        if flags.start_of_snapshot() {
            if !buffer.is_empty() {
                warn!(
                    security_id,
                    dropped = buffer.len(),
                    "snapshot restarted; discarding buffered fragments"
                );
            }
            buffer.clear();
        }
        buffer.extend_from_slice(fragment);

        if !flags.end_of_snapshot() {
            return Ok(None);
        }

        // Buffer is cleared regardless of decode outcome.
        let result = decode_snapshots(buffer);
        buffer.clear();
        let snapshots = result?;
        self.stats.snapshots_processed += 1;

        Ok(snapshots
            .into_iter()
            .next()
            .map(DecodedMessage::OrderBookSnapshot))
    }
}

impl Default for SimbaDecoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator adaptor returned by [`SimbaDecoder::messages`]: pulls datagram
/// payloads in order and yields each completed logical message.
pub struct Messages<'d, I> {
    decoder: &'d mut SimbaDecoder,
    payloads: I,
}

impl<I, B> Iterator for Messages<'_, I>
where
    I: Iterator<Item = B>,
    B: AsRef<[u8]>,
{
    type Item = DecodedMessage;

    fn next(&mut self) -> Option<DecodedMessage> {
        loop {
            let payload = self.payloads.next()?;
            if let Some(message) = self.decoder.decode(payload.as_ref()) {
                return Some(message);
            }
        }
    }
}

/// Decode a reassembled incremental payload: a run of SBE blocks starting
/// at an SBE header. Foreign templates inside the run are skipped by their
/// declared block length. Returns the first OrderUpdate, or the first
/// OrderExecution when the run contains no update; later blocks are still
/// walked so warnings and skips are observed.
fn decode_incremental(buf: &[u8]) -> DecodeResult<Option<DecodedMessage>> {
    let mut offset = 0;
    let mut first_update: Option<OrderUpdate> = None;
    let mut first_execution: Option<OrderExecution> = None;

    while buf.len() - offset >= SBE_HEADER_SIZE {
        let (sbe_header, next) = parse_sbe_header(buf, offset)?;
        offset = next;

        let block_length = sbe_header.block_length as usize;
        if buf.len() - offset < block_length {
            return Err(DecodeError::TruncatedBody {
                template: sbe_header.template_id,
                required: block_length,
                available: buf.len() - offset,
            });
        }
        let block = &buf[offset..offset + block_length];

        match sbe_header.template_id {
            TEMPLATE_ORDER_UPDATE => {
                let update = decode_order_update(block)?;
                if first_update.is_none() {
                    first_update = Some(update);
                }
            }
            TEMPLATE_ORDER_EXECUTION => {
                let execution = decode_order_execution(block)?;
                if first_execution.is_none() {
                    first_execution = Some(execution);
                }
            }
            other => {
                debug!(template = other, block_length, "skipping foreign block");
            }
        }
        offset += block_length;
    }

    let trailing = buf.len() - offset;
    if trailing >= 1 {
        warn!(trailing, "unconsumed trailing bytes after incremental decode");
    }

    Ok(first_update
        .map(DecodedMessage::OrderUpdate)
        .or(first_execution.map(DecodedMessage::OrderExecution)))
}

/// Decode an OrderUpdate block (template 15).
fn decode_order_update(block: &[u8]) -> DecodeResult<OrderUpdate> {
    if block.len() < ORDER_UPDATE_BLOCK_SIZE {
        return Err(DecodeError::TruncatedBody {
            template: TEMPLATE_ORDER_UPDATE,
            required: ORDER_UPDATE_BLOCK_SIZE,
            available: block.len(),
        });
    }

    let mut offset = 0;
    let md_entry_id = codec::read_i64(block, offset);
    offset += 8;
    let md_entry_px = codec::read_decimal5(block, offset);
    offset += 8;
    let md_entry_size = codec::read_i64(block, offset);
    offset += 8;
    let md_flags = codec::read_u64(block, offset);
    offset += 8;
    let md_flags2 = codec::read_u64(block, offset);
    offset += 8;
    let security_id = codec::read_i32(block, offset);
    offset += 4;
    let rpt_seq = codec::read_u32(block, offset);
    offset += 4;
    let update_action = block[offset];
    offset += 1;
    let entry_type = block[offset] as char;

    Ok(OrderUpdate {
        md_entry_id,
        md_entry_px,
        md_entry_size,
        md_flags,
        md_flags2,
        security_id,
        rpt_seq,
        update_action,
        entry_type,
    })
}

/// Decode an OrderExecution block (template 16).
fn decode_order_execution(block: &[u8]) -> DecodeResult<OrderExecution> {
    if block.len() < ORDER_EXECUTION_BLOCK_SIZE {
        return Err(DecodeError::TruncatedBody {
            template: TEMPLATE_ORDER_EXECUTION,
            required: ORDER_EXECUTION_BLOCK_SIZE,
            available: block.len(),
        });
    }

    let mut offset = 0;
    let md_entry_id = codec::read_i64(block, offset);
    offset += 8;
    let md_entry_px = codec::read_decimal5(block, offset);
    offset += 8;
    let md_entry_size = codec::read_i64(block, offset);
    offset += 8;
    let last_px = codec::read_decimal5(block, offset);
    offset += 8;
    let last_qty = codec::read_i64(block, offset);
    offset += 8;
    let trade_id = codec::read_i64(block, offset);
    offset += 8;
    let md_flags = codec::read_u64(block, offset);
    offset += 8;
    let md_flags2 = codec::read_u64(block, offset);
    offset += 8;
    let security_id = codec::read_i32(block, offset);
    offset += 4;
    let rpt_seq = codec::read_u32(block, offset);
    offset += 4;
    let update_action = block[offset];
    offset += 1;
    let entry_type = block[offset] as char;

    Ok(OrderExecution {
        md_entry_id,
        md_entry_px,
        md_entry_size,
        last_px,
        last_qty,
        trade_id,
        md_flags,
        md_flags2,
        security_id,
        rpt_seq,
        update_action,
        entry_type,
    })
}

/// Decode a reassembled snapshot buffer: one or more concatenated
/// SBEHeader + snapshot messages. The per-entry stride comes from the
/// repeating-group marker, so schemas that append trailing entry fields
/// still decode. On insufficient remainder mid-group the decode halts at
/// the last complete entry and keeps what it has.
fn decode_snapshots(buf: &[u8]) -> DecodeResult<Vec<OrderBookSnapshot>> {
    const SNAPSHOT_MIN_SIZE: usize = SBE_HEADER_SIZE + SNAPSHOT_PRELUDE_SIZE + SNAPSHOT_GROUP_SIZE;

    let mut snapshots = Vec::new();
    let mut offset = 0;

    while buf.len() - offset >= SNAPSHOT_MIN_SIZE {
        let (_sbe_header, next) = parse_sbe_header(buf, offset)?;
        offset = next;

        let security_id = codec::read_i32(buf, offset);
        let last_msg_seq_num_processed = codec::read_u32(buf, offset + 4);
        let rpt_seq = codec::read_u32(buf, offset + 8);
        let exchange_trading_session_id = codec::read_u32(buf, offset + 12);
        offset += SNAPSHOT_PRELUDE_SIZE;

        let stride = codec::read_u16(buf, offset) as usize;
        let entry_count = buf[offset + 2] as usize;
        offset += SNAPSHOT_GROUP_SIZE;

        if stride < SNAPSHOT_ENTRY_MIN_SIZE {
            return Err(DecodeError::InvalidBlockLength {
                stride,
                minimum: SNAPSHOT_ENTRY_MIN_SIZE,
            });
        }

        let mut entries = Vec::with_capacity(entry_count);
        let mut truncated = false;
        for _ in 0..entry_count {
            if buf.len() - offset < stride {
                truncated = true;
                break;
            }
            entries.push(decode_book_entry(buf, offset));
            offset += stride;
        }

        snapshots.push(OrderBookSnapshot {
            security_id,
            last_msg_seq_num_processed,
            rpt_seq,
            exchange_trading_session_id,
            entries,
        });

        if truncated {
            warn!(
                security_id,
                decoded = snapshots.last().map(|s| s.entries.len()).unwrap_or(0),
                expected = entry_count,
                "snapshot group truncated; keeping complete entries"
            );
            break;
        }
    }

    if snapshots.is_empty() {
        debug!(len = buf.len(), "snapshot buffer below minimum message size");
    }
    Ok(snapshots)
}

/// Decode one repeating-group entry; caller guarantees `stride` bytes at
/// `offset` and `stride >= SNAPSHOT_ENTRY_MIN_SIZE`. Bytes past the fixed
/// fields are newer-schema additions and are ignored.
fn decode_book_entry(buf: &[u8], mut offset: usize) -> OrderBookEntry {
    let md_entry_id = codec::read_i64(buf, offset);
    offset += 8;
    let transact_time = codec::read_u64(buf, offset);
    offset += 8;
    let md_entry_px = codec::read_decimal5(buf, offset);
    offset += 8;
    let md_entry_size = codec::read_i64(buf, offset);
    offset += 8;
    let trade_id = codec::read_i64(buf, offset);
    offset += 8;
    let md_flags = codec::read_u64(buf, offset);
    offset += 8;
    let md_flags2 = codec::read_u64(buf, offset);
    offset += 8;
    let entry_type = buf[offset] as char;

    OrderBookEntry {
        md_entry_id,
        transact_time,
        md_entry_px,
        md_entry_size,
        trade_id,
        md_flags,
        md_flags2,
        entry_type,
    }
}
