/// SIMBA Feed - Moscow Exchange SIMBA SPECTRA market data decoder
///
/// Decodes captured UDP market-data streams into typed records. Features:
/// - Nested header parsing (market-data packet, incremental packet, SBE block)
/// - Per-instrument fragment reassembly for multi-datagram messages
/// - Bounds-safe little-endian field codec, no struct overlays
/// - Order update, order execution and order-book snapshot decoding
/// - Transport sequence gap observation and feed statistics
/// - Classic pcap ingest with Ethernet/IPv4/UDP demultiplexing

pub mod codec;
pub mod decoder;
pub mod gap_detector;
pub mod pcap;
pub mod protocol;
pub mod stats;

pub use decoder::{DecodeError, HeaderKind, Messages, SimbaDecoder};
pub use gap_detector::GapDetector;
pub use pcap::{PcapError, PcapReader, PcapRecord, UdpDatagram};
pub use protocol::{
    Decimal5, DecodedMessage, EntryType, IncrementalPacketHeader, MarketDataPacketHeader, MsgFlags,
    OrderBookEntry, OrderBookSnapshot, OrderExecution, OrderUpdate, SbeHeader, UpdateAction,
};
pub use stats::{DecoderStats, FeedStats, LatencyStats};
