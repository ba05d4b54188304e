/// SIMBA SPECTRA wire layout
///
/// Nested framing, all little-endian, packed, no padding:
///   Market Data Packet Header: 16 bytes
///     [msg_seq_num u32][msg_size u16][msg_flags u16][sending_time u64]
///   Incremental Packet Header: 12 bytes (only when IncrementalPacket flag set)
///     [transact_time u64][exchange_trading_session_id u32]
///   SBE Header: 8 bytes
///     [block_length u16][template_id u16][schema_id u16][version u16]
/// followed by the template-specific message block.

use std::fmt;

pub const MD_HEADER_SIZE: usize = 16;
pub const INCREMENTAL_HEADER_SIZE: usize = 12;
pub const SBE_HEADER_SIZE: usize = 8;

pub const TEMPLATE_ORDER_UPDATE: u16 = 15;
pub const TEMPLATE_ORDER_EXECUTION: u16 = 16;
pub const TEMPLATE_ORDER_BOOK_SNAPSHOT: u16 = 17;

// Pinned block sizes of the packed wire layout, independent of any
// in-memory struct layout.
pub const ORDER_UPDATE_BLOCK_SIZE: usize = 50;
pub const ORDER_EXECUTION_BLOCK_SIZE: usize = 74;
pub const SNAPSHOT_PRELUDE_SIZE: usize = 16;
pub const SNAPSHOT_GROUP_SIZE: usize = 3;
pub const SNAPSHOT_ENTRY_MIN_SIZE: usize = 57;

/// Market Data Packet Header: leads every SIMBA datagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarketDataPacketHeader {
    pub msg_seq_num: u32,
    pub msg_size: u16,
    pub msg_flags: u16,
    pub sending_time: u64,
}

/// Incremental Packet Header: present only on incremental packets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IncrementalPacketHeader {
    pub transact_time: u64,
    pub exchange_trading_session_id: u32,
}

/// SBE block framing header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SbeHeader {
    pub block_length: u16,
    pub template_id: u16,
    pub schema_id: u16,
    pub version: u16,
}

/// Decoded view of the msg_flags bit-set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MsgFlags(pub u16);

impl MsgFlags {
    pub const LAST_FRAGMENT: u16 = 0x01;
    pub const START_OF_SNAPSHOT: u16 = 0x02;
    pub const END_OF_SNAPSHOT: u16 = 0x04;
    pub const INCREMENTAL_PACKET: u16 = 0x08;

    pub fn last_fragment(self) -> bool {
        self.0 & Self::LAST_FRAGMENT != 0
    }

    pub fn start_of_snapshot(self) -> bool {
        self.0 & Self::START_OF_SNAPSHOT != 0
    }

    pub fn end_of_snapshot(self) -> bool {
        self.0 & Self::END_OF_SNAPSHOT != 0
    }

    pub fn incremental_packet(self) -> bool {
        self.0 & Self::INCREMENTAL_PACKET != 0
    }
}

/// Fixed-point price with an implicit exponent of -5.
/// The exponent is a compile-time constant, never carried on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decimal5 {
    pub mantissa: i64,
}

impl Decimal5 {
    pub const EXPONENT: i32 = -5;

    pub fn new(mantissa: i64) -> Self {
        Decimal5 { mantissa }
    }

    pub fn to_f64(self) -> f64 {
        self.mantissa as f64 / 100000.0
    }
}

impl fmt::Display for Decimal5 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_f64())
    }
}

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateAction {
    New = 0,
    Change = 1,
    Delete = 2,
}

impl UpdateAction {
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(UpdateAction::New),
            1 => Some(UpdateAction::Change),
            2 => Some(UpdateAction::Delete),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryType {
    Bid,
    Offer,
    EmptyBook,
}

impl EntryType {
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            '0' => Some(EntryType::Bid),
            '1' => Some(EntryType::Offer),
            'J' => Some(EntryType::EmptyBook),
            _ => None,
        }
    }
}

/// OrderUpdate (template 15): one order add/modify/delete.
///
/// update_action and entry_type keep the raw wire discriminants so unknown
/// values pass through untouched; the typed accessors interpret them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrderUpdate {
    pub md_entry_id: i64,
    pub md_entry_px: Decimal5,
    pub md_entry_size: i64,
    pub md_flags: u64,
    pub md_flags2: u64,
    pub security_id: i32,
    pub rpt_seq: u32,
    pub update_action: u8,
    pub entry_type: char,
}

impl OrderUpdate {
    pub fn update_action(&self) -> Option<UpdateAction> {
        UpdateAction::from_u8(self.update_action)
    }

    pub fn entry_type(&self) -> Option<EntryType> {
        EntryType::from_char(self.entry_type)
    }
}

/// OrderExecution (template 16): a fill against a resting order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrderExecution {
    pub md_entry_id: i64,
    pub md_entry_px: Decimal5,
    pub md_entry_size: i64,
    pub last_px: Decimal5,
    pub last_qty: i64,
    pub trade_id: i64,
    pub md_flags: u64,
    pub md_flags2: u64,
    pub security_id: i32,
    pub rpt_seq: u32,
    pub update_action: u8,
    pub entry_type: char,
}

impl OrderExecution {
    pub fn update_action(&self) -> Option<UpdateAction> {
        UpdateAction::from_u8(self.update_action)
    }

    pub fn entry_type(&self) -> Option<EntryType> {
        EntryType::from_char(self.entry_type)
    }
}

/// One repeating-group entry of an OrderBookSnapshot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrderBookEntry {
    pub md_entry_id: i64,
    pub transact_time: u64,
    pub md_entry_px: Decimal5,
    pub md_entry_size: i64,
    pub trade_id: i64,
    pub md_flags: u64,
    pub md_flags2: u64,
    pub entry_type: char,
}

impl OrderBookEntry {
    pub fn entry_type(&self) -> Option<EntryType> {
        EntryType::from_char(self.entry_type)
    }
}

/// OrderBookSnapshot (template 17): full book dump for one instrument.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderBookSnapshot {
    pub security_id: i32,
    pub last_msg_seq_num_processed: u32,
    pub rpt_seq: u32,
    pub exchange_trading_session_id: u32,
    pub entries: Vec<OrderBookEntry>,
}

/// A fully-decoded logical message, tagged by template.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedMessage {
    OrderUpdate(OrderUpdate),
    OrderExecution(OrderExecution),
    OrderBookSnapshot(OrderBookSnapshot),
}

impl DecodedMessage {
    pub fn template_id(&self) -> u16 {
        match self {
            DecodedMessage::OrderUpdate(_) => TEMPLATE_ORDER_UPDATE,
            DecodedMessage::OrderExecution(_) => TEMPLATE_ORDER_EXECUTION,
            DecodedMessage::OrderBookSnapshot(_) => TEMPLATE_ORDER_BOOK_SNAPSHOT,
        }
    }

    pub fn security_id(&self) -> i32 {
        match self {
            DecodedMessage::OrderUpdate(m) => m.security_id,
            DecodedMessage::OrderExecution(m) => m.security_id,
            DecodedMessage::OrderBookSnapshot(s) => s.security_id,
        }
    }
}
