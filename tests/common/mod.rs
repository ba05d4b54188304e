//! Shared wire-image builders for the integration tests.
//!
//! The encoders mirror the packed wire layout exactly, so they double as
//! the re-encoding side of round-trip checks.

#![allow(dead_code)]

use byteorder::{BigEndian, LittleEndian, WriteBytesExt};

use simba_feed::pcap::{SIMBA_MULTICAST_ADDR, SIMBA_PORT, UDP_HEADER_SIZE};
use simba_feed::protocol::{
    OrderBookEntry, OrderExecution, OrderUpdate, TEMPLATE_ORDER_BOOK_SNAPSHOT,
};

pub const SCHEMA_ID: u16 = 19780;
pub const SCHEMA_VERSION: u16 = 4;

pub fn sbe_header(block_length: u16, template_id: u16) -> Vec<u8> {
    let mut buf = Vec::with_capacity(8);
    buf.write_u16::<LittleEndian>(block_length).unwrap();
    buf.write_u16::<LittleEndian>(template_id).unwrap();
    buf.write_u16::<LittleEndian>(SCHEMA_ID).unwrap();
    buf.write_u16::<LittleEndian>(SCHEMA_VERSION).unwrap();
    buf
}

pub fn encode_order_update(update: &OrderUpdate) -> Vec<u8> {
    let mut block = Vec::with_capacity(50);
    block.write_i64::<LittleEndian>(update.md_entry_id).unwrap();
    block
        .write_i64::<LittleEndian>(update.md_entry_px.mantissa)
        .unwrap();
    block
        .write_i64::<LittleEndian>(update.md_entry_size)
        .unwrap();
    block.write_u64::<LittleEndian>(update.md_flags).unwrap();
    block.write_u64::<LittleEndian>(update.md_flags2).unwrap();
    block.write_i32::<LittleEndian>(update.security_id).unwrap();
    block.write_u32::<LittleEndian>(update.rpt_seq).unwrap();
    block.push(update.update_action);
    block.push(update.entry_type as u8);
    block
}

pub fn encode_order_execution(execution: &OrderExecution) -> Vec<u8> {
    let mut block = Vec::with_capacity(74);
    block
        .write_i64::<LittleEndian>(execution.md_entry_id)
        .unwrap();
    block
        .write_i64::<LittleEndian>(execution.md_entry_px.mantissa)
        .unwrap();
    block
        .write_i64::<LittleEndian>(execution.md_entry_size)
        .unwrap();
    block
        .write_i64::<LittleEndian>(execution.last_px.mantissa)
        .unwrap();
    block.write_i64::<LittleEndian>(execution.last_qty).unwrap();
    block.write_i64::<LittleEndian>(execution.trade_id).unwrap();
    block.write_u64::<LittleEndian>(execution.md_flags).unwrap();
    block.write_u64::<LittleEndian>(execution.md_flags2).unwrap();
    block
        .write_i32::<LittleEndian>(execution.security_id)
        .unwrap();
    block.write_u32::<LittleEndian>(execution.rpt_seq).unwrap();
    block.push(execution.update_action);
    block.push(execution.entry_type as u8);
    block
}

pub fn encode_book_entry(entry: &OrderBookEntry) -> Vec<u8> {
    let mut buf = Vec::with_capacity(57);
    buf.write_i64::<LittleEndian>(entry.md_entry_id).unwrap();
    buf.write_u64::<LittleEndian>(entry.transact_time).unwrap();
    buf.write_i64::<LittleEndian>(entry.md_entry_px.mantissa)
        .unwrap();
    buf.write_i64::<LittleEndian>(entry.md_entry_size).unwrap();
    buf.write_i64::<LittleEndian>(entry.trade_id).unwrap();
    buf.write_u64::<LittleEndian>(entry.md_flags).unwrap();
    buf.write_u64::<LittleEndian>(entry.md_flags2).unwrap();
    buf.push(entry.entry_type as u8);
    buf
}

/// A complete SBE snapshot message: header, prelude, group marker, entries.
pub fn snapshot_message(
    security_id: i32,
    last_msg_seq_num_processed: u32,
    rpt_seq: u32,
    session_id: u32,
    entries: &[OrderBookEntry],
) -> Vec<u8> {
    let mut body = sbe_header(16, TEMPLATE_ORDER_BOOK_SNAPSHOT);
    body.write_i32::<LittleEndian>(security_id).unwrap();
    body.write_u32::<LittleEndian>(last_msg_seq_num_processed)
        .unwrap();
    body.write_u32::<LittleEndian>(rpt_seq).unwrap();
    body.write_u32::<LittleEndian>(session_id).unwrap();
    body.write_u16::<LittleEndian>(57).unwrap();
    body.push(entries.len() as u8);
    for entry in entries {
        body.extend_from_slice(&encode_book_entry(entry));
    }
    body
}

/// Market-data packet header followed by `body`. No incremental header.
pub fn snapshot_datagram(seq: u32, flags: u16, body: &[u8]) -> Vec<u8> {
    let mut payload = market_data_header(seq, flags);
    payload.extend_from_slice(body);
    payload
}

/// Market-data header, incremental header, then one SBE block per
/// (template, block) pair.
pub fn incremental_datagram(seq: u32, flags: u16, blocks: &[(u16, Vec<u8>)]) -> Vec<u8> {
    let mut payload = market_data_header(seq, flags);
    payload
        .write_u64::<LittleEndian>(1_700_000_000_000_000_000 + u64::from(seq))
        .unwrap();
    payload.write_u32::<LittleEndian>(4242).unwrap();
    for (template_id, block) in blocks {
        payload.extend_from_slice(&sbe_header(block.len() as u16, *template_id));
        payload.extend_from_slice(block);
    }
    payload
}

pub fn market_data_header(seq: u32, flags: u16) -> Vec<u8> {
    let mut buf = Vec::with_capacity(16);
    buf.write_u32::<LittleEndian>(seq).unwrap();
    buf.write_u16::<LittleEndian>(0).unwrap();
    buf.write_u16::<LittleEndian>(flags).unwrap();
    buf.write_u64::<LittleEndian>(1_650_000_000_000_000_000)
        .unwrap();
    buf
}

pub fn sample_update(security_id: i32, rpt_seq: u32) -> OrderUpdate {
    OrderUpdate {
        md_entry_id: 1,
        md_entry_px: simba_feed::Decimal5::new(30000),
        md_entry_size: 100,
        md_flags: 0,
        md_flags2: 0,
        security_id,
        rpt_seq,
        update_action: 0,
        entry_type: '0',
    }
}

pub fn sample_execution(security_id: i32, rpt_seq: u32) -> OrderExecution {
    OrderExecution {
        md_entry_id: 2,
        md_entry_px: simba_feed::Decimal5::new(31000),
        md_entry_size: 50,
        last_px: simba_feed::Decimal5::new(31000),
        last_qty: 50,
        trade_id: 9001,
        md_flags: 0x2,
        md_flags2: 0,
        security_id,
        rpt_seq,
        update_action: 2,
        entry_type: '1',
    }
}

pub fn sample_entry(md_entry_id: i64) -> OrderBookEntry {
    OrderBookEntry {
        md_entry_id,
        transact_time: 1_650_000_000_000_000_000,
        md_entry_px: simba_feed::Decimal5::new(100_000 + md_entry_id),
        md_entry_size: 10 * md_entry_id,
        trade_id: 0,
        md_flags: 0x1,
        md_flags2: 0,
        entry_type: '0',
    }
}

/// Ethernet II / IPv4 / UDP frame around a payload.
pub fn udp_frame(dest_addr: [u8; 4], dest_port: u16, payload: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(42 + payload.len());
    frame.extend_from_slice(&[0x01, 0x00, 0x5e, 0x43, 0x14, 0x52]);
    frame.extend_from_slice(&[0x02, 0x42, 0xac, 0x11, 0x00, 0x02]);
    frame.write_u16::<BigEndian>(0x0800).unwrap();

    frame.push(0x45);
    frame.push(0);
    frame
        .write_u16::<BigEndian>((20 + UDP_HEADER_SIZE + payload.len()) as u16)
        .unwrap();
    frame.write_u16::<BigEndian>(0).unwrap();
    frame.write_u16::<BigEndian>(0).unwrap();
    frame.push(16);
    frame.push(17);
    frame.write_u16::<BigEndian>(0).unwrap();
    frame.extend_from_slice(&[10, 0, 0, 1]);
    frame.extend_from_slice(&dest_addr);

    frame.write_u16::<BigEndian>(5000).unwrap();
    frame.write_u16::<BigEndian>(dest_port).unwrap();
    frame
        .write_u16::<BigEndian>((UDP_HEADER_SIZE + payload.len()) as u16)
        .unwrap();
    frame.write_u16::<BigEndian>(0).unwrap();
    frame.extend_from_slice(payload);
    frame
}

pub fn simba_frame(payload: &[u8]) -> Vec<u8> {
    udp_frame(SIMBA_MULTICAST_ADDR, SIMBA_PORT, payload)
}

/// A classic little-endian pcap capture wrapping the given frames.
pub fn pcap_capture(frames: &[Vec<u8>]) -> Vec<u8> {
    let mut capture = Vec::new();
    capture.write_u32::<LittleEndian>(0xa1b2c3d4).unwrap();
    capture.write_u16::<LittleEndian>(2).unwrap();
    capture.write_u16::<LittleEndian>(4).unwrap();
    capture.write_u32::<LittleEndian>(0).unwrap();
    capture.write_u32::<LittleEndian>(0).unwrap();
    capture.write_u32::<LittleEndian>(65535).unwrap();
    capture.write_u32::<LittleEndian>(1).unwrap();

    for (i, frame) in frames.iter().enumerate() {
        capture
            .write_u32::<LittleEndian>(1_700_000_000 + i as u32)
            .unwrap();
        capture.write_u32::<LittleEndian>(0).unwrap();
        capture.write_u32::<LittleEndian>(frame.len() as u32).unwrap();
        capture.write_u32::<LittleEndian>(frame.len() as u32).unwrap();
        capture.extend_from_slice(frame);
    }
    capture
}
