/// Synthetic SIMBA capture generator
///
/// Creates realistic SIMBA SPECTRA order flow and writes it as a classic
/// pcap capture: randomized order updates and executions plus periodic
/// multi-fragment snapshot sequences. Useful for testing and benchmarking
/// the replay utility.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use byteorder::{BigEndian, LittleEndian, WriteBytesExt};
use clap::Parser;
use rand::Rng;

use simba_feed::pcap::{SIMBA_MULTICAST_ADDR, SIMBA_PORT, UDP_HEADER_SIZE};
use simba_feed::protocol::{
    MsgFlags, ORDER_EXECUTION_BLOCK_SIZE, ORDER_UPDATE_BLOCK_SIZE, SNAPSHOT_ENTRY_MIN_SIZE,
    TEMPLATE_ORDER_BOOK_SNAPSHOT, TEMPLATE_ORDER_EXECUTION, TEMPLATE_ORDER_UPDATE,
};

const SCHEMA_ID: u16 = 19780;
const SCHEMA_VERSION: u16 = 4;

#[derive(Parser, Debug)]
#[command(
    name = "feed-generator",
    version,
    about = "Generate a synthetic SIMBA capture"
)]
struct Cli {
    /// Output capture path
    #[arg(default_value = "simba_synth.pcap")]
    output: PathBuf,

    /// Number of datagrams to generate
    #[arg(long, default_value_t = 10_000)]
    datagrams: usize,

    /// Number of instruments to spread traffic across
    #[arg(long, default_value_t = 8)]
    instruments: i32,
}

fn main() -> std::io::Result<()> {
    let cli = Cli::parse();
    let mut output = BufWriter::new(File::create(&cli.output)?);
    let mut rng = rand::thread_rng();

    println!(
        "Generating {} datagrams to {}",
        cli.datagrams,
        cli.output.display()
    );

    write_global_header(&mut output)?;

    let mut seq = 1u32;
    let mut entry_id = 1000i64;
    let mut generated = 0usize;

    while generated < cli.datagrams {
        let security_id = rng.gen_range(1..=cli.instruments);
        let transact_time = 1_700_000_000_000_000_000u64 + u64::from(seq) * 1_000_000;

        match rng.gen_range(0u8..10) {
            // Occasional three-fragment snapshot sequence.
            0 => {
                let fragment_flags = [
                    MsgFlags::START_OF_SNAPSHOT,
                    0,
                    MsgFlags::END_OF_SNAPSHOT | MsgFlags::LAST_FRAGMENT,
                ];
                for flags in fragment_flags {
                    let body = snapshot_message(&mut rng, security_id, seq, 3, &mut entry_id);
                    let payload = datagram(seq, flags, None, &body);
                    write_record(&mut output, seq, &wrap_udp_frame(&payload))?;
                    seq += 1;
                    generated += 1;
                }
            }
            1..=6 => {
                let block = order_update_block(&mut rng, security_id, seq, &mut entry_id);
                let body = sbe_message(TEMPLATE_ORDER_UPDATE, ORDER_UPDATE_BLOCK_SIZE, &block);
                let flags = MsgFlags::INCREMENTAL_PACKET | MsgFlags::LAST_FRAGMENT;
                let payload = datagram(seq, flags, Some(transact_time), &body);
                write_record(&mut output, seq, &wrap_udp_frame(&payload))?;
                seq += 1;
                generated += 1;
            }
            _ => {
                let block = order_execution_block(&mut rng, security_id, seq, &mut entry_id);
                let body = sbe_message(TEMPLATE_ORDER_EXECUTION, ORDER_EXECUTION_BLOCK_SIZE, &block);
                let flags = MsgFlags::INCREMENTAL_PACKET | MsgFlags::LAST_FRAGMENT;
                let payload = datagram(seq, flags, Some(transact_time), &body);
                write_record(&mut output, seq, &wrap_udp_frame(&payload))?;
                seq += 1;
                generated += 1;
            }
        }

        if generated % 1000 == 0 && generated > 0 {
            println!("Generated {generated} datagrams");
        }
    }

    output.flush()?;
    println!("Capture complete: {generated} datagrams");
    Ok(())
}

fn write_global_header<W: Write>(w: &mut W) -> std::io::Result<()> {
    w.write_u32::<LittleEndian>(0xa1b2c3d4)?; // microsecond magic
    w.write_u16::<LittleEndian>(2)?;
    w.write_u16::<LittleEndian>(4)?;
    w.write_u32::<LittleEndian>(0)?; // thiszone
    w.write_u32::<LittleEndian>(0)?; // sigfigs
    w.write_u32::<LittleEndian>(65535)?; // snaplen
    w.write_u32::<LittleEndian>(1)?; // Ethernet
    Ok(())
}

fn write_record<W: Write>(w: &mut W, seq: u32, frame: &[u8]) -> std::io::Result<()> {
    w.write_u32::<LittleEndian>(1_700_000_000 + seq / 1000)?;
    w.write_u32::<LittleEndian>((seq % 1000) * 1000)?;
    w.write_u32::<LittleEndian>(frame.len() as u32)?;
    w.write_u32::<LittleEndian>(frame.len() as u32)?;
    w.write_all(frame)?;
    Ok(())
}

/// Ethernet II / IPv4 / UDP framing around a SIMBA payload, addressed to
/// the canonical multicast group and port. Checksums are left zero.
fn wrap_udp_frame(payload: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(42 + payload.len());
    frame.extend_from_slice(&[0x01, 0x00, 0x5e, 0x43, 0x14, 0x52]); // group mac
    frame.extend_from_slice(&[0x02, 0x42, 0xac, 0x11, 0x00, 0x02]); // src mac
    frame.write_u16::<BigEndian>(0x0800).unwrap();

    frame.push(0x45);
    frame.push(0);
    frame
        .write_u16::<BigEndian>((20 + UDP_HEADER_SIZE + payload.len()) as u16)
        .unwrap();
    frame.write_u16::<BigEndian>(0).unwrap();
    frame.write_u16::<BigEndian>(0).unwrap();
    frame.push(16);
    frame.push(17); // UDP
    frame.write_u16::<BigEndian>(0).unwrap();
    frame.extend_from_slice(&[10, 0, 0, 1]);
    frame.extend_from_slice(&SIMBA_MULTICAST_ADDR);

    frame.write_u16::<BigEndian>(5000).unwrap();
    frame.write_u16::<BigEndian>(SIMBA_PORT).unwrap();
    frame
        .write_u16::<BigEndian>((UDP_HEADER_SIZE + payload.len()) as u16)
        .unwrap();
    frame.write_u16::<BigEndian>(0).unwrap();
    frame.extend_from_slice(payload);
    frame
}

/// A full SIMBA datagram: market-data header, optional incremental header,
/// then the SBE message bytes.
fn datagram(seq: u32, flags: u16, transact_time: Option<u64>, body: &[u8]) -> Vec<u8> {
    let mut payload = Vec::with_capacity(28 + body.len());
    payload.write_u32::<LittleEndian>(seq).unwrap();
    payload.write_u16::<LittleEndian>(0).unwrap(); // msg_size, unused by the decoder
    payload.write_u16::<LittleEndian>(flags).unwrap();
    payload
        .write_u64::<LittleEndian>(1_700_000_000_000_000_000 + u64::from(seq))
        .unwrap();

    if let Some(transact_time) = transact_time {
        payload.write_u64::<LittleEndian>(transact_time).unwrap();
        payload.write_u32::<LittleEndian>(4242).unwrap(); // trading session
    }

    payload.extend_from_slice(body);
    payload
}

fn sbe_message(template_id: u16, block_length: usize, block: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(8 + block.len());
    body.write_u16::<LittleEndian>(block_length as u16).unwrap();
    body.write_u16::<LittleEndian>(template_id).unwrap();
    body.write_u16::<LittleEndian>(SCHEMA_ID).unwrap();
    body.write_u16::<LittleEndian>(SCHEMA_VERSION).unwrap();
    body.extend_from_slice(block);
    body
}

fn order_update_block<R: Rng>(
    rng: &mut R,
    security_id: i32,
    rpt_seq: u32,
    entry_id: &mut i64,
) -> Vec<u8> {
    *entry_id += 1;
    let mut block = Vec::with_capacity(ORDER_UPDATE_BLOCK_SIZE);
    block.write_i64::<LittleEndian>(*entry_id).unwrap();
    block
        .write_i64::<LittleEndian>(rng.gen_range(1_000_000..200_000_000))
        .unwrap(); // price mantissa
    block
        .write_i64::<LittleEndian>(rng.gen_range(1..1000))
        .unwrap();
    block.write_u64::<LittleEndian>(0x1).unwrap(); // day order
    block.write_u64::<LittleEndian>(0).unwrap();
    block.write_i32::<LittleEndian>(security_id).unwrap();
    block.write_u32::<LittleEndian>(rpt_seq).unwrap();
    block.push(rng.gen_range(0u8..3)); // action
    block.push(if rng.gen_bool(0.5) { b'0' } else { b'1' });
    block
}

fn order_execution_block<R: Rng>(
    rng: &mut R,
    security_id: i32,
    rpt_seq: u32,
    entry_id: &mut i64,
) -> Vec<u8> {
    let price = rng.gen_range(1_000_000..200_000_000);
    let qty = rng.gen_range(1..500);
    let mut block = Vec::with_capacity(ORDER_EXECUTION_BLOCK_SIZE);
    block.write_i64::<LittleEndian>(*entry_id).unwrap();
    block.write_i64::<LittleEndian>(price).unwrap();
    block.write_i64::<LittleEndian>(qty).unwrap();
    block.write_i64::<LittleEndian>(price).unwrap(); // last px
    block.write_i64::<LittleEndian>(qty).unwrap(); // last qty
    block
        .write_i64::<LittleEndian>(rng.gen_range(1..1_000_000))
        .unwrap(); // trade id
    block.write_u64::<LittleEndian>(0x2).unwrap(); // fill
    block.write_u64::<LittleEndian>(0).unwrap();
    block.write_i32::<LittleEndian>(security_id).unwrap();
    block.write_u32::<LittleEndian>(rpt_seq).unwrap();
    block.push(2); // executions delete or reduce
    block.push(if rng.gen_bool(0.5) { b'0' } else { b'1' });
    block
}

fn snapshot_message<R: Rng>(
    rng: &mut R,
    security_id: i32,
    rpt_seq: u32,
    entries: u8,
    entry_id: &mut i64,
) -> Vec<u8> {
    let mut body = Vec::new();
    body.write_u16::<LittleEndian>(16).unwrap(); // root block length
    body.write_u16::<LittleEndian>(TEMPLATE_ORDER_BOOK_SNAPSHOT)
        .unwrap();
    body.write_u16::<LittleEndian>(SCHEMA_ID).unwrap();
    body.write_u16::<LittleEndian>(SCHEMA_VERSION).unwrap();

    body.write_i32::<LittleEndian>(security_id).unwrap();
    body.write_u32::<LittleEndian>(rpt_seq).unwrap(); // last seq processed
    body.write_u32::<LittleEndian>(rpt_seq).unwrap();
    body.write_u32::<LittleEndian>(4242).unwrap(); // trading session
    body.write_u16::<LittleEndian>(SNAPSHOT_ENTRY_MIN_SIZE as u16)
        .unwrap();
    body.push(entries);

    for _ in 0..entries {
        *entry_id += 1;
        body.write_i64::<LittleEndian>(*entry_id).unwrap();
        body.write_u64::<LittleEndian>(1_700_000_000_000_000_000)
            .unwrap();
        body.write_i64::<LittleEndian>(rng.gen_range(1_000_000..200_000_000))
            .unwrap();
        body.write_i64::<LittleEndian>(rng.gen_range(1..1000))
            .unwrap();
        body.write_i64::<LittleEndian>(0).unwrap(); // trade id
        body.write_u64::<LittleEndian>(0x1).unwrap();
        body.write_u64::<LittleEndian>(0).unwrap();
        body.push(if rng.gen_bool(0.5) { b'0' } else { b'1' });
    }
    body
}
