/// Capture-file ingest and UDP demultiplexing
///
/// Reads classic pcap captures (both magics, native or byte-swapped) and
/// extracts the UDP payloads the decoder consumes: Ethernet II frames
/// carrying IPv4/UDP to the SIMBA multicast feed. Anything else in the
/// capture is skipped, not an error.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use thiserror::Error;

pub const PCAP_GLOBAL_HEADER_SIZE: usize = 24;
pub const PCAP_RECORD_HEADER_SIZE: usize = 16;

const MAGIC_MICROS: u32 = 0xa1b2c3d4;
const MAGIC_NANOS: u32 = 0xa1b23c4d;

pub const ETHERNET_HEADER_SIZE: usize = 14;
pub const UDP_HEADER_SIZE: usize = 8;
const ETHERTYPE_IPV4: u16 = 0x0800;
const IP_PROTOCOL_UDP: u8 = 17;

/// Canonical SIMBA SPECTRA destination.
pub const SIMBA_PORT: u16 = 44040;
pub const SIMBA_MULTICAST_ADDR: [u8; 4] = [239, 195, 20, 82];

#[derive(Error, Debug)]
pub enum PcapError {
    #[error("capture read failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("unrecognized capture magic 0x{0:08x}")]
    BadMagic(u32),

    #[error("truncated capture record")]
    TruncatedRecord,
}

pub type PcapResult<T> = Result<T, PcapError>;

/// One captured frame with its record-header metadata.
#[derive(Debug, Clone)]
pub struct PcapRecord {
    pub ts_sec: u32,
    /// Microseconds or nanoseconds depending on the capture magic; see
    /// [`PcapReader::nanosecond_timestamps`].
    pub ts_subsec: u32,
    pub orig_len: u32,
    pub data: Vec<u8>,
}

/// Sequential reader over a classic pcap capture.
pub struct PcapReader<R> {
    input: R,
    swapped: bool,
    nanos: bool,
}

impl PcapReader<BufReader<File>> {
    pub fn open<P: AsRef<Path>>(path: P) -> PcapResult<Self> {
        let file = File::open(path)?;
        PcapReader::new(BufReader::new(file))
    }
}

impl<R: Read> PcapReader<R> {
    /// Reads and validates the 24-byte global header.
    pub fn new(mut input: R) -> PcapResult<Self> {
        let mut header = [0u8; PCAP_GLOBAL_HEADER_SIZE];
        input.read_exact(&mut header)?;

        let magic = LittleEndian::read_u32(&header[0..4]);
        let (swapped, nanos) = match magic {
            MAGIC_MICROS => (false, false),
            MAGIC_NANOS => (false, true),
            m if m.swap_bytes() == MAGIC_MICROS => (true, false),
            m if m.swap_bytes() == MAGIC_NANOS => (true, true),
            other => return Err(PcapError::BadMagic(other)),
        };

        Ok(PcapReader {
            input,
            swapped,
            nanos,
        })
    }

    /// True when record timestamps carry nanoseconds rather than
    /// microseconds.
    pub fn nanosecond_timestamps(&self) -> bool {
        self.nanos
    }

    /// Next record, or None at a clean end of capture. A record header or
    /// body cut short mid-file is an error.
    pub fn next_record(&mut self) -> PcapResult<Option<PcapRecord>> {
        let mut header = [0u8; PCAP_RECORD_HEADER_SIZE];
        let read = read_until_full(&mut self.input, &mut header)?;
        if read == 0 {
            return Ok(None);
        }
        if read < PCAP_RECORD_HEADER_SIZE {
            return Err(PcapError::TruncatedRecord);
        }

        let ts_sec = self.read_u32(&header, 0);
        let ts_subsec = self.read_u32(&header, 4);
        let incl_len = self.read_u32(&header, 8);
        let orig_len = self.read_u32(&header, 12);

        let mut data = vec![0u8; incl_len as usize];
        self.input
            .read_exact(&mut data)
            .map_err(|_| PcapError::TruncatedRecord)?;

        Ok(Some(PcapRecord {
            ts_sec,
            ts_subsec,
            orig_len,
            data,
        }))
    }

    fn read_u32(&self, buf: &[u8], offset: usize) -> u32 {
        if self.swapped {
            BigEndian::read_u32(&buf[offset..offset + 4])
        } else {
            LittleEndian::read_u32(&buf[offset..offset + 4])
        }
    }
}

/// Reads until `buf` is full or EOF; returns the number of bytes read.
fn read_until_full<R: Read>(input: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut total = 0;
    while total < buf.len() {
        let n = input.read(&mut buf[total..])?;
        if n == 0 {
            break;
        }
        total += n;
    }
    Ok(total)
}

/// A demultiplexed UDP datagram borrowed from a captured frame.
#[derive(Debug, Clone, Copy)]
pub struct UdpDatagram<'a> {
    pub src_port: u16,
    pub dest_port: u16,
    pub dest_addr: [u8; 4],
    pub payload: &'a [u8],
}

impl UdpDatagram<'_> {
    /// True for the canonical SIMBA destination (group 239.195.20.82,
    /// port 44040).
    pub fn is_simba(&self) -> bool {
        self.dest_port == SIMBA_PORT && self.dest_addr == SIMBA_MULTICAST_ADDR
    }
}

/// Extract the UDP payload of an Ethernet II / IPv4 / UDP frame.
/// Returns None for every frame that is not such a packet: wrong
/// EtherType, non-IPv4, non-UDP, or too short at any layer.
pub fn udp_payload(frame: &[u8]) -> Option<UdpDatagram<'_>> {
    if frame.len() < ETHERNET_HEADER_SIZE {
        return None;
    }
    if BigEndian::read_u16(&frame[12..14]) != ETHERTYPE_IPV4 {
        return None;
    }

    let ip = &frame[ETHERNET_HEADER_SIZE..];
    if ip.len() < 20 {
        return None;
    }
    let version_ihl = ip[0];
    if version_ihl >> 4 != 4 {
        return None;
    }
    let ihl = usize::from(version_ihl & 0x0f) * 4;
    if ihl < 20 || ip.len() < ihl + UDP_HEADER_SIZE {
        return None;
    }
    if ip[9] != IP_PROTOCOL_UDP {
        return None;
    }
    let dest_addr = [ip[16], ip[17], ip[18], ip[19]];

    let udp = &ip[ihl..];
    let src_port = BigEndian::read_u16(&udp[0..2]);
    let dest_port = BigEndian::read_u16(&udp[2..4]);
    let udp_length = usize::from(BigEndian::read_u16(&udp[4..6]));
    if udp_length < UDP_HEADER_SIZE || udp.len() < udp_length {
        return None;
    }

    Some(UdpDatagram {
        src_port,
        dest_port,
        dest_addr,
        payload: &udp[UDP_HEADER_SIZE..udp_length],
    })
}
