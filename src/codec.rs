/// Primitive little-endian codec
///
/// Fixed-width reads from an unaligned byte cursor. Each reader consumes
/// exactly its width at the given offset and keeps no state; the caller
/// tracks the offset and performs the bounds check before every read.
/// On little-endian hosts byteorder compiles these down to plain loads.

use byteorder::{ByteOrder, LittleEndian};

use crate::protocol::Decimal5;

#[inline]
pub fn read_u16(buf: &[u8], offset: usize) -> u16 {
    LittleEndian::read_u16(&buf[offset..offset + 2])
}

#[inline]
pub fn read_u32(buf: &[u8], offset: usize) -> u32 {
    LittleEndian::read_u32(&buf[offset..offset + 4])
}

#[inline]
pub fn read_u64(buf: &[u8], offset: usize) -> u64 {
    LittleEndian::read_u64(&buf[offset..offset + 8])
}

#[inline]
pub fn read_i32(buf: &[u8], offset: usize) -> i32 {
    LittleEndian::read_i32(&buf[offset..offset + 4])
}

#[inline]
pub fn read_i64(buf: &[u8], offset: usize) -> i64 {
    LittleEndian::read_i64(&buf[offset..offset + 8])
}

/// Reads the 8-byte mantissa; the exponent is implicit.
#[inline]
pub fn read_decimal5(buf: &[u8], offset: usize) -> Decimal5 {
    Decimal5::new(read_i64(buf, offset))
}
