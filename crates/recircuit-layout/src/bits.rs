//! Bit-level reads and writes over byte buffers.
//!
//! Bit `n` of a buffer lives in byte `n / 8`, at position `n % 8` counted
//! from the least significant bit. Multi-bit values are stored low bits
//! first, so a byte-aligned field of 8, 16 or 32 bits is plain little-endian.
//! This is the layout a packed little-endian C bit-field aggregate produces.

/// Number of bytes needed to hold `bits` bits.
pub const fn bytes_for_bits(bits: u32) -> usize {
    bits.div_ceil(8) as usize
}

/// Whether `value` is representable in `bit_width` bits.
pub const fn fits(value: u64, bit_width: u32) -> bool {
    bit_width >= 64 || value < (1u64 << bit_width)
}

/// Write the low `bit_width` bits of `value` at `bit_offset`.
///
/// Bits of `value` above `bit_width` are ignored. Panics if the target range
/// runs past the end of `buf`.
pub fn write_bits(buf: &mut [u8], bit_offset: u32, bit_width: u32, value: u64) {
    debug_assert!(bit_width <= 64);
    let mut value = value;
    let mut pos = bit_offset;
    let mut remaining = bit_width;
    while remaining > 0 {
        let byte = (pos / 8) as usize;
        let shift = pos % 8;
        let take = (8 - shift).min(remaining);
        let mask = (((1u16 << take) - 1) as u8) << shift;
        buf[byte] = (buf[byte] & !mask) | (((value as u8) << shift) & mask);
        value >>= take;
        pos += take;
        remaining -= take;
    }
}

/// Read `bit_width` bits starting at `bit_offset`.
pub fn read_bits(buf: &[u8], bit_offset: u32, bit_width: u32) -> u64 {
    debug_assert!(bit_width <= 64);
    let mut out = 0u64;
    let mut pos = bit_offset;
    let mut got = 0;
    while got < bit_width {
        let byte = (pos / 8) as usize;
        let shift = pos % 8;
        let take = (8 - shift).min(bit_width - got);
        let chunk = u64::from(buf[byte] >> shift) & ((1u64 << take) - 1);
        out |= chunk << got;
        got += take;
        pos += take;
    }
    out
}

/// Copy the first `bit_width` bits of `src` into `dst` at `bit_offset`.
pub fn copy_bits_in(dst: &mut [u8], bit_offset: u32, src: &[u8], bit_width: u32) {
    if bit_offset % 8 == 0 && bit_width % 8 == 0 {
        let start = (bit_offset / 8) as usize;
        let len = (bit_width / 8) as usize;
        dst[start..start + len].copy_from_slice(&src[..len]);
        return;
    }
    let mut done = 0;
    for &byte in src {
        if done >= bit_width {
            break;
        }
        let take = (bit_width - done).min(8);
        write_bits(dst, bit_offset + done, take, u64::from(byte));
        done += take;
    }
}

/// Copy `bit_width` bits of `src` starting at `bit_offset` into the front of `dst`.
pub fn copy_bits_out(src: &[u8], bit_offset: u32, bit_width: u32, dst: &mut [u8]) {
    if bit_offset % 8 == 0 && bit_width % 8 == 0 {
        let start = (bit_offset / 8) as usize;
        let len = (bit_width / 8) as usize;
        dst[..len].copy_from_slice(&src[start..start + len]);
        return;
    }
    let mut done = 0;
    for byte in dst.iter_mut() {
        if done >= bit_width {
            break;
        }
        let take = (bit_width - done).min(8);
        *byte = read_bits(src, bit_offset + done, take) as u8;
        done += take;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_counts_round_up() {
        assert_eq!(bytes_for_bits(0), 0);
        assert_eq!(bytes_for_bits(1), 1);
        assert_eq!(bytes_for_bits(8), 1);
        assert_eq!(bytes_for_bits(9), 2);
        assert_eq!(bytes_for_bits(96), 12);
    }

    #[test]
    fn fits_is_strict() {
        assert!(fits(0, 1));
        assert!(fits(1, 1));
        assert!(!fits(2, 1));
        assert!(fits(65_535, 16));
        assert!(!fits(65_536, 16));
        assert!(fits(u64::MAX, 64));
    }

    #[test]
    fn aligned_fields_are_little_endian() {
        let mut buf = [0u8; 6];
        write_bits(&mut buf, 0, 16, 0xBEEF);
        write_bits(&mut buf, 16, 32, 0x1234_5678);
        assert_eq!(buf, [0xEF, 0xBE, 0x78, 0x56, 0x34, 0x12]);
        assert_eq!(read_bits(&buf, 0, 16), 0xBEEF);
        assert_eq!(read_bits(&buf, 16, 32), 0x1234_5678);
    }

    #[test]
    fn sub_byte_fields_share_a_byte() {
        let mut buf = [0u8; 2];
        write_bits(&mut buf, 0, 3, 0b101);
        write_bits(&mut buf, 3, 7, 0b111_0011);
        write_bits(&mut buf, 10, 6, 0b10_1010);
        assert_eq!(read_bits(&buf, 0, 3), 0b101);
        assert_eq!(read_bits(&buf, 3, 7), 0b111_0011);
        assert_eq!(read_bits(&buf, 10, 6), 0b10_1010);
        assert_eq!(buf[0] & 0b111, 0b101);
    }

    #[test]
    fn overwrite_leaves_neighbours_intact() {
        let mut buf = [0xFFu8; 2];
        write_bits(&mut buf, 4, 6, 0);
        assert_eq!(buf, [0x0F, 0xFC]);
    }

    #[test]
    fn unaligned_copy_round_trips() {
        let src = [0xA5u8, 0x3C, 0x7E];
        let mut dst = [0u8; 4];
        copy_bits_in(&mut dst, 5, &src, 24);
        let mut back = [0u8; 3];
        copy_bits_out(&dst, 5, 24, &mut back);
        assert_eq!(back, src);
    }
}
