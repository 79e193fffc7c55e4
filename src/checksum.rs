//! Checksums and big-endian field access.
//!
//! Every AFFS record stores its integers big-endian. All conversions between
//! host values and on-disk bytes go through the helpers here, so record
//! codecs never touch host byte order directly.

use crate::constants::{BLOCK_SIZE, BOOT_BLOCK_SIZE};

#[cfg(feature = "simd")]
use bytemuck::try_cast_slice;
#[cfg(feature = "simd")]
use wide::u32x4;

/// Calculate the normal checksum for a block.
///
/// The returned value, stored at `checksum_offset`, makes the sum of all
/// longwords in the block equal zero.
#[inline]
pub fn normal_sum(buf: &[u8; BLOCK_SIZE], checksum_offset: usize) -> u32 {
    normal_sum_slice(buf, checksum_offset)
}

/// Calculate the normal checksum over an arbitrary run of longwords.
///
/// Used for RDB records whose checksummed length comes from their size field.
#[inline]
pub fn normal_sum_slice(buf: &[u8], checksum_offset: usize) -> u32 {
    debug_assert!(
        buf.len().is_multiple_of(4),
        "Buffer length must be divisible by 4"
    );
    debug_assert!(
        checksum_offset.is_multiple_of(4),
        "Checksum offset must be aligned to 4 bytes"
    );

    #[cfg(feature = "simd")]
    {
        normal_sum_slice_simd(buf, checksum_offset)
    }

    #[cfg(not(feature = "simd"))]
    {
        normal_sum_slice_scalar(buf, checksum_offset)
    }
}

#[inline]
fn normal_sum_slice_scalar(buf: &[u8], checksum_offset: usize) -> u32 {
    let skip = checksum_offset / 4;
    let sum = buf
        .chunks_exact(4)
        .enumerate()
        .filter(|&(i, _)| i != skip)
        .fold(0u32, |sum, (_, w)| {
            sum.wrapping_add(u32::from_be_bytes([w[0], w[1], w[2], w[3]]))
        });
    (sum as i32).wrapping_neg() as u32
}

/// Four-lane accumulation when the buffer happens to be u32-aligned.
#[cfg(feature = "simd")]
#[inline]
fn normal_sum_slice_simd(buf: &[u8], checksum_offset: usize) -> u32 {
    let Ok(words) = try_cast_slice::<u8, u32>(buf) else {
        return normal_sum_slice_scalar(buf, checksum_offset);
    };
    let skip = checksum_offset / 4;

    let mut acc = u32x4::ZERO;
    let mut chunks = words.chunks_exact(4);
    for (n, chunk) in (&mut chunks).enumerate() {
        let base = n * 4;
        let lane = |i: usize| {
            if base + i == skip {
                0
            } else {
                u32::from_be(chunk[i])
            }
        };
        acc += u32x4::new([lane(0), lane(1), lane(2), lane(3)]);
    }

    let tail = chunks.remainder();
    let tail_base = words.len() - tail.len();
    let mut sum = acc
        .to_array()
        .iter()
        .fold(0u32, |s, &w| s.wrapping_add(w));
    for (i, &w) in tail.iter().enumerate() {
        if tail_base + i != skip {
            sum = sum.wrapping_add(u32::from_be(w));
        }
    }
    (sum as i32).wrapping_neg() as u32
}

/// Calculate the boot block checksum (carry-wrapping add, then complement).
#[inline]
pub fn boot_sum(buf: &[u8; BOOT_BLOCK_SIZE]) -> u32 {
    let sum = buf
        .chunks_exact(4)
        .enumerate()
        .filter(|&(i, _)| i != 1)
        .fold(0u32, |sum, (_, w)| {
            let d = u32::from_be_bytes([w[0], w[1], w[2], w[3]]);
            let (next, carry) = sum.overflowing_add(d);
            next.wrapping_add(carry as u32)
        });
    !sum
}

/// Calculate the bitmap block checksum (normal sum stored at offset 0).
#[inline]
pub fn bitmap_sum(buf: &[u8; BLOCK_SIZE]) -> u32 {
    normal_sum(buf, 0)
}

/// Store the normal checksum of `buf` at `checksum_offset`.
#[inline]
pub fn set_normal_sum(buf: &mut [u8], checksum_offset: usize) {
    let sum = normal_sum_slice(buf, checksum_offset);
    write_u32_be(buf, checksum_offset, sum);
    debug_assert!(sums_to_zero(buf), "sealed block must checksum to zero");
}

/// Check that the stored checksum at `checksum_offset` matches the contents.
#[inline]
pub fn verify_normal_sum(buf: &[u8], checksum_offset: usize) -> bool {
    read_u32_be(buf, checksum_offset) == normal_sum_slice(buf, checksum_offset)
}

/// Returns true if the wrapping sum of every longword is zero.
#[inline]
pub fn sums_to_zero(buf: &[u8]) -> bool {
    buf.chunks_exact(4)
        .fold(0u32, |s, w| {
            s.wrapping_add(u32::from_be_bytes([w[0], w[1], w[2], w[3]]))
        })
        == 0
}

/// Read a big-endian u32.
#[inline]
pub const fn read_u32_be(buf: &[u8], offset: usize) -> u32 {
    u32::from_be_bytes([
        buf[offset],
        buf[offset + 1],
        buf[offset + 2],
        buf[offset + 3],
    ])
}

/// Read a big-endian i32.
#[inline]
pub const fn read_i32_be(buf: &[u8], offset: usize) -> i32 {
    read_u32_be(buf, offset) as i32
}

/// Read a big-endian u16.
#[inline]
pub const fn read_u16_be(buf: &[u8], offset: usize) -> u16 {
    u16::from_be_bytes([buf[offset], buf[offset + 1]])
}

/// Write a big-endian u32.
#[inline]
pub fn write_u32_be(buf: &mut [u8], offset: usize, value: u32) {
    buf[offset..offset + 4].copy_from_slice(&value.to_be_bytes());
}

/// Write a big-endian i32.
#[inline]
pub fn write_i32_be(buf: &mut [u8], offset: usize, value: i32) {
    buf[offset..offset + 4].copy_from_slice(&value.to_be_bytes());
}

/// Write a big-endian u16.
#[inline]
pub fn write_u16_be(buf: &mut [u8], offset: usize, value: u16) {
    buf[offset..offset + 2].copy_from_slice(&value.to_be_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_write_u32_be() {
        let mut buf = [0u8; BLOCK_SIZE];
        write_u32_be(&mut buf, 0, 0x12345678);
        assert_eq!(buf[..4], [0x12, 0x34, 0x56, 0x78]);
        assert_eq!(read_u32_be(&buf, 0), 0x12345678);
    }

    #[test]
    fn test_read_i32_be() {
        let mut buf = [0u8; BLOCK_SIZE];
        write_i32_be(&mut buf, 8, -3);
        assert_eq!(buf[8..12], [0xFF, 0xFF, 0xFF, 0xFD]);
        assert_eq!(read_i32_be(&buf, 8), -3);
    }

    #[test]
    fn test_set_normal_sum_zeroes_block() {
        let mut buf = [0u8; BLOCK_SIZE];
        for (i, b) in buf.iter_mut().enumerate() {
            *b = (i * 31 % 251) as u8;
        }
        set_normal_sum(&mut buf, 20);
        assert!(sums_to_zero(&buf));
        assert!(verify_normal_sum(&buf, 20));

        buf[100] ^= 0x40;
        assert!(!verify_normal_sum(&buf, 20));
    }

    #[test]
    fn test_bitmap_sum_matches_offset_zero() {
        let mut buf = [0xFFu8; BLOCK_SIZE];
        let sum = bitmap_sum(&buf);
        write_u32_be(&mut buf, 0, sum);
        assert!(sums_to_zero(&buf));
    }

    #[test]
    fn test_normal_sum_slice_partial_length() {
        let mut buf = [0u8; 256];
        buf[0..4].copy_from_slice(b"RDSK");
        write_u32_be(&mut buf, 4, 64);
        set_normal_sum(&mut buf, 8);
        assert!(sums_to_zero(&buf));
    }

    #[test]
    fn test_boot_sum_with_carry() {
        let mut buf = [0u8; BOOT_BLOCK_SIZE];
        buf[..4].copy_from_slice(b"DOS\x01");
        write_u32_be(&mut buf, 8, 880);
        write_u32_be(&mut buf, 12, 0xFFFF_FFFF);
        write_u32_be(&mut buf, 16, 0x0000_0002);
        let sum = boot_sum(&buf);
        // Adding the stored sum back in with end-around carry yields all ones.
        let mut total: u32 = 0;
        for (i, w) in buf.chunks_exact(4).enumerate() {
            let d = if i == 1 {
                sum
            } else {
                u32::from_be_bytes([w[0], w[1], w[2], w[3]])
            };
            let (next, carry) = total.overflowing_add(d);
            total = next.wrapping_add(carry as u32);
        }
        assert_eq!(total, 0xFFFF_FFFF);
    }
}
