// Bit 0 is the most significant bit of byte 0, matching the remote store.
// Reads past the end of the slice see zeros; writers must grow the slice
// first (see `bytes_for`).

/// Number of bytes needed to address `bit_width` bits starting at `bit_offset`.
#[inline]
pub fn bytes_for(bit_offset: u64, bit_width: u64) -> usize {
    (bit_offset + bit_width).div_ceil(8) as usize
}

#[inline]
pub fn get_bit(slice: &[u8], pos: u64) -> bool {
    let byte = (pos / 8) as usize;
    let shift = 7 - (pos % 8);
    slice.get(byte).is_some_and(|b| (b >> shift) & 1 == 1)
}

/// Sets one bit and returns its previous state.
#[inline]
pub fn set_bit(slice: &mut [u8], pos: u64, on: bool) -> bool {
    let byte = (pos / 8) as usize;
    let mask = 1u8 << (7 - (pos % 8));
    let old = slice[byte] & mask != 0;
    if on {
        slice[byte] |= mask;
    } else {
        slice[byte] &= !mask;
    }
    old
}

// slow but hopefully correct version
pub fn set_bits(slice: &mut [u8], bit_offset: u64, bit_width: u32, value: u64) {
    for i in 0..bit_width as u64 {
        let bit = (value >> (bit_width as u64 - 1 - i)) & 1;
        set_bit(slice, bit_offset + i, bit == 1);
    }
}

pub fn get_bits(slice: &[u8], bit_offset: u64, bit_width: u32) -> u64 {
    let mut value = 0u64;
    for i in 0..bit_width as u64 {
        value = (value << 1) | get_bit(slice, bit_offset + i) as u64;
    }
    value
}

/// Population count of the inclusive bit range `[first, last]`.
pub fn count_ones(slice: &[u8], first: u64, last: u64) -> u64 {
    (first..=last).filter(|&pos| get_bit(slice, pos)).count() as u64
}
