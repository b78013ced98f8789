//! Size-class codec.
//!
//! Sizes are mapped onto 256 bins following a tiny floating point format: a 3-bit mantissa and an
//! exponent in the remaining bits. Every bin covers the same *relative* size range, so the
//! overhead of rounding an allocation up to its bin stays around 12.5% whatever its absolute
//! size. Values below [`MANTISSA_VALUE`] are "denormals" and map onto themselves.

pub const MANTISSA_BITS: u32 = 3;
pub const MANTISSA_VALUE: u32 = 1 << MANTISSA_BITS;
pub const MANTISSA_MASK: u32 = MANTISSA_VALUE - 1;

/// Returns the bin index of the smallest bin whose size is at least `size`.
///
/// Used when searching for free storage: any block stored in the returned bin (or a bigger one)
/// can hold `size` units. Mantissa overflow carries into the exponent.
pub fn uint_to_float_round_up(size: u32) -> u32 {
    let mut exp = 0;
    let mut mantissa;

    if size < MANTISSA_VALUE {
        mantissa = size;
    } else {
        let highest_set_bit = 31 - size.leading_zeros();
        let mantissa_start_bit = highest_set_bit - MANTISSA_BITS;
        exp = mantissa_start_bit + 1;
        mantissa = (size >> mantissa_start_bit) & MANTISSA_MASK;

        let low_bits_mask = (1 << mantissa_start_bit) - 1;
        if size & low_bits_mask != 0 {
            mantissa += 1;
        }
    }

    // `+` instead of `|` so that a mantissa of 8 bumps the exponent.
    (exp << MANTISSA_BITS) + mantissa
}

/// Returns the bin index of the biggest bin whose size is at most `size`.
///
/// Used when classifying free storage: the bin never claims more than the block really holds.
pub fn uint_to_float_round_down(size: u32) -> u32 {
    let mut exp = 0;
    let mantissa;

    if size < MANTISSA_VALUE {
        mantissa = size;
    } else {
        let highest_set_bit = 31 - size.leading_zeros();
        let mantissa_start_bit = highest_set_bit - MANTISSA_BITS;
        exp = mantissa_start_bit + 1;
        mantissa = (size >> mantissa_start_bit) & MANTISSA_MASK;
    }

    (exp << MANTISSA_BITS) | mantissa
}

/// Decodes a bin index back into the size it represents.
pub fn float_to_uint(float_value: u32) -> u32 {
    let exponent = float_value >> MANTISSA_BITS;
    let mantissa = float_value & MANTISSA_MASK;
    if exponent == 0 {
        mantissa
    } else {
        // Restore the hidden leading bit.
        (mantissa | MANTISSA_VALUE) << (exponent - 1)
    }
}

/// Returns the index of the lowest set bit in `bit_mask` at or above `start_bit_index`, or
/// `None` if there is none.
pub fn find_lowest_set_bit_after(bit_mask: u32, start_bit_index: u32) -> Option<u32> {
    let mask_before_start_index = 1u32
        .checked_shl(start_bit_index)
        .map_or(u32::MAX, |bit| bit - 1);
    let bits_after = bit_mask & !mask_before_start_index;
    if bits_after == 0 {
        None
    } else {
        Some(bits_after.trailing_zeros())
    }
}
