//! 32-bit angle representation and the sine/cosine lookup table.
//!
//! `Angle32` treats the full circle as `2^32` units, so wraparound is free
//! (ordinary `u32` wrapping add/sub). The sine table itself is generated at
//! build time by `build.rs` into `OUT_DIR/sine_table.rs`.

use crate::fixed::Fixed;

include!(concat!(env!("OUT_DIR"), "/sine_table.rs"));

const ANGLE_BITS: u32 = 13;
const NUM_FINE_ANGLES: u32 = 1 << ANGLE_BITS;
const ANGLE_MASK: u32 = NUM_FINE_ANGLES - 1;
const QUARTER_TURN: u32 = 0x4000_0000;

/// A full-circle angle, `0` = 0 degrees, wrapping at `2^32`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(transparent)]
pub struct Angle32(pub u32);

impl Angle32 {
    pub const ZERO: Angle32 = Angle32(0);

    pub const fn from_raw(raw: u32) -> Angle32 {
        Angle32(raw)
    }

    fn table_index(self) -> usize {
        ((self.0 >> (32 - ANGLE_BITS)) & ANGLE_MASK) as usize
    }
}

fn table_entry(index: usize) -> Fixed {
    Fixed(SINE_TABLE[index & ANGLE_MASK as usize])
}

/// `sin(angle)` via direct table lookup, ~0.044 degree resolution.
pub fn sin_of(angle: Angle32) -> Fixed {
    table_entry(angle.table_index())
}

/// `cos(angle) = sin(angle + 90deg)`, using the same table.
pub fn cos_of(angle: Angle32) -> Fixed {
    sin_of(Angle32(angle.0.wrapping_add(QUARTER_TURN)))
}

/// Linearly interpolated `sin(angle)`, using the next 16 bits of `angle`
/// past the table index as a Q16 fraction between adjacent entries.
pub fn sin_of_interp(angle: Angle32) -> Fixed {
    let shifted = angle.0 >> (32 - ANGLE_BITS);
    let index_low = (shifted & ANGLE_MASK) as usize;
    let index_high = (index_low + 1) & ANGLE_MASK as usize;

    let frac_bits = (angle.0 >> (32 - ANGLE_BITS - 16)) & 0xFFFF;
    let frac = Fixed(frac_bits as i32);

    let low = table_entry(index_low);
    let high = table_entry(index_high);
    let delta = high - low;

    low + frac.mul(delta)
}

/// Linearly interpolated `cos(angle)`, by shifting a quarter turn and
/// delegating to [`sin_of_interp`].
pub fn cos_of_interp(angle: Angle32) -> Fixed {
    sin_of_interp(Angle32(angle.0.wrapping_add(QUARTER_TURN)))
}

/// `|sin(a)^2 + cos(a)^2 - 1|` for a single angle, in Q16.16. Should be
/// ~0; the table's resolution and fixed-point rounding bound how close.
pub fn verify_pythagorean_identity(angle: Angle32) -> Fixed {
    let s = sin_of(angle);
    let c = cos_of(angle);
    let sum = s.mul(s) + c.mul(c);
    (sum - Fixed::ONE).abs()
}

/// Maximum `|sin(a)^2 + cos(a)^2 - 1|` across every table entry, in
/// Q16.16. Useful for validating the shipped LUT after flashing a new
/// build, or after regenerating the table with a different resolution.
pub fn max_pythagorean_error() -> Fixed {
    let mut max_error = Fixed::ZERO;
    for i in 0..NUM_FINE_ANGLES {
        let angle = Angle32(i << (32 - ANGLE_BITS));
        let error = verify_pythagorean_identity(angle);
        if error > max_error {
            max_error = error;
        }
    }
    max_error
}

/// Raw table entries, exposed for host-side inspection/testing.
pub fn sine_table_len() -> usize {
    SINE_TABLE.len()
}

/// A simple additive checksum of the shipped sine table, for callers that
/// want to verify the table burned into a flashed image matches the one
/// this crate was built with, without comparing the whole array.
pub fn table_checksum() -> u32 {
    SINE_TABLE.iter().fold(0u32, |acc, &v| acc.wrapping_add(v as u32))
}
