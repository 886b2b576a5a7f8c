//! Geodetic utilities: longitude normalisation and GPS-heading-to-math-angle
//! conversion. `lat_lon_to_enu` is assumed to run upstream of this crate —
//! callers hand the core already-converted ENU metres (see `pose::pose_from_gps`).

use crate::angle::Angle32;
use crate::fixed::Fixed;

const DEG_180: Fixed = Fixed(180 << 16);
const DEG_360: Fixed = Fixed(360 << 16);
const DEG_90: Fixed = Fixed(90 << 16);

/// Folds `lon` into `[-180, 180]` degrees by repeated +-360 degree
/// addition. Idempotent: `normalize_lon(normalize_lon(x)) == normalize_lon(x)`.
/// Exactly `180` is a fixed point of this operation, not renormalised to
/// `-180`.
pub fn normalize_lon(mut lon: Fixed) -> Fixed {
    while lon > DEG_180 {
        lon = lon - DEG_360;
    }
    while lon < -DEG_180 {
        lon = lon + DEG_360;
    }
    lon
}

/// Converts a GPS compass heading (0 = north, clockwise) into the internal
/// math-frame angle (0 = east, counter-clockwise), applying the +90 degree
/// frame correction and wrapping into `[0, 360)` before scaling to the
/// full-circle `Angle32` domain via a 64-bit intermediate.
pub fn heading_to_angle(heading_deg: Fixed) -> Angle32 {
    let mut corrected = heading_deg + DEG_90;
    while corrected >= DEG_360 {
        corrected = corrected - DEG_360;
    }
    while corrected < Fixed::ZERO {
        corrected = corrected + DEG_360;
    }

    let numerator = (corrected.0 as i64) << 32;
    let angle = (numerator / DEG_360.0 as i64) as u32;
    Angle32(angle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_identity_in_range() {
        let x = Fixed::from_int(45);
        assert_eq!(normalize_lon(x), x);
    }

    #[test]
    fn normalize_wraps_past_180() {
        let x = Fixed::from_int(190);
        assert_eq!(normalize_lon(x), Fixed::from_int(-170));
    }

    #[test]
    fn normalize_wraps_past_negative_180() {
        let x = Fixed::from_int(-190);
        assert_eq!(normalize_lon(x), Fixed::from_int(170));
    }

    #[test]
    fn normalize_is_idempotent() {
        let x = Fixed::from_int(540);
        let once = normalize_lon(x);
        assert_eq!(normalize_lon(once), once);
    }

    #[test]
    fn heading_zero_is_east_quarter_turn() {
        // GPS heading 0 (north) must map to the math-frame angle for 90 degrees (east-origin).
        let angle = heading_to_angle(Fixed::ZERO);
        let expected = Angle32(1u32 << 30); // 90deg = 0x4000_0000
        let diff = angle.0.wrapping_sub(expected.0) as i32;
        assert!(diff.unsigned_abs() < 4096);
    }

    #[test]
    fn heading_360_matches_heading_0() {
        let a = heading_to_angle(Fixed::ZERO);
        let b = heading_to_angle(Fixed::from_int(360));
        let diff = a.0.wrapping_sub(b.0) as i32;
        assert!(diff.unsigned_abs() < 4096);
    }
}
