//! Rigid-body pose algebra: 3x3 rotation matrices in the ENU frame and the
//! wire-normative `Pose` record (56 bytes, byte-exact layout).

use crate::angle::{cos_of, sin_of, Angle32};
use crate::fixed::Fixed;
use crate::geo::heading_to_angle;

/// A row-major 3x3 rotation matrix in Q16.16.
pub type Rotation3 = [Fixed; 9];

/// `diag(1, 1, 1)`.
pub fn rotation_identity() -> Rotation3 {
    let mut r = [Fixed::ZERO; 9];
    r[0] = Fixed::ONE;
    r[4] = Fixed::ONE;
    r[8] = Fixed::ONE;
    r
}

/// Embeds a 2D yaw rotation (about the Up axis) into a 3x3 matrix, using
/// the sine/cosine LUTs.
pub fn rotation_from_yaw(yaw: Angle32) -> Rotation3 {
    let c = cos_of(yaw);
    let s = sin_of(yaw);
    [
        c, -s, Fixed::ZERO,
        s, c, Fixed::ZERO,
        Fixed::ZERO, Fixed::ZERO, Fixed::ONE,
    ]
}

/// `C = A * B`. `C` may alias `A` or `B`; a temporary absorbs the product
/// before it is copied into the output.
pub fn rotation_mul(a: &Rotation3, b: &Rotation3) -> Rotation3 {
    let mut out = [Fixed::ZERO; 9];
    for i in 0..3 {
        for j in 0..3 {
            let mut sum: i64 = 0;
            for k in 0..3 {
                sum += a[i * 3 + k].0 as i64 * b[k * 3 + j].0 as i64;
            }
            out[i * 3 + j] = Fixed((sum >> 16) as i32);
        }
    }
    out
}

/// `R[0] + R[4] + R[8]`.
pub fn rotation_trace(r: &Rotation3) -> Fixed {
    r[0] + r[4] + r[8]
}

pub fn vec3_sub(a: [Fixed; 3], b: [Fixed; 3]) -> [Fixed; 3] {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

pub fn vec3_norm_squared(v: [Fixed; 3]) -> Fixed {
    v[0].mul(v[0]) + v[1].mul(v[1]) + v[2].mul(v[2])
}

fn vec3_dot(a: [Fixed; 3], b: [Fixed; 3]) -> Fixed {
    a[0].mul(b[0]) + a[1].mul(b[1]) + a[2].mul(b[2])
}

fn vec3_scale(v: [Fixed; 3], s: Fixed) -> [Fixed; 3] {
    [v[0].mul(s), v[1].mul(s), v[2].mul(s)]
}

fn vec3_cross(a: [Fixed; 3], b: [Fixed; 3]) -> [Fixed; 3] {
    [
        a[1].mul(b[2]) - a[2].mul(b[1]),
        a[2].mul(b[0]) - a[0].mul(b[2]),
        a[0].mul(b[1]) - a[1].mul(b[0]),
    ]
}

fn vec3_normalize(v: [Fixed; 3]) -> [Fixed; 3] {
    let norm = vec3_norm_squared(v).sqrt();
    if norm == Fixed::ZERO {
        return v;
    }
    vec3_scale(v, Fixed::ONE.div(norm))
}

/// Re-orthonormalises a rotation matrix that has drifted from `R^T R = I`
/// after repeated `rotation_mul` chains, via row-wise Gram-Schmidt: the
/// first row is normalised, the second is projected off it and normalised,
/// and the third is recomputed as their cross product so the result stays
/// a right-handed rotation rather than merely an orthogonal matrix.
///
/// Not called automatically by [`rotation_mul`] — callers who chain many
/// compositions decide when drift (tracked via [`rotation_trace`] moving
/// outside `[-1, 3]`) warrants the cost of calling this.
pub fn orthonormalize(r: &Rotation3) -> Rotation3 {
    let row0 = [r[0], r[1], r[2]];
    let row1 = [r[3], r[4], r[5]];

    let n0 = vec3_normalize(row0);
    let proj = vec3_dot(row1, n0);
    let row1_ortho = vec3_sub(row1, vec3_scale(n0, proj));
    let n1 = vec3_normalize(row1_ortho);
    let n2 = vec3_cross(n0, n1);

    [
        n0[0], n0[1], n0[2],
        n1[0], n1[1], n1[2],
        n2[0], n2[1], n2[2],
    ]
}

pub fn mat3_mul_vec3(r: &Rotation3, v: [Fixed; 3]) -> [Fixed; 3] {
    let mut out = [Fixed::ZERO; 3];
    for i in 0..3 {
        let mut sum: i64 = 0;
        for j in 0..3 {
            sum += r[i * 3 + j].0 as i64 * v[j].0 as i64;
        }
        out[i] = Fixed((sum >> 16) as i32);
    }
    out
}

/// Number of bytes a serialised [`Pose`] occupies on the wire.
pub const POSE_WIRE_SIZE: usize = 56;

/// A rigid-body placement: rotation, ENU translation, and vessel metadata.
///
/// Wire layout (little-endian, 56 bytes total): 9 `Fixed` rotation entries
/// (36 bytes), 3 `Fixed` translation entries (12 bytes), `u32` timestamp
/// (4 bytes), `u32` MMSI (4 bytes). Fields are emitted explicitly rather
/// than relying on compiler struct layout, so the byte offsets hold
/// regardless of target or compiler version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pose {
    pub rotation: Rotation3,
    pub translation: [Fixed; 3],
    pub timestamp: u32,
    pub mmsi: u32,
}

impl Default for Pose {
    fn default() -> Pose {
        Pose {
            rotation: rotation_identity(),
            translation: [Fixed::ZERO; 3],
            timestamp: 0,
            mmsi: 0,
        }
    }
}

impl Pose {
    /// Builds a pose from already-ENU-converted metres, a GPS heading, and
    /// vessel metadata.
    pub fn from_gps(
        east: Fixed,
        north: Fixed,
        up: Fixed,
        heading_deg: Fixed,
        timestamp: u32,
        mmsi: u32,
    ) -> Pose {
        let angle = heading_to_angle(heading_deg);
        Pose {
            rotation: rotation_from_yaw(angle),
            translation: [east, north, up],
            timestamp,
            mmsi,
        }
    }

    /// Emits the 56-byte wire representation into `buf[0..56]`.
    pub fn write_to(&self, buf: &mut [u8]) {
        debug_assert!(buf.len() >= POSE_WIRE_SIZE);
        let mut offset = 0;
        for r in self.rotation.iter() {
            buf[offset..offset + 4].copy_from_slice(&r.0.to_le_bytes());
            offset += 4;
        }
        for t in self.translation.iter() {
            buf[offset..offset + 4].copy_from_slice(&t.0.to_le_bytes());
            offset += 4;
        }
        buf[offset..offset + 4].copy_from_slice(&self.timestamp.to_le_bytes());
        offset += 4;
        buf[offset..offset + 4].copy_from_slice(&self.mmsi.to_le_bytes());
    }

    /// Parses a pose from `buf[0..56]`.
    pub fn read_from(buf: &[u8]) -> Pose {
        debug_assert!(buf.len() >= POSE_WIRE_SIZE);
        let mut rotation = [Fixed::ZERO; 9];
        let mut offset = 0;
        for r in rotation.iter_mut() {
            *r = Fixed(i32::from_le_bytes(buf[offset..offset + 4].try_into().unwrap()));
            offset += 4;
        }
        let mut translation = [Fixed::ZERO; 3];
        for t in translation.iter_mut() {
            *t = Fixed(i32::from_le_bytes(buf[offset..offset + 4].try_into().unwrap()));
            offset += 4;
        }
        let timestamp = u32::from_le_bytes(buf[offset..offset + 4].try_into().unwrap());
        offset += 4;
        let mmsi = u32::from_le_bytes(buf[offset..offset + 4].try_into().unwrap());
        Pose { rotation, translation, timestamp, mmsi }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_trace_is_three() {
        let r = rotation_identity();
        assert_eq!(rotation_trace(&r), Fixed::from_int(3));
    }

    #[test]
    fn yaw_zero_is_identity() {
        let r = rotation_from_yaw(Angle32::ZERO);
        assert_eq!(r[0], Fixed::ONE);
        assert_eq!(r[4], Fixed::ONE);
        assert_eq!(r[8], Fixed::ONE);
    }

    #[test]
    fn rotation_mul_with_identity_is_noop() {
        let r = rotation_from_yaw(Angle32(1 << 29));
        let id = rotation_identity();
        let product = rotation_mul(&r, &id);
        for i in 0..9 {
            assert!((product[i] - r[i]).abs() <= Fixed(4));
        }
    }

    #[test]
    fn mat3_mul_vec3_identity() {
        let id = rotation_identity();
        let v = [Fixed::from_int(3), Fixed::from_int(-5), Fixed::from_int(7)];
        assert_eq!(mat3_mul_vec3(&id, v), v);
    }

    #[test]
    fn vec3_norm_squared_pythagoras() {
        let v = [Fixed::from_int(3), Fixed::from_int(4), Fixed::ZERO];
        assert_eq!(vec3_norm_squared(v), Fixed::from_int(25));
    }

    #[test]
    fn pose_roundtrip_byte_exact() {
        let pose = Pose::from_gps(
            Fixed::from_int(100),
            Fixed::from_int(-200),
            Fixed::ZERO,
            Fixed::from_int(45),
            1_700_000_000,
            367_123_456,
        );
        let mut buf = [0u8; POSE_WIRE_SIZE];
        pose.write_to(&mut buf);
        let parsed = Pose::read_from(&buf);
        assert_eq!(parsed, pose);
    }

    #[test]
    fn pose_wire_size_is_56() {
        assert_eq!(POSE_WIRE_SIZE, 56);
    }

    #[test]
    fn orthonormalize_identity_is_noop() {
        let r = rotation_identity();
        let o = orthonormalize(&r);
        for i in 0..9 {
            assert!((o[i] - r[i]).abs() <= Fixed(2));
        }
    }

    #[test]
    fn orthonormalize_restores_drifted_rotation() {
        let mut r = rotation_from_yaw(Angle32(1 << 28));
        for _ in 0..50 {
            r = rotation_mul(&r, &rotation_from_yaw(Angle32(1 << 28)));
        }
        let drifted_trace = rotation_trace(&r);
        let o = orthonormalize(&r);
        let restored_trace = rotation_trace(&o);
        // Orthonormalisation should not move a matrix that is already
        // close to orthonormal much further from it than it already was.
        assert!((restored_trace - drifted_trace).abs() <= Fixed::from_int(1));
    }
}
