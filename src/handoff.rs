//! Cell-to-cell handoff protocol: transition detection, the 100-byte
//! wire-normative packet, and the per-vessel state machine.

use bitflags::bitflags;

use crate::error::TbspError;
use crate::fixed::Fixed;
use crate::geo::normalize_lon;
use crate::pose::{vec3_sub, Pose, POSE_WIRE_SIZE};
use crate::tbsp::CELL_SIZE_KM;
use crate::Result;

bitflags! {
    /// Bits 2-7 are reserved and must be zero.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct HandoffFlags: u8 {
        /// Set iff a dateline crossing is detected between the two points.
        const DATELINE = 1 << 0;
        /// Set iff either endpoint's latitude magnitude exceeds the polar
        /// threshold.
        const POLAR = 1 << 1;
    }
}

/// Latitude magnitude, in degrees, above which a point is considered
/// "polar" for handoff-flag purposes.
pub const POLAR_THRESHOLD_DEG: Fixed = Fixed(80 << 16);
/// Longitude delta magnitude, in degrees, above which a step is considered
/// a dateline crossing.
pub const DATELINE_THRESHOLD_DEG: Fixed = Fixed(180 << 16);

/// Number of bytes a serialised [`HandoffPacket`] occupies on the wire.
pub const HANDOFF_WIRE_SIZE: usize = 100;

/// A cell-to-cell vessel transition, ready for broadcast to peer edge
/// nodes. Wire layout (little-endian): MMSI (4), last pose (56), old cell
/// ID (2), new cell ID (2), flags (1), 3 zero padding bytes, signature
/// (32) — 100 bytes total.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandoffPacket {
    pub mmsi: u32,
    pub last_pose: Pose,
    pub old_cell_id: u16,
    pub new_cell_id: u16,
    pub flags: HandoffFlags,
    pub signature: [u8; 32],
}

impl HandoffPacket {
    /// Builds a packet for a transition. The signature field is zeroed —
    /// an external signer fills it in-place before broadcast.
    pub fn new(
        mmsi: u32,
        last_pose: Pose,
        old_cell_id: u16,
        new_cell_id: u16,
        flags: HandoffFlags,
    ) -> HandoffPacket {
        HandoffPacket {
            mmsi,
            last_pose,
            old_cell_id,
            new_cell_id,
            flags,
            signature: [0u8; 32],
        }
    }

    /// Emits the 100-byte wire representation into `buf[0..100]`. The
    /// translation stores ENU metres, not degrees, so no longitude
    /// normalisation is applied here.
    pub fn write_to(&self, buf: &mut [u8]) {
        debug_assert!(buf.len() >= HANDOFF_WIRE_SIZE);
        buf[0..4].copy_from_slice(&self.mmsi.to_le_bytes());
        self.last_pose.write_to(&mut buf[4..4 + POSE_WIRE_SIZE]);
        let mut offset = 4 + POSE_WIRE_SIZE;
        buf[offset..offset + 2].copy_from_slice(&self.old_cell_id.to_le_bytes());
        offset += 2;
        buf[offset..offset + 2].copy_from_slice(&self.new_cell_id.to_le_bytes());
        offset += 2;
        buf[offset] = self.flags.bits();
        offset += 1;
        buf[offset..offset + 3].copy_from_slice(&[0u8; 3]);
        offset += 3;
        buf[offset..offset + 32].copy_from_slice(&self.signature);
    }

    /// Parses a packet from `buf[0..100]`. Unlike [`HandoffPacket::write_to`],
    /// this performs no validation beyond field extraction — call
    /// [`validate`] on the result.
    pub fn read_from(buf: &[u8]) -> HandoffPacket {
        debug_assert!(buf.len() >= HANDOFF_WIRE_SIZE);
        let mmsi = u32::from_le_bytes(buf[0..4].try_into().unwrap());
        let last_pose = Pose::read_from(&buf[4..4 + POSE_WIRE_SIZE]);
        let mut offset = 4 + POSE_WIRE_SIZE;
        let old_cell_id = u16::from_le_bytes(buf[offset..offset + 2].try_into().unwrap());
        offset += 2;
        let new_cell_id = u16::from_le_bytes(buf[offset..offset + 2].try_into().unwrap());
        offset += 2;
        let flags = HandoffFlags::from_bits_truncate(buf[offset]);
        offset += 1 + 3; // flags byte, then 3 padding bytes
        let mut signature = [0u8; 32];
        signature.copy_from_slice(&buf[offset..offset + 32]);

        HandoffPacket {
            mmsi,
            last_pose,
            old_cell_id,
            new_cell_id,
            flags,
            signature,
        }
    }

    /// Deserialises `buf` and validates the result in one step. Returns
    /// [`TbspError::PacketInvalid`] if the MMSI field is zero — the one
    /// check specified for deserialisation itself, distinct from the
    /// fuller [`validate`] check used on receipt.
    pub fn deserialize(buf: &[u8]) -> Result<HandoffPacket> {
        let pkt = HandoffPacket::read_from(buf);
        if pkt.mmsi == 0 {
            return Err(TbspError::PacketInvalid);
        }
        Ok(pkt)
    }
}

/// A packet is accepted iff: MMSI is non-zero; the source and destination
/// cells differ; and, when `current_time` is at or after the pose's
/// timestamp, the pose's age does not exceed 86,400 seconds. A pose
/// timestamped ahead of the receiver's clock is not rejected on that
/// basis — clock skew in that direction is tolerated. Every rejection path
/// returns [`TbspError::PacketInvalid`].
pub fn validate(pkt: &HandoffPacket, current_time: u32) -> Result<()> {
    if pkt.mmsi == 0 {
        #[cfg(feature = "std")]
        log::warn!("handoff packet rejected: zero mmsi");
        return Err(TbspError::PacketInvalid);
    }
    if pkt.old_cell_id == pkt.new_cell_id {
        #[cfg(feature = "std")]
        log::warn!("handoff packet for mmsi {} rejected: old and new cell ids both {:#06x}", pkt.mmsi, pkt.old_cell_id);
        return Err(TbspError::PacketInvalid);
    }
    if current_time >= pkt.last_pose.timestamp {
        let age = current_time - pkt.last_pose.timestamp;
        if age > 86_400 {
            #[cfg(feature = "std")]
            log::warn!("handoff packet for mmsi {} rejected: pose age {}s exceeds 86400s", pkt.mmsi, age);
            return Err(TbspError::PacketInvalid);
        }
    }
    Ok(())
}

/// ENU metres, converted from Q16.16 without going through `Fixed::mul` —
/// translation deltas are large enough (thousands of metres) that squaring
/// them in Q16.16 would overflow the representable range. This is the one
/// place in the core where floating point is used; the comparison
/// tolerance here greatly exceeds the rounding noise it introduces.
fn metres(v: Fixed) -> f32 {
    v.0 as f32 / 65536.0
}

/// True if the ENU metric distance between `prev` and `curr` exceeds the
/// cell edge length. `None` inputs yield `false`.
pub fn should_trigger(prev: Option<&Pose>, curr: Option<&Pose>) -> bool {
    let (Some(prev), Some(curr)) = (prev, curr) else {
        return false;
    };

    let delta = vec3_sub(curr.translation, prev.translation);
    let dx = metres(delta[0]);
    let dy = metres(delta[1]);
    let dz = metres(delta[2]);
    let dist_sq_m = dx * dx + dy * dy + dz * dz;

    let threshold_m = CELL_SIZE_KM as f32 * 1000.0;
    dist_sq_m > threshold_m * threshold_m
}

/// True if the raw (non-renormalised) longitude delta between two
/// pre-normalised longitudes exceeds 180 degrees in magnitude — the
/// unambiguous indicator of an anti-meridian crossing, since any
/// non-crossing step between two points in `[-180, 180)` has a raw delta
/// of at most 180 degrees.
pub fn detect_dateline_cross(lon1: Fixed, lon2: Fixed) -> bool {
    let lon1 = normalize_lon(lon1);
    let lon2 = normalize_lon(lon2);
    let raw_delta = lon2 - lon1;
    raw_delta > DATELINE_THRESHOLD_DEG || raw_delta < -DATELINE_THRESHOLD_DEG
}

/// Computes the handoff flag byte for a transition between two points.
pub fn compute_flags(lat1: Fixed, lon1: Fixed, lat2: Fixed, lon2: Fixed) -> HandoffFlags {
    let mut flags = HandoffFlags::empty();
    if detect_dateline_cross(lon1, lon2) {
        flags |= HandoffFlags::DATELINE;
    }
    if lat1.abs() > POLAR_THRESHOLD_DEG || lat2.abs() > POLAR_THRESHOLD_DEG {
        flags |= HandoffFlags::POLAR;
    }
    flags
}

/// Per-vessel handoff state. Starts at `NoCell`; the first pose simply
/// establishes `InCell`. On each subsequent pose, `on_pose` stays in
/// `InCell` if the cell is unchanged, or emits a packet and atomically
/// moves to the new cell otherwise. There is no explicit terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HandoffState {
    #[default]
    NoCell,
    InCell(u16),
}

impl HandoffState {
    /// Advances the state machine given the vessel's current cell and
    /// pose. Returns `Some(packet)` exactly when a transition occurs.
    pub fn on_pose(&mut self, new_cell_id: u16, last_pose: &Pose) -> Option<HandoffPacket> {
        match *self {
            HandoffState::NoCell => {
                *self = HandoffState::InCell(new_cell_id);
                None
            }
            HandoffState::InCell(current) if current == new_cell_id => None,
            HandoffState::InCell(old_cell_id) => {
                // Flags (dateline/polar) are position-derived; callers that need
                // them compute via `compute_flags` and overwrite `pkt.flags`.
                let pkt = HandoffPacket::new(
                    last_pose.mmsi,
                    *last_pose,
                    old_cell_id,
                    new_cell_id,
                    HandoffFlags::empty(),
                );
                *self = HandoffState::InCell(new_cell_id);
                Some(pkt)
            }
        }
    }
}
