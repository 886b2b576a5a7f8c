//! C ABI for a hosting firmware main loop.
//!
//! There is no allocator here: the host owns all storage. [`tbsp_state_size`]
//! and [`tbsp_state_align`] tell the host how much memory to reserve (a
//! static buffer is the expected case), and [`tbsp_init`] initialises that
//! memory in place. Every other function takes a pointer into host-owned
//! storage rather than an opaque handle the library allocated itself.
//!
//! The generated header is written to `include/tbsp_core.h` by `build.rs`
//! when the `ffi` feature is enabled.

use core::ffi::c_int;
use core::mem::{align_of, size_of};

use crate::angle::{cos_of, sin_of, Angle32};
use crate::fixed::Fixed;
use crate::handoff::{self, HandoffFlags};
use crate::pose::{Pose, POSE_WIRE_SIZE};
use crate::tbsp::TBsp;

/// Bytes required to hold one [`TBsp`] instance.
#[no_mangle]
pub extern "C" fn tbsp_state_size() -> usize {
    size_of::<TBsp>()
}

/// Required alignment, in bytes, of storage passed to [`tbsp_init`].
#[no_mangle]
pub extern "C" fn tbsp_state_align() -> usize {
    align_of::<TBsp>()
}

/// Initialises `state` in place with the given voyage origin (Q16.16
/// degrees). `state` must point to at least `tbsp_state_size()` bytes,
/// aligned to `tbsp_state_align()`, and must not already hold a live
/// [`TBsp`] — this overwrites it without running its destructor.
///
/// # Safety
/// `state` must be non-null, correctly sized, and correctly aligned.
#[no_mangle]
pub unsafe extern "C" fn tbsp_init(state: *mut TBsp, lat0_raw: i32, lon0_raw: i32) {
    state.write(TBsp::init(Fixed(lat0_raw), Fixed(lon0_raw)));
}

/// Maps a (lat, lon) pair, in Q16.16 degrees, to a cell ID.
///
/// # Safety
/// `state` must point to a value previously written by [`tbsp_init`].
#[no_mangle]
pub unsafe extern "C" fn tbsp_lat_lon_to_cell(state: *const TBsp, lat_raw: i32, lon_raw: i32) -> u16 {
    (*state).lat_lon_to_cell(Fixed(lat_raw), Fixed(lon_raw))
}

/// Inserts the 56-byte wire pose at `pose_bytes` into `cell_id`, allocating
/// the cell if needed. Returns `false` only on capacity exhaustion.
///
/// # Safety
/// `state` must point to a value previously written by [`tbsp_init`];
/// `pose_bytes` must point to at least `POSE_WIRE_SIZE` readable bytes.
#[no_mangle]
pub unsafe extern "C" fn tbsp_insert_pose(
    state: *mut TBsp,
    cell_id: u16,
    pose_bytes: *const u8,
) -> bool {
    let buf = core::slice::from_raw_parts(pose_bytes, POSE_WIRE_SIZE);
    let pose = Pose::read_from(buf);
    (*state).insert_pose(cell_id, &pose).is_ok()
}

/// Number of currently active cells.
///
/// # Safety
/// `state` must point to a value previously written by [`tbsp_init`].
#[no_mangle]
pub unsafe extern "C" fn tbsp_active_count(state: *const TBsp) -> u16 {
    (*state).active_count()
}

/// Deactivates `cell_id`, if active. No-op otherwise.
///
/// # Safety
/// `state` must point to a value previously written by [`tbsp_init`].
#[no_mangle]
pub unsafe extern "C" fn tbsp_reset_cell(state: *mut TBsp, cell_id: u16) {
    let _ = (*state).reset_cell(cell_id);
}

/// Writes up to 8 neighbour cell IDs of `cell_id` into `out` (NW, N, NE, W,
/// E, SW, S, SE order, skipping entries that fall outside the grid) and
/// returns the count written.
///
/// # Safety
/// `state` must point to a value previously written by [`tbsp_init`]; `out`
/// must point to at least 8 writable `u16` slots.
#[no_mangle]
pub unsafe extern "C" fn tbsp_adjacent_cells(
    state: *const TBsp,
    cell_id: u16,
    out: *mut u16,
) -> usize {
    let (neighbors, count) = (*state).adjacent_cells(cell_id);
    for (i, id) in neighbors.iter().enumerate().take(count) {
        out.add(i).write(*id);
    }
    count
}

/// Writes `[lat_min, lat_max, lon_min, lon_max]` (Q16.16 degrees) for
/// `cell_id` into `out`.
///
/// # Safety
/// `state` must point to a value previously written by [`tbsp_init`]; `out`
/// must point to at least 4 writable `i32` slots.
#[no_mangle]
pub unsafe extern "C" fn tbsp_cell_bounds(state: *const TBsp, cell_id: u16, out: *mut i32) {
    let (lat_min, lat_max, lon_min, lon_max) = (*state).cell_bounds(cell_id);
    out.write(lat_min.0);
    out.add(1).write(lat_max.0);
    out.add(2).write(lon_min.0);
    out.add(3).write(lon_max.0);
}

/// `true` if the ENU distance between two 56-byte wire poses exceeds a
/// cell's edge length. Either pointer may be null, in which case the
/// result is `false`.
///
/// # Safety
/// Non-null pointers must point to at least `POSE_WIRE_SIZE` readable
/// bytes.
#[no_mangle]
pub unsafe extern "C" fn handoff_should_trigger(
    prev_pose_bytes: *const u8,
    curr_pose_bytes: *const u8,
) -> bool {
    let prev = (!prev_pose_bytes.is_null())
        .then(|| Pose::read_from(core::slice::from_raw_parts(prev_pose_bytes, POSE_WIRE_SIZE)));
    let curr = (!curr_pose_bytes.is_null())
        .then(|| Pose::read_from(core::slice::from_raw_parts(curr_pose_bytes, POSE_WIRE_SIZE)));
    handoff::should_trigger(prev.as_ref(), curr.as_ref())
}

/// Handoff flag byte (bit 0 dateline, bit 1 polar) for a transition between
/// two points, given in Q16.16 degrees.
#[no_mangle]
pub extern "C" fn handoff_compute_flags(lat1: i32, lon1: i32, lat2: i32, lon2: i32) -> u8 {
    handoff::compute_flags(Fixed(lat1), Fixed(lon1), Fixed(lat2), Fixed(lon2)).bits()
}

/// Builds a 100-byte handoff packet into `out`. The signature field is
/// zeroed; an external signer fills it in-place before broadcast.
///
/// # Safety
/// `pose_bytes` must point to at least `POSE_WIRE_SIZE` readable bytes;
/// `out` must point to at least `handoff::HANDOFF_WIRE_SIZE` writable
/// bytes.
#[no_mangle]
pub unsafe extern "C" fn handoff_build_packet(
    mmsi: u32,
    pose_bytes: *const u8,
    old_cell_id: u16,
    new_cell_id: u16,
    flags: u8,
    out: *mut u8,
) {
    let pose = Pose::read_from(core::slice::from_raw_parts(pose_bytes, POSE_WIRE_SIZE));
    let pkt = handoff::HandoffPacket::new(
        mmsi,
        pose,
        old_cell_id,
        new_cell_id,
        HandoffFlags::from_bits_truncate(flags),
    );
    let buf = core::slice::from_raw_parts_mut(out, handoff::HANDOFF_WIRE_SIZE);
    pkt.write_to(buf);
}

/// Validates a received 100-byte handoff packet against `current_time`
/// (seconds). Returns `1` if valid, `0` otherwise.
///
/// # Safety
/// `packet_bytes` must point to at least `handoff::HANDOFF_WIRE_SIZE`
/// readable bytes.
#[no_mangle]
pub unsafe extern "C" fn handoff_validate(packet_bytes: *const u8, current_time: u32) -> c_int {
    let buf = core::slice::from_raw_parts(packet_bytes, handoff::HANDOFF_WIRE_SIZE);
    let pkt = handoff::HandoffPacket::read_from(buf);
    handoff::validate(&pkt, current_time).is_ok() as c_int
}

/// `sin(angle)` in Q16.16, `angle` given as a full-circle `u32` turn
/// fraction (`2^32` = 360 degrees).
#[no_mangle]
pub extern "C" fn angle_sin(raw_angle: u32) -> i32 {
    sin_of(Angle32(raw_angle)).0
}

/// `cos(angle)`, see [`angle_sin`].
#[no_mangle]
pub extern "C" fn angle_cos(raw_angle: u32) -> i32 {
    cos_of(Angle32(raw_angle)).0
}

/// Q16.16 multiply, exposed for hosts that want to compose fixed-point
/// values without duplicating the 64-bit-intermediate rule.
#[no_mangle]
pub extern "C" fn fixed_mul(a: i32, b: i32) -> i32 {
    Fixed(a).mul(Fixed(b)).0
}

/// Q16.16 divide; saturates to `i32::MIN`/`i32::MAX` on a zero divisor.
#[no_mangle]
pub extern "C" fn fixed_div(a: i32, b: i32) -> i32 {
    Fixed(a).div(Fixed(b)).0
}
