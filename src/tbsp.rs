//! Trajectory Binary Space Partitioning (T-BSP) engine: a zero-allocation
//! grid of cells, each a bounded ring of poses, indexed from geographic
//! coordinates with correct wraparound at the anti-meridian.
//!
//! A single root struct owns a static pool of cell slots and performs
//! linear-scan lookup and explicit allocation/reset over them — no
//! dynamic allocation or hidden resource lifecycle.

use crate::error::TbspError;
use crate::fixed::Fixed;
use crate::geo::normalize_lon;
use crate::pose::Pose;
use crate::Result;

/// Cell edge length, kilometres. Compile-time constant; runtime
/// reconfiguration is a non-goal.
pub const CELL_SIZE_KM: i32 = 10;
/// Maximum number of simultaneously active cells.
pub const MAX_CELLS: usize = 64;
/// Ring buffer capacity per cell.
pub const POSES_PER_CELL: usize = 128;
/// Approximate kilometres per degree of latitude/longitude at the
/// reference point (flat-earth approximation, WGS84 equatorial value).
pub const DEG_TO_KM: Fixed = Fixed(7_295_468); // 111.32 * 65536, rounded

const CELL_SIZE_KM_FIXED: Fixed = Fixed(CELL_SIZE_KM << 16);

const _: () = assert!(MAX_CELLS <= 65536, "cell_id is u16, MAX_CELLS must fit");
const _: () = assert!(POSES_PER_CELL > 0, "must allow at least one pose per cell");

/// A bounded ring of poses belonging to a single grid square, allocated on
/// demand from the root's static pool.
#[derive(Debug, Clone, Copy)]
pub struct Cell {
    pub lat_min: Fixed,
    pub lat_max: Fixed,
    pub lon_min: Fixed,
    pub lon_max: Fixed,
    pub cell_id: u16,
    pub pose_count: u16,
    pub active: bool,
    poses: [Pose; POSES_PER_CELL],
}

impl Default for Cell {
    fn default() -> Cell {
        Cell {
            lat_min: Fixed::ZERO,
            lat_max: Fixed::ZERO,
            lon_min: Fixed::ZERO,
            lon_max: Fixed::ZERO,
            cell_id: 0,
            pose_count: 0,
            active: false,
            poses: [Pose::default(); POSES_PER_CELL],
        }
    }
}

impl Cell {
    /// The poses currently buffered in this cell, oldest first.
    pub fn poses(&self) -> &[Pose] {
        &self.poses[..self.pose_count as usize]
    }
}

/// `pose_count >= threshold * CAPACITY` for a caller-supplied threshold in
/// `(0, 1]`. Lets callers trigger estimation before the overflow policy
/// activates.
pub fn near_full(cell: &Cell, threshold: f32) -> bool {
    if !cell.active {
        return false;
    }
    let threshold_count = (threshold * POSES_PER_CELL as f32) as u16;
    cell.pose_count >= threshold_count
}

fn generate_cell_id(lat_idx: i32, lon_idx: i32) -> u16 {
    let lat_idx = lat_idx.clamp(-128, 127);
    let lon_idx = lon_idx.clamp(-128, 127);
    (((lat_idx & 0xFF) as u16) << 8) | ((lon_idx & 0xFF) as u16)
}

fn decode_cell_id(cell_id: u16) -> (i32, i32) {
    let lat_idx = ((cell_id >> 8) as u8) as i8 as i32;
    let lon_idx = (cell_id as u8) as i8 as i32;
    (lat_idx, lon_idx)
}

/// The T-BSP root: a static pool of cells plus the voyage-origin reference.
pub struct TBsp {
    cells: [Cell; MAX_CELLS],
    active_count: u16,
    ref_lat: Fixed,
    ref_lon: Fixed,
}

impl TBsp {
    /// Initialises the root with a voyage origin. The reference longitude
    /// is normalised; the reference latitude is taken as given.
    pub fn init(lat0: Fixed, lon0: Fixed) -> TBsp {
        TBsp {
            cells: [Cell::default(); MAX_CELLS],
            active_count: 0,
            ref_lat: lat0,
            ref_lon: normalize_lon(lon0),
        }
    }

    pub fn active_count(&self) -> u16 {
        self.active_count
    }

    pub fn ref_lat(&self) -> Fixed {
        self.ref_lat
    }

    pub fn ref_lon(&self) -> Fixed {
        self.ref_lon
    }

    /// Maps a raw (lat, lon) to a cell ID. Longitude is normalised before
    /// the offset from the reference point is computed. Rounding is floor
    /// for non-negative deltas and ceiling-toward-zero for negative deltas,
    /// so the zero-cell is symmetric about the origin.
    pub fn lat_lon_to_cell(&self, lat: Fixed, lon: Fixed) -> u16 {
        let lon = normalize_lon(lon);

        let dlat = lat - self.ref_lat;
        let dlon = lon - self.ref_lon;

        let dlat_km = dlat.mul(DEG_TO_KM);
        let dlon_km = dlon.mul(DEG_TO_KM);

        let lat_idx = km_to_grid_index(dlat_km);
        let lon_idx = km_to_grid_index(dlon_km);

        generate_cell_id(lat_idx, lon_idx)
    }

    /// Finds an active cell matching `cell_id`, or allocates a free slot
    /// for it. Returns `None` only when no active or free slot exists
    /// (capacity exhaustion; no state is mutated in that case).
    fn find_or_allocate(&mut self, cell_id: u16) -> Option<usize> {
        for (i, cell) in self.cells.iter().enumerate() {
            if cell.active && cell.cell_id == cell_id {
                return Some(i);
            }
        }
        for (i, cell) in self.cells.iter_mut().enumerate() {
            if !cell.active {
                cell.cell_id = cell_id;
                cell.pose_count = 0;
                cell.active = true;
                self.active_count += 1;
                return Some(i);
            }
        }
        None
    }

    /// Inserts `pose` into the cell identified by `cell_id`, allocating the
    /// cell if it does not already exist. Returns
    /// [`TbspError::CapacityExhausted`] only if `MAX_CELLS` is exhausted;
    /// no state is mutated in that case.
    ///
    /// If the target cell is already at capacity, this resets `pose_count`
    /// to zero before appending — a wholesale discard of the buffered
    /// segment, not a per-element eviction (see module docs in `lib.rs`).
    /// The caller is expected to have drained the cell via [`Cell::poses`]
    /// and called [`TBsp::reset_cell`] before this happens; `on_overflow`
    /// is invoked when it doesn't, so operators can detect the scheduling
    /// bug.
    pub fn insert_pose(&mut self, cell_id: u16, pose: &Pose) -> Result<()> {
        self.insert_pose_with(cell_id, pose, |_cell_id| {
            #[cfg(feature = "std")]
            log::warn!("cell {:#06x} ring buffer full, discarding buffered segment", _cell_id);
        })
    }

    /// As [`TBsp::insert_pose`], but invokes `on_overflow(cell_id)` when the
    /// ring-buffer overflow policy (wholesale `pose_count` reset) fires.
    pub fn insert_pose_with(
        &mut self,
        cell_id: u16,
        pose: &Pose,
        on_overflow: impl FnOnce(u16),
    ) -> Result<()> {
        let Some(idx) = self.find_or_allocate(cell_id) else {
            #[cfg(feature = "std")]
            log::warn!("cell {:#06x} rejected: no free or matching slot ({}/{} active)", cell_id, self.active_count, MAX_CELLS);
            return Err(TbspError::CapacityExhausted);
        };
        let cell = &mut self.cells[idx];

        if cell.pose_count as usize >= POSES_PER_CELL {
            on_overflow(cell_id);
            cell.pose_count = 0;
        }

        cell.poses[cell.pose_count as usize] = *pose;
        cell.pose_count += 1;
        Ok(())
    }

    /// Looks up the active cell matching `cell_id`, or
    /// [`TbspError::CellNotFound`] if none is active.
    pub fn get_cell(&self, cell_id: u16) -> Result<&Cell> {
        self.cells
            .iter()
            .find(|cell| cell.active && cell.cell_id == cell_id)
            .ok_or(TbspError::CellNotFound)
    }

    /// Marks the cell inactive and zeroes its pose count. Poses are not
    /// zeroed; they are overwritten on the next allocation. Returns
    /// [`TbspError::CellNotFound`] if no active cell matches `cell_id`.
    pub fn reset_cell(&mut self, cell_id: u16) -> Result<()> {
        let cell = self
            .cells
            .iter_mut()
            .find(|cell| cell.active && cell.cell_id == cell_id)
            .ok_or(TbspError::CellNotFound)?;
        cell.active = false;
        cell.pose_count = 0;
        self.active_count -= 1;
        Ok(())
    }

    /// Enumerates the up-to-8 neighbours of `cell_id` in 8-connectivity,
    /// in the fixed order NW, N, NE, W, E, SW, S, SE, clamped to the
    /// `[-128, 127]` grid range. Does not wrap across the anti-meridian —
    /// that is the handoff protocol's responsibility.
    pub fn adjacent_cells(&self, cell_id: u16) -> ([u16; 8], usize) {
        let (lat_idx, lon_idx) = decode_cell_id(cell_id);
        const OFFSETS: [(i32, i32); 8] = [
            (-1, -1), (-1, 0), (-1, 1),
            (0, -1), (0, 1),
            (1, -1), (1, 0), (1, 1),
        ];

        let mut out = [0u16; 8];
        let mut count = 0;
        for (dlat, dlon) in OFFSETS {
            let nlat = lat_idx + dlat;
            let nlon = lon_idx + dlon;
            if (-128..=127).contains(&nlat) && (-128..=127).contains(&nlon) {
                out[count] = generate_cell_id(nlat, nlon);
                count += 1;
            }
        }
        (out, count)
    }

    /// Decodes `cell_id` back to a `(lat_min, lat_max, lon_min, lon_max)`
    /// degree interval, relative to this root's reference point.
    pub fn cell_bounds(&self, cell_id: u16) -> (Fixed, Fixed, Fixed, Fixed) {
        let (lat_idx, lon_idx) = decode_cell_id(cell_id);
        let cell_size_deg = CELL_SIZE_KM_FIXED.div(DEG_TO_KM);

        let lat_offset = Fixed::from_int(lat_idx).mul(cell_size_deg);
        let lon_offset = Fixed::from_int(lon_idx).mul(cell_size_deg);

        let lat_min = self.ref_lat + lat_offset;
        let lat_max = lat_min + cell_size_deg;
        let lon_min = normalize_lon(self.ref_lon + lon_offset);
        let lon_max = normalize_lon(lon_min + cell_size_deg);

        (lat_min, lat_max, lon_min, lon_max)
    }
}

/// Converts a kilometre offset to a signed grid index: floor for
/// non-negative values, ceiling-toward-zero for negative ones, so adjacent
/// cells never overlap and the zero-cell is symmetric about the origin.
fn km_to_grid_index(km: Fixed) -> i32 {
    if km.0 >= 0 {
        km.div(CELL_SIZE_KM_FIXED).to_int()
    } else {
        let adjusted = km - (CELL_SIZE_KM_FIXED - Fixed::ONE);
        adjusted.div(CELL_SIZE_KM_FIXED).to_int()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deg(v: i32) -> Fixed {
        Fixed::from_int(v)
    }

    #[test]
    fn origin_cell_is_zero() {
        let mut bsp = TBsp::init(deg(0), deg(0));
        let cell_id = bsp.lat_lon_to_cell(deg(0), deg(0));
        assert_eq!(cell_id, 0);
        let pose = Pose::default();
        assert!(bsp.insert_pose(cell_id, &pose).is_ok());
        assert_eq!(bsp.active_count(), 1);
    }

    #[test]
    fn dateline_cells_differ() {
        let bsp = TBsp::init(deg(0), Fixed::from_f64(179.0));
        let east = bsp.lat_lon_to_cell(deg(0), Fixed::from_f64(179.5));
        let west = bsp.lat_lon_to_cell(deg(0), Fixed::from_f64(-179.5));
        assert_ne!(east, west);
    }

    #[test]
    fn overflow_ring_resets_wholesale() {
        let mut bsp = TBsp::init(deg(0), deg(0));
        let cell_id = bsp.lat_lon_to_cell(deg(0), deg(0));
        let pose = Pose::default();
        for _ in 0..POSES_PER_CELL {
            assert!(bsp.insert_pose(cell_id, &pose).is_ok());
        }
        assert_eq!(bsp.get_cell(cell_id).unwrap().pose_count, POSES_PER_CELL as u16);
        assert!(bsp.insert_pose(cell_id, &pose).is_ok());
        assert_eq!(bsp.get_cell(cell_id).unwrap().pose_count, 1);
        assert_eq!(bsp.active_count(), 1);
    }

    #[test]
    fn capacity_exhaustion_leaves_state_untouched() {
        let mut bsp = TBsp::init(deg(0), deg(0));
        let pose = Pose::default();
        for i in 0..MAX_CELLS as u16 {
            assert!(bsp.insert_pose(i, &pose).is_ok());
        }
        assert_eq!(bsp.active_count() as usize, MAX_CELLS);
        assert_eq!(bsp.insert_pose(9999, &pose), Err(TbspError::CapacityExhausted));
        assert_eq!(bsp.active_count() as usize, MAX_CELLS);
    }

    #[test]
    fn reset_then_get_is_none() {
        let mut bsp = TBsp::init(deg(0), deg(0));
        let cell_id = bsp.lat_lon_to_cell(deg(0), deg(0));
        bsp.insert_pose(cell_id, &Pose::default()).unwrap();
        bsp.reset_cell(cell_id).unwrap();
        assert_eq!(bsp.get_cell(cell_id).unwrap_err(), TbspError::CellNotFound);
        assert_eq!(bsp.active_count(), 0);
    }

    #[test]
    fn cell_bounds_contains_origin() {
        let bsp = TBsp::init(deg(0), deg(0));
        let cell_id = bsp.lat_lon_to_cell(deg(0), deg(0));
        let (lat_min, lat_max, lon_min, lon_max) = bsp.cell_bounds(cell_id);
        assert!(lat_min <= deg(0) && deg(0) < lat_max);
        assert!(lon_min <= deg(0) && deg(0) < lon_max);
    }

    #[test]
    fn adjacent_cells_full_count_away_from_edges() {
        let bsp = TBsp::init(deg(0), deg(0));
        let center = bsp.lat_lon_to_cell(deg(0), deg(0));
        let (_, count) = bsp.adjacent_cells(center);
        assert_eq!(count, 8);
    }

    #[test]
    fn near_full_threshold() {
        let mut bsp = TBsp::init(deg(0), deg(0));
        let cell_id = bsp.lat_lon_to_cell(deg(0), deg(0));
        bsp.insert_pose(cell_id, &Pose::default()).unwrap();
        let cell = bsp.get_cell(cell_id).unwrap();
        assert!(!near_full(cell, 0.9));
    }
}

