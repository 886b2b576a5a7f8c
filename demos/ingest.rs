//! Mock ingest loop: feeds a handful of synthetic vessel fixes through the
//! T-BSP grid and the handoff state machine, printing each transition.

use tbsp_core::fixed::Fixed;
use tbsp_core::handoff::{self, HandoffState};
use tbsp_core::pose::Pose;
use tbsp_core::tbsp::TBsp;

fn deg(v: f64) -> Fixed {
    Fixed::from_f64(v)
}

fn main() {
    env_logger::init();

    let mut bsp = TBsp::init(deg(37.8), deg(-122.4));
    let mut state = HandoffState::NoCell;

    let track = [
        (37.8, -122.4, 90.0),
        (37.81, -122.39, 90.0),
        (37.9, -122.3, 45.0),
        (38.0, -122.2, 45.0),
        (80.5, -178.5, 0.0),
        (80.6, 179.5, 0.0),
    ];

    let mut prev_lat_lon = None;

    for (i, &(lat, lon, heading)) in track.iter().enumerate() {
        let pose = Pose::from_gps(
            deg(lon) - deg(-122.4),
            deg(lat) - deg(37.8),
            Fixed::ZERO,
            deg(heading),
            1_700_000_000 + i as u32 * 60,
            367_123_456,
        );
        let cell_id = bsp.lat_lon_to_cell(deg(lat), deg(lon));
        if let Err(e) = bsp.insert_pose(cell_id, &pose) {
            eprintln!("fix {i}: insert failed: {e}");
            continue;
        }

        println!("fix {i}: lat={lat} lon={lon} -> cell {cell_id:#06x}");
        if let Some(pkt) = state.on_pose(cell_id, &pose) {
            let flags = if let Some((prev_lat, prev_lon)) = prev_lat_lon {
                handoff::compute_flags(deg(prev_lat), deg(prev_lon), deg(lat), deg(lon))
            } else {
                handoff::HandoffFlags::empty()
            };
            println!(
                "  handoff: mmsi={} {:#06x} -> {:#06x} flags={:?}",
                pkt.mmsi, pkt.old_cell_id, pkt.new_cell_id, flags
            );
        }
        prev_lat_lon = Some((lat, lon));
    }

    println!("active cells: {}", bsp.active_count());
}
