//! Error and diagnostic-event vocabulary.
//!
//! No operation in this crate panics, and no error is retried internally —
//! every failure is a synchronous return value. `fixed_div`'s divide-by-zero
//! case is deliberately absent here: it saturates and never surfaces (see
//! `fixed::Fixed::div`).

/// Failure modes surfaced to callers of the T-BSP and handoff APIs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TbspError {
    /// `insert_pose` found no active cell matching the target ID and no
    /// free slot to allocate one. No state was mutated.
    #[error("no free or matching cell slot available")]
    CapacityExhausted,

    /// `get_cell` / `reset_cell` referenced an ID with no active cell.
    #[error("no active cell with the given id")]
    CellNotFound,

    /// A deserialised or received handoff packet failed validation: zero
    /// MMSI, identical source/destination cell IDs, or a pose older than
    /// 24 hours relative to the receiver's clock.
    #[error("handoff packet failed validation")]
    PacketInvalid,
}
