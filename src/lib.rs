//! Deterministic, allocation-free pose tracking and spatial indexing for a
//! resource-constrained edge node.
//!
//! Positions arrive as ENU metres in Q16.16 fixed point ([`fixed`]),
//! orientations as full-circle angles backed by a build-time sine table
//! ([`angle`]), and both compose into rigid-body [`pose::Pose`] records with
//! a byte-exact wire layout. [`tbsp`] buckets incoming poses into a static
//! grid of bounded per-cell ring buffers, and [`handoff`] detects when a
//! vessel crosses a cell boundary and packages the transition for broadcast
//! to a neighbouring node.
//!
//! The crate is `#![no_std]` by default. The `std` feature (on by default
//! at the workspace level, off for firmware targets) additionally enables
//! host-side float conversions and `log`-backed diagnostics; `ffi` exposes
//! the C ABI in [`ffi`] for a hosting main loop written in C.
#![no_std]

#[cfg(feature = "std")]
extern crate std;

pub mod angle;
pub mod error;
pub mod fixed;
pub mod geo;
pub mod handoff;
pub mod pose;
pub mod tbsp;

#[cfg(feature = "ffi")]
pub mod ffi;

pub use angle::Angle32;
pub use error::TbspError;
pub use fixed::Fixed;
pub use handoff::{HandoffFlags, HandoffPacket, HandoffState};
pub use pose::Pose;
pub use tbsp::TBsp;

/// Result type alias used throughout the crate.
pub type Result<T> = core::result::Result<T, TbspError>;
