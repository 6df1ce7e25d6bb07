//! Geographic primitives used by location lookups.
//!
//! # Responsibility
//! - Great-circle distance between coordinates.
//! - Radius and rectangle areas, and the building filter over them.
//!
//! # Invariants
//! - Everything here is pure: no store access, no logging, no globals.
//! - Coordinates are degrees and are not range-checked.

pub mod area;
pub mod distance;
