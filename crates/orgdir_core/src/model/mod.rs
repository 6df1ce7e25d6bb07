//! Directory domain model.
//!
//! # Responsibility
//! - Define the building, activity and organization records read by lookups.
//! - Define the public organization record returned to callers.
//!
//! # Invariants
//! - Identifiers are store-assigned integers and never reused.
//! - Activity parent links form a forest; cycles are not representable by
//!   well-formed seed data and are not checked here.

pub mod activity;
pub mod building;
pub mod organization;
