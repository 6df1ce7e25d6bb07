//! Name search entry points.
//!
//! # Responsibility
//! - Turn a caller-provided name fragment into a case-insensitive matcher.
//! - Keep matching rules inside core, independent of SQLite collation.

pub mod name_match;
