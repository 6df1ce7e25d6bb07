//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the read contract lookups consume from the store.
//! - Isolate SQLite query details from service orchestration.
//!
//! # Invariants
//! - Repositories never write; the directory is populated by seed import.
//! - Repository APIs distinguish absent rows (`Ok(None)` / empty lists) from
//!   transport and data errors.

pub mod directory_repo;
