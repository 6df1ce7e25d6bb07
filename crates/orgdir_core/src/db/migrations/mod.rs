//! Directory schema history.
//!
//! # Responsibility
//! - Version 1 creates the directory tables: `buildings`, the
//!   self-referencing `activities` taxonomy, `organizations` with its JSON
//!   phone-number blob, and the `organization_activities` link table.
//! - Version 2 indexes the columns lookups filter on: activity parents,
//!   organization buildings, link activity ids and building coordinates.
//!
//! # Invariants
//! - Versions are consecutive starting at 1; `PRAGMA user_version` holds the
//!   last applied one.
//! - Pending steps run in one transaction, so a failed step leaves the
//!   previous version intact.

use crate::db::{DbError, DbResult};
use log::info;
use rusqlite::Connection;

#[derive(Debug, Clone, Copy)]
struct SchemaStep {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

const SCHEMA_STEPS: &[SchemaStep] = &[
    SchemaStep {
        version: 1,
        name: "directory_tables",
        sql: include_str!("0001_init.sql"),
    },
    SchemaStep {
        version: 2,
        name: "lookup_indexes",
        sql: include_str!("0002_lookup_indexes.sql"),
    },
];

/// Directory schema version this binary writes.
pub fn latest_version() -> u32 {
    SCHEMA_STEPS.last().map_or(0, |step| step.version)
}

/// Brings the directory schema up to [`latest_version`].
///
/// # Errors
/// - `UnsupportedSchemaVersion` when the file is ahead of this binary.
/// - `Migration` naming the step whose SQL failed.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<()> {
    let from_version = schema_version(conn)?;
    let latest = latest_version();
    if from_version > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: from_version,
            latest_supported: latest,
        });
    }

    let pending: Vec<&SchemaStep> = SCHEMA_STEPS
        .iter()
        .filter(|step| step.version > from_version)
        .collect();
    if pending.is_empty() {
        return Ok(());
    }

    let tx = conn.transaction()?;
    for step in &pending {
        tx.execute_batch(step.sql)
            .and_then(|()| tx.pragma_update(None, "user_version", step.version))
            .map_err(|source| DbError::Migration {
                version: step.version,
                name: step.name,
                source,
            })?;
    }
    tx.commit()?;

    info!(
        "event=db_migrate module=db status=ok from_version={from_version} to_version={latest} steps={}",
        pending.len()
    );
    Ok(())
}

/// Reads the applied directory schema version.
pub fn schema_version(conn: &Connection) -> DbResult<u32> {
    let version = conn.pragma_query_value(None, "user_version", |row| row.get::<_, u32>(0))?;
    Ok(version)
}
