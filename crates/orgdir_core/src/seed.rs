//! Bulk import of directory seed data.
//!
//! # Responsibility
//! - Read the JSON seed document (`buildings`, `activities`,
//!   `organizations`).
//! - Load it into an empty database in one transaction.
//!
//! # Invariants
//! - Import is skipped entirely when any building, activity or organization
//!   already exists.
//! - Organization activity ids that do not name an existing activity are
//!   ignored.
//! - Any failure rolls the whole import back.

use crate::db::DbError;
use crate::model::activity::ActivityId;
use crate::model::building::BuildingId;
use crate::model::organization::{encode_phone_numbers, OrganizationId};
use log::{error, info};
use rusqlite::{params, Connection};
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;
use std::time::Instant;

/// Seed document.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SeedData {
    #[serde(default)]
    pub buildings: Vec<SeedBuilding>,
    #[serde(default)]
    pub activities: Vec<SeedActivity>,
    #[serde(default)]
    pub organizations: Vec<SeedOrganization>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SeedBuilding {
    pub id: BuildingId,
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SeedActivity {
    pub id: ActivityId,
    pub name: String,
    #[serde(default)]
    pub parent_id: Option<ActivityId>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SeedOrganization {
    pub id: OrganizationId,
    pub name: String,
    #[serde(default)]
    pub phone_numbers: Vec<String>,
    #[serde(default)]
    pub building_id: Option<BuildingId>,
    #[serde(default)]
    pub activity_ids: Vec<ActivityId>,
}

impl SeedData {
    /// Reads and parses a seed file.
    pub fn from_json_file(path: impl AsRef<Path>) -> SeedResult<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&raw)
    }

    pub fn from_json_str(raw: &str) -> SeedResult<Self> {
        Ok(serde_json::from_str(raw)?)
    }
}

/// What `import_seed` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedOutcome {
    /// The database already held directory data.
    Skipped,
    Imported {
        buildings: usize,
        activities: usize,
        organizations: usize,
    },
}

pub type SeedResult<T> = Result<T, SeedError>;

/// Seed loading failure.
#[derive(Debug)]
pub enum SeedError {
    Io(std::io::Error),
    Json(serde_json::Error),
    Db(DbError),
}

impl Display for SeedError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "cannot read seed file: {err}"),
            Self::Json(err) => write!(f, "invalid seed document: {err}"),
            Self::Db(err) => write!(f, "seed import failed: {err}"),
        }
    }
}

impl Error for SeedError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Json(err) => Some(err),
            Self::Db(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for SeedError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for SeedError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

impl From<rusqlite::Error> for SeedError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Loads `data` into an empty directory database.
pub fn import_seed(conn: &mut Connection, data: &SeedData) -> SeedResult<SeedOutcome> {
    let started_at = Instant::now();
    match import_in_transaction(conn, data) {
        Ok(SeedOutcome::Skipped) => {
            info!("event=seed_import module=seed status=skipped reason=data_present");
            Ok(SeedOutcome::Skipped)
        }
        Ok(outcome @ SeedOutcome::Imported {
            buildings,
            activities,
            organizations,
        }) => {
            info!(
                "event=seed_import module=seed status=ok duration_ms={} buildings={buildings} activities={activities} organizations={organizations}",
                started_at.elapsed().as_millis()
            );
            Ok(outcome)
        }
        Err(err) => {
            error!(
                "event=seed_import module=seed status=error duration_ms={} error={err}",
                started_at.elapsed().as_millis()
            );
            Err(err)
        }
    }
}

fn import_in_transaction(conn: &mut Connection, data: &SeedData) -> SeedResult<SeedOutcome> {
    let tx = conn.transaction()?;
    if has_directory_data(&tx)? {
        return Ok(SeedOutcome::Skipped);
    }

    // Activities may reference parents listed later in the document.
    tx.execute_batch("PRAGMA defer_foreign_keys = ON;")?;

    {
        let mut insert_building = tx.prepare(
            "INSERT INTO buildings (id, address, latitude, longitude)
             VALUES (?1, ?2, ?3, ?4);",
        )?;
        for building in &data.buildings {
            insert_building.execute(params![
                building.id,
                building.address,
                building.latitude,
                building.longitude
            ])?;
        }

        let mut insert_activity = tx.prepare(
            "INSERT INTO activities (id, name, parent_id)
             VALUES (?1, ?2, ?3);",
        )?;
        for activity in &data.activities {
            insert_activity.execute(params![activity.id, activity.name, activity.parent_id])?;
        }

        let mut insert_organization = tx.prepare(
            "INSERT INTO organizations (id, name, phone_numbers, building_id)
             VALUES (?1, ?2, ?3, ?4);",
        )?;
        let mut link_activity = tx.prepare(
            "INSERT OR IGNORE INTO organization_activities (organization_id, activity_id)
             SELECT ?1, id FROM activities WHERE id = ?2;",
        )?;
        for organization in &data.organizations {
            let phone_numbers =
                encode_phone_numbers(&organization.phone_numbers).map_err(SeedError::Json)?;
            insert_organization.execute(params![
                organization.id,
                organization.name,
                phone_numbers,
                organization.building_id
            ])?;
            for activity_id in &organization.activity_ids {
                link_activity.execute(params![organization.id, activity_id])?;
            }
        }
    }

    tx.commit()?;
    Ok(SeedOutcome::Imported {
        buildings: data.buildings.len(),
        activities: data.activities.len(),
        organizations: data.organizations.len(),
    })
}

fn has_directory_data(conn: &Connection) -> rusqlite::Result<bool> {
    let present: i64 = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM buildings)
             OR EXISTS(SELECT 1 FROM activities)
             OR EXISTS(SELECT 1 FROM organizations);",
        [],
        |row| row.get(0),
    )?;
    Ok(present == 1)
}
