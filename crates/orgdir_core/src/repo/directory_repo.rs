//! Directory store contract and SQLite implementation.
//!
//! # Responsibility
//! - Expose the filtered reads lookups need: buildings, activities, child
//!   activity ids, and organizations with building and activities attached.
//! - Own read-scope boundaries (`begin_read`/`commit_read`/`rollback_read`).
//! - Keep SQL details inside the persistence boundary.
//!
//! # Invariants
//! - Organization lists are ordered by `organizations.id ASC`; attached
//!   activities by `activities.id ASC`.
//! - Organization list queries skip organizations without a building.
//! - Persisted phone-number blobs that are not JSON string arrays are
//!   reported as `InvalidData`, never masked.

use crate::db::migrations::{latest_version, schema_version};
use crate::db::DbError;
use crate::geo::area::GeoRect;
use crate::model::activity::{Activity, ActivityId};
use crate::model::building::{Building, BuildingId};
use crate::model::organization::{decode_phone_numbers, Organization, OrganizationId};
use crate::search::name_match::NameMatcher;
use crate::service::hierarchy::ChildActivitySource;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::collections::{BTreeMap, BTreeSet};
use std::error::Error;
use std::fmt::{Display, Formatter};

const ORGANIZATION_SELECT_SQL: &str = "SELECT
    o.id AS id,
    o.name AS name,
    o.phone_numbers AS phone_numbers,
    b.id AS building_id,
    b.address AS address,
    b.latitude AS latitude,
    b.longitude AS longitude
FROM organizations o
LEFT JOIN buildings b ON b.id = o.building_id";

const REQUIRED_COLUMNS: &[(&str, &[&str])] = &[
    ("buildings", &["id", "address", "latitude", "longitude"]),
    ("activities", &["id", "name", "parent_id"]),
    ("organizations", &["id", "name", "phone_numbers", "building_id"]),
    ("organization_activities", &["organization_id", "activity_id"]),
];

pub type RepoResult<T> = Result<T, RepoError>;

/// Directory persistence error.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    /// Connection schema is not at the version this binary expects.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
    /// Persisted rows cannot be converted into the read model.
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "directory repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "directory repository requires table `{table}`")
            }
            Self::MissingRequiredColumn { table, column } => write!(
                f,
                "directory repository requires column `{column}` in table `{table}`"
            ),
            Self::InvalidData(message) => write!(f, "invalid directory data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Read-only store collaborator used by lookup orchestration.
pub trait DirectoryStore: ChildActivitySource {
    /// Opens the per-request read scope.
    fn begin_read(&self) -> RepoResult<()>;
    /// Closes the read scope after a successful lookup.
    fn commit_read(&self) -> RepoResult<()>;
    /// Abandons the read scope after a failed lookup.
    fn rollback_read(&self) -> RepoResult<()>;

    fn get_building(&self, building_id: BuildingId) -> RepoResult<Option<Building>>;
    fn get_activity(&self, activity_id: ActivityId) -> RepoResult<Option<Activity>>;
    /// Every building, for full-scan radius filtering.
    fn list_buildings(&self) -> RepoResult<Vec<Building>>;
    /// Buildings inside an inclusive latitude/longitude rectangle.
    fn list_buildings_in_rect(&self, rect: &GeoRect) -> RepoResult<Vec<Building>>;

    fn organizations_by_building_ids(
        &self,
        building_ids: &BTreeSet<BuildingId>,
    ) -> RepoResult<Vec<Organization>>;
    /// Organizations declaring at least one of `activity_ids`, each once.
    fn organizations_by_activity_ids(
        &self,
        activity_ids: &BTreeSet<ActivityId>,
    ) -> RepoResult<Vec<Organization>>;
    fn organizations_by_name(&self, matcher: &NameMatcher) -> RepoResult<Vec<Organization>>;
    fn get_organization(&self, organization_id: OrganizationId)
        -> RepoResult<Option<Organization>>;
}

/// SQLite-backed directory store.
pub struct SqliteDirectoryRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteDirectoryRepository<'conn> {
    /// Creates the repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_directory_connection_ready(conn)?;
        Ok(Self { conn })
    }

    fn query_organizations(
        &self,
        filter_sql: &str,
        bind_values: Vec<Value>,
    ) -> RepoResult<Vec<OrganizationRow>> {
        let sql = format!(
            "{ORGANIZATION_SELECT_SQL}
             WHERE b.id IS NOT NULL
               AND ({filter_sql})
             ORDER BY o.id ASC;"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_organization_row(row)?);
        }
        Ok(items)
    }

    fn attach_activities(&self, rows: Vec<OrganizationRow>) -> RepoResult<Vec<Organization>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let organization_ids: BTreeSet<OrganizationId> = rows.iter().map(|row| row.id).collect();
        let sql = format!(
            "SELECT
                oa.organization_id AS organization_id,
                a.id AS id,
                a.name AS name,
                a.parent_id AS parent_id
             FROM organization_activities oa
             INNER JOIN activities a ON a.id = oa.activity_id
             WHERE oa.organization_id IN ({})
             ORDER BY oa.organization_id ASC, a.id ASC;",
            placeholders(organization_ids.len())
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mut result_rows = stmt.query(params_from_iter(organization_ids.iter()))?;

        let mut by_organization: BTreeMap<OrganizationId, Vec<Activity>> = BTreeMap::new();
        while let Some(row) = result_rows.next()? {
            let organization_id: OrganizationId = row.get("organization_id")?;
            by_organization
                .entry(organization_id)
                .or_default()
                .push(parse_activity_row(row)?);
        }

        rows.into_iter()
            .map(|row| row.into_organization(&mut by_organization))
            .collect()
    }
}

impl ChildActivitySource for SqliteDirectoryRepository<'_> {
    fn child_activity_ids(
        &self,
        parent_ids: &BTreeSet<ActivityId>,
    ) -> RepoResult<BTreeSet<ActivityId>> {
        if parent_ids.is_empty() {
            return Ok(BTreeSet::new());
        }

        let sql = format!(
            "SELECT id
             FROM activities
             WHERE parent_id IN ({});",
            placeholders(parent_ids.len())
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(parent_ids.iter()))?;
        let mut children = BTreeSet::new();
        while let Some(row) = rows.next()? {
            children.insert(row.get::<_, ActivityId>(0)?);
        }
        Ok(children)
    }
}

impl DirectoryStore for SqliteDirectoryRepository<'_> {
    fn begin_read(&self) -> RepoResult<()> {
        self.conn.execute_batch("BEGIN DEFERRED;")?;
        Ok(())
    }

    fn commit_read(&self) -> RepoResult<()> {
        self.conn.execute_batch("COMMIT;")?;
        Ok(())
    }

    fn rollback_read(&self) -> RepoResult<()> {
        if !self.conn.is_autocommit() {
            self.conn.execute_batch("ROLLBACK;")?;
        }
        Ok(())
    }

    fn get_building(&self, building_id: BuildingId) -> RepoResult<Option<Building>> {
        let building = self
            .conn
            .query_row(
                "SELECT id, address, latitude, longitude
                 FROM buildings
                 WHERE id = ?1;",
                [building_id],
                parse_building_row,
            )
            .optional()?;
        Ok(building)
    }

    fn get_activity(&self, activity_id: ActivityId) -> RepoResult<Option<Activity>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, parent_id
             FROM activities
             WHERE id = ?1;",
        )?;
        let mut rows = stmt.query([activity_id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_activity_row(row)?));
        }
        Ok(None)
    }

    fn list_buildings(&self) -> RepoResult<Vec<Building>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, address, latitude, longitude
             FROM buildings
             ORDER BY id ASC;",
        )?;
        let buildings = stmt
            .query_map([], parse_building_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(buildings)
    }

    fn list_buildings_in_rect(&self, rect: &GeoRect) -> RepoResult<Vec<Building>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, address, latitude, longitude
             FROM buildings
             WHERE latitude BETWEEN ?1 AND ?2
               AND longitude BETWEEN ?3 AND ?4
             ORDER BY id ASC;",
        )?;
        let buildings = stmt
            .query_map(
                params![rect.min_lat, rect.max_lat, rect.min_lon, rect.max_lon],
                parse_building_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(buildings)
    }

    fn organizations_by_building_ids(
        &self,
        building_ids: &BTreeSet<BuildingId>,
    ) -> RepoResult<Vec<Organization>> {
        if building_ids.is_empty() {
            return Ok(Vec::new());
        }

        let filter = format!("o.building_id IN ({})", placeholders(building_ids.len()));
        let rows = self.query_organizations(&filter, integer_values(building_ids))?;
        self.attach_activities(rows)
    }

    fn organizations_by_activity_ids(
        &self,
        activity_ids: &BTreeSet<ActivityId>,
    ) -> RepoResult<Vec<Organization>> {
        if activity_ids.is_empty() {
            return Ok(Vec::new());
        }

        let filter = format!(
            "EXISTS (
                SELECT 1
                FROM organization_activities oa
                WHERE oa.organization_id = o.id
                  AND oa.activity_id IN ({})
            )",
            placeholders(activity_ids.len())
        );
        let rows = self.query_organizations(&filter, integer_values(activity_ids))?;
        self.attach_activities(rows)
    }

    fn organizations_by_name(&self, matcher: &NameMatcher) -> RepoResult<Vec<Organization>> {
        let mut rows = self.query_organizations("1 = 1", Vec::new())?;
        rows.retain(|row| matcher.is_match(&row.name));
        self.attach_activities(rows)
    }

    fn get_organization(
        &self,
        organization_id: OrganizationId,
    ) -> RepoResult<Option<Organization>> {
        let mut stmt = self.conn.prepare(&format!(
            "{ORGANIZATION_SELECT_SQL}
             WHERE o.id = ?1;"
        ))?;
        let mut rows = stmt.query([organization_id])?;
        let Some(row) = rows.next()? else {
            return Ok(None);
        };

        let parsed = parse_organization_row(row)?;
        if parsed.building.is_none() {
            return Err(RepoError::InvalidData(format!(
                "organization {organization_id} is not linked to a building"
            )));
        }
        Ok(self.attach_activities(vec![parsed])?.pop())
    }
}

/// Organization row before activities are attached.
struct OrganizationRow {
    id: OrganizationId,
    name: String,
    phone_numbers: Vec<String>,
    building: Option<Building>,
}

impl OrganizationRow {
    fn into_organization(
        self,
        activities: &mut BTreeMap<OrganizationId, Vec<Activity>>,
    ) -> RepoResult<Organization> {
        let building = self.building.ok_or_else(|| {
            RepoError::InvalidData(format!(
                "organization {} is not linked to a building",
                self.id
            ))
        })?;
        Ok(Organization {
            id: self.id,
            name: self.name,
            phone_numbers: self.phone_numbers,
            building,
            activities: activities.remove(&self.id).unwrap_or_default(),
        })
    }
}

fn parse_organization_row(row: &Row<'_>) -> RepoResult<OrganizationRow> {
    let id: OrganizationId = row.get("id")?;
    let blob: Option<String> = row.get("phone_numbers")?;
    let phone_numbers = decode_phone_numbers(blob.as_deref()).map_err(|err| {
        RepoError::InvalidData(format!(
            "invalid phone_numbers blob for organization {id}: {err}"
        ))
    })?;

    let building = match row.get::<_, Option<BuildingId>>("building_id")? {
        Some(building_id) => Some(Building {
            id: building_id,
            address: row.get("address")?,
            latitude: row.get("latitude")?,
            longitude: row.get("longitude")?,
        }),
        None => None,
    };

    Ok(OrganizationRow {
        id,
        name: row.get("name")?,
        phone_numbers,
        building,
    })
}

fn parse_building_row(row: &Row<'_>) -> rusqlite::Result<Building> {
    Ok(Building {
        id: row.get("id")?,
        address: row.get("address")?,
        latitude: row.get("latitude")?,
        longitude: row.get("longitude")?,
    })
}

fn parse_activity_row(row: &Row<'_>) -> RepoResult<Activity> {
    Ok(Activity {
        id: row.get("id")?,
        name: row.get("name")?,
        parent_id: row.get("parent_id")?,
    })
}

fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

fn integer_values(ids: &BTreeSet<i64>) -> Vec<Value> {
    ids.iter().map(|id| Value::Integer(*id)).collect()
}

fn ensure_directory_connection_ready(conn: &Connection) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version = schema_version(conn)?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    for &(table, columns) in REQUIRED_COLUMNS {
        if !table_exists(conn, table)? {
            return Err(RepoError::MissingRequiredTable(table));
        }
        for &column in columns {
            if !table_has_column(conn, table, column)? {
                return Err(RepoError::MissingRequiredColumn { table, column });
            }
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> RepoResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}
