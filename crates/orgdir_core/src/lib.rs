//! Core domain logic for the organization directory.
//! Read-only lookups over buildings, activities and organizations.

pub mod db;
pub mod geo;
pub mod logging;
pub mod model;
pub mod repo;
pub mod search;
pub mod seed;
pub mod service;

pub use db::{open_db, open_db_in_memory, Connection, DbError, DbResult};
pub use geo::area::{GeoArea, GeoRect, RadiusArea, SearchType};
pub use geo::distance::haversine_km;
pub use logging::{default_log_level, init_logging, logging_status, LoggingConfig};
pub use model::activity::{Activity, ActivityId};
pub use model::building::{Building, BuildingId};
pub use model::organization::{Organization, OrganizationId, OrganizationRecord};
pub use repo::directory_repo::{
    DirectoryStore, RepoError, RepoResult, SqliteDirectoryRepository,
};
pub use search::name_match::{NameMatcher, SearchError};
pub use seed::{import_seed, SeedData, SeedError, SeedOutcome};
pub use service::geo_params::{GeoParamError, GeoSearchParams};
pub use service::hierarchy::{expand_activity_tree, ChildActivitySource, MAX_EXPANSION_DEPTH};
pub use service::lookup_service::{
    BadRequestReason, LookupError, LookupErrorKind, LookupResult, LookupService, NotFoundReason,
};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
