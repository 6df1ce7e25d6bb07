//! Directory lookup use-case service.
//!
//! # Responsibility
//! - Validate lookup inputs before any store access.
//! - Resolve candidate id sets (direct filters, hierarchy expansion,
//!   spatial filtering) and load matching organizations.
//! - Map results to `OrganizationRecord` and failures to `LookupError`.
//!
//! # Invariants
//! - Every lookup runs inside one read scope that is committed on success
//!   and rolled back on every failure path, including unwinding.
//! - An empty result is always `NotFound`, never an empty success.
//! - Store failure causes are logged, never returned to the caller.

use crate::geo::area::{filter_buildings, GeoArea, GeoRect};
use crate::model::activity::ActivityId;
use crate::model::building::BuildingId;
use crate::model::organization::{Organization, OrganizationId, OrganizationRecord};
use crate::repo::directory_repo::{DirectoryStore, RepoError, RepoResult};
use crate::search::name_match::{NameMatcher, SearchError};
use crate::service::geo_params::{GeoParamError, GeoSearchParams};
use crate::service::hierarchy::expand_activity_tree;
use log::{debug, error, info, warn};
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;
use uuid::Uuid;

pub type LookupResult<T> = Result<T, LookupError>;

/// Why a request was rejected before touching the store.
#[derive(Debug, Clone, PartialEq)]
pub enum BadRequestReason {
    Geo(GeoParamError),
    NameFragment(SearchError),
}

/// Which part of a lookup came back empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotFoundReason {
    BuildingNotFound(BuildingId),
    ActivityNotFound(ActivityId),
    OrganizationNotFound(OrganizationId),
    NoBuildingsInArea,
    NoOrganizations,
}

/// Coarse failure class for edge-layer status mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupErrorKind {
    BadRequest,
    NotFound,
    Internal,
}

impl LookupErrorKind {
    /// HTTP-style status code for this failure class.
    pub fn status_code(self) -> u16 {
        match self {
            Self::BadRequest => 400,
            Self::NotFound => 404,
            Self::Internal => 500,
        }
    }
}

/// Public lookup failure.
#[derive(Debug, Clone, PartialEq)]
pub enum LookupError {
    BadRequest(BadRequestReason),
    NotFound(NotFoundReason),
    /// The store failed; details are only in the logs.
    Store,
}

impl LookupError {
    pub fn kind(&self) -> LookupErrorKind {
        match self {
            Self::BadRequest(_) => LookupErrorKind::BadRequest,
            Self::NotFound(_) => LookupErrorKind::NotFound,
            Self::Store => LookupErrorKind::Internal,
        }
    }
}

impl Display for LookupError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BadRequest(BadRequestReason::Geo(err)) => write!(f, "{err}"),
            Self::BadRequest(BadRequestReason::NameFragment(err)) => write!(f, "{err}"),
            Self::NotFound(NotFoundReason::BuildingNotFound(id)) => {
                write!(f, "building with id {id} not found")
            }
            Self::NotFound(NotFoundReason::ActivityNotFound(id)) => {
                write!(f, "activity with id {id} not found")
            }
            Self::NotFound(NotFoundReason::OrganizationNotFound(id)) => {
                write!(f, "organization with id {id} not found")
            }
            Self::NotFound(NotFoundReason::NoBuildingsInArea) => {
                write!(f, "no organizations found in the given area")
            }
            Self::NotFound(NotFoundReason::NoOrganizations) => {
                write!(f, "organizations not found")
            }
            Self::Store => write!(f, "server error while processing the request"),
        }
    }
}

impl Error for LookupError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::BadRequest(BadRequestReason::Geo(err)) => Some(err),
            Self::BadRequest(BadRequestReason::NameFragment(err)) => Some(err),
            _ => None,
        }
    }
}

impl From<GeoParamError> for LookupError {
    fn from(value: GeoParamError) -> Self {
        Self::BadRequest(BadRequestReason::Geo(value))
    }
}

impl From<SearchError> for LookupError {
    fn from(value: SearchError) -> Self {
        Self::BadRequest(BadRequestReason::NameFragment(value))
    }
}

impl From<NotFoundReason> for LookupError {
    fn from(value: NotFoundReason) -> Self {
        Self::NotFound(value)
    }
}

/// Failure inside a read scope; store causes stay private to this module.
enum ScopeFailure {
    Lookup(LookupError),
    Store(RepoError),
}

impl From<RepoError> for ScopeFailure {
    fn from(value: RepoError) -> Self {
        Self::Store(value)
    }
}

impl From<NotFoundReason> for ScopeFailure {
    fn from(value: NotFoundReason) -> Self {
        Self::Lookup(value.into())
    }
}

type ScopeResult<T> = Result<T, ScopeFailure>;

/// Per-request read scope; rolls back unless committed.
struct ReadScope<'s, S: DirectoryStore + ?Sized> {
    store: &'s S,
    request_id: Uuid,
    open: bool,
}

impl<'s, S: DirectoryStore + ?Sized> ReadScope<'s, S> {
    fn begin(store: &'s S, request_id: Uuid) -> RepoResult<Self> {
        store.begin_read()?;
        Ok(Self {
            store,
            request_id,
            open: true,
        })
    }

    fn commit(mut self) -> RepoResult<()> {
        self.store.commit_read()?;
        self.open = false;
        Ok(())
    }
}

impl<S: DirectoryStore + ?Sized> Drop for ReadScope<'_, S> {
    fn drop(&mut self) {
        if !self.open {
            return;
        }
        if let Err(err) = self.store.rollback_read() {
            error!(
                "event=read_scope module=lookup status=error request_id={} error_code=rollback_failed error={err}",
                self.request_id
            );
        }
    }
}

/// Number of organizations in a lookup payload, for logging.
trait ResultSize {
    fn result_size(&self) -> usize;
}

impl ResultSize for Vec<OrganizationRecord> {
    fn result_size(&self) -> usize {
        self.len()
    }
}

impl ResultSize for OrganizationRecord {
    fn result_size(&self) -> usize {
        1
    }
}

/// Read-only directory lookups over a store implementation.
pub struct LookupService<S: DirectoryStore> {
    store: S,
}

impl<S: DirectoryStore> LookupService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Organizations located in one building.
    pub fn by_building(&self, building_id: BuildingId) -> LookupResult<Vec<OrganizationRecord>> {
        self.run("by_building", format!("building_id={building_id}"), |store| {
            if store.get_building(building_id)?.is_none() {
                return Err(NotFoundReason::BuildingNotFound(building_id).into());
            }
            let organizations =
                store.organizations_by_building_ids(&BTreeSet::from([building_id]))?;
            into_records(organizations)
        })
    }

    /// Organizations declaring exactly this activity.
    pub fn by_activity(&self, activity_id: ActivityId) -> LookupResult<Vec<OrganizationRecord>> {
        self.run("by_activity", format!("activity_id={activity_id}"), |store| {
            if store.get_activity(activity_id)?.is_none() {
                return Err(NotFoundReason::ActivityNotFound(activity_id).into());
            }
            let organizations =
                store.organizations_by_activity_ids(&BTreeSet::from([activity_id]))?;
            into_records(organizations)
        })
    }

    /// Organizations declaring this activity or a descendant up to three
    /// levels below it.
    pub fn by_activity_tree(
        &self,
        activity_id: ActivityId,
    ) -> LookupResult<Vec<OrganizationRecord>> {
        self.run(
            "by_activity_tree",
            format!("activity_id={activity_id}"),
            |store| {
                if store.get_activity(activity_id)?.is_none() {
                    return Err(NotFoundReason::ActivityNotFound(activity_id).into());
                }
                let activity_ids = expand_activity_tree(store, activity_id)?;
                debug!(
                    "event=activity_tree_expanded module=lookup root_id={activity_id} expanded_count={}",
                    activity_ids.len()
                );
                into_records(store.organizations_by_activity_ids(&activity_ids)?)
            },
        )
    }

    /// Organizations in the area described by raw location parameters.
    pub fn by_location(&self, params: &GeoSearchParams) -> LookupResult<Vec<OrganizationRecord>> {
        let area = params.validate().map_err(|err| {
            warn!(
                "event=lookup module=lookup op=by_location status=bad_request search_type={} reason={err}",
                params.search_type
            );
            LookupError::from(err)
        })?;
        self.area_lookup(&area)
    }

    /// Organizations within `radius_km` of a center point.
    pub fn by_radius(
        &self,
        lat: f64,
        lon: f64,
        radius_km: f64,
    ) -> LookupResult<Vec<OrganizationRecord>> {
        self.by_location(&GeoSearchParams::radius(lat, lon, radius_km))
    }

    /// Organizations inside an inclusive latitude/longitude rectangle.
    pub fn by_rectangle(&self, rect: GeoRect) -> LookupResult<Vec<OrganizationRecord>> {
        self.by_location(&GeoSearchParams::rectangle(
            rect.min_lat,
            rect.max_lat,
            rect.min_lon,
            rect.max_lon,
        ))
    }

    /// Organizations whose name contains `fragment`, ignoring case.
    pub fn by_name(&self, fragment: &str) -> LookupResult<Vec<OrganizationRecord>> {
        let matcher = NameMatcher::new(fragment).map_err(|err| {
            warn!("event=lookup module=lookup op=by_name status=bad_request reason={err}");
            LookupError::from(err)
        })?;
        self.run(
            "by_name",
            format!("fragment_chars={}", fragment.chars().count()),
            |store| into_records(store.organizations_by_name(&matcher)?),
        )
    }

    /// One organization by identifier.
    pub fn by_id(&self, organization_id: OrganizationId) -> LookupResult<OrganizationRecord> {
        self.run(
            "by_id",
            format!("organization_id={organization_id}"),
            |store| {
                store
                    .get_organization(organization_id)?
                    .map(OrganizationRecord::from)
                    .ok_or_else(|| NotFoundReason::OrganizationNotFound(organization_id).into())
            },
        )
    }

    // `area` must come from `GeoSearchParams::validate`.
    fn area_lookup(&self, area: &GeoArea) -> LookupResult<Vec<OrganizationRecord>> {
        self.run(
            "by_location",
            format!("search_type={}", area.search_type()),
            |store| {
                let building_ids = match area {
                    GeoArea::Radius(_) => filter_buildings(area, &store.list_buildings()?),
                    GeoArea::Rectangle(rect) => store
                        .list_buildings_in_rect(rect)?
                        .into_iter()
                        .map(|building| building.id)
                        .collect(),
                };
                if building_ids.is_empty() {
                    return Err(NotFoundReason::NoBuildingsInArea.into());
                }
                debug!(
                    "event=area_filtered module=lookup search_type={} building_count={}",
                    area.search_type(),
                    building_ids.len()
                );
                into_records(store.organizations_by_building_ids(&building_ids)?)
            },
        )
    }

    fn run<T, F>(&self, op: &'static str, detail: String, lookup: F) -> LookupResult<T>
    where
        T: ResultSize,
        F: FnOnce(&S) -> ScopeResult<T>,
    {
        let request_id = Uuid::new_v4();
        let started_at = Instant::now();
        info!("event=lookup module=lookup op={op} status=start request_id={request_id} {detail}");

        let outcome = ReadScope::begin(&self.store, request_id)
            .map_err(ScopeFailure::from)
            .and_then(|scope| {
                let value = lookup(&self.store)?;
                scope.commit()?;
                Ok(value)
            });

        let duration_ms = started_at.elapsed().as_millis();
        match outcome {
            Ok(value) => {
                info!(
                    "event=lookup module=lookup op={op} status=ok request_id={request_id} duration_ms={duration_ms} result_count={}",
                    value.result_size()
                );
                Ok(value)
            }
            Err(ScopeFailure::Lookup(err)) => {
                warn!(
                    "event=lookup module=lookup op={op} status=not_found request_id={request_id} duration_ms={duration_ms} reason={err}"
                );
                Err(err)
            }
            Err(ScopeFailure::Store(err)) => {
                error!(
                    "event=lookup module=lookup op={op} status=error request_id={request_id} duration_ms={duration_ms} error_code=store_failure error={err}"
                );
                Err(LookupError::Store)
            }
        }
    }
}

fn into_records(organizations: Vec<Organization>) -> ScopeResult<Vec<OrganizationRecord>> {
    if organizations.is_empty() {
        return Err(NotFoundReason::NoOrganizations.into());
    }
    Ok(organizations
        .into_iter()
        .map(OrganizationRecord::from)
        .collect())
}
