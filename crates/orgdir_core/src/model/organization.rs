//! Organization aggregate and public lookup record.
//!
//! # Responsibility
//! - Hold one organization with its building and declared activities
//!   eagerly attached, as returned by the store.
//! - Shape that aggregate into the flat record exposed by every lookup.
//!
//! # Invariants
//! - `phone_numbers` keeps the order persisted in the serialized blob.
//! - `OrganizationRecord::activities` follows the order of
//!   `Organization::activities` (activity id ascending from the store).

use crate::model::activity::Activity;
use crate::model::building::Building;
use serde::{Deserialize, Serialize};

/// Store-assigned organization identifier.
pub type OrganizationId = i64;

/// Organization with building and activities loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct Organization {
    pub id: OrganizationId,
    pub name: String,
    pub phone_numbers: Vec<String>,
    pub building: Building,
    pub activities: Vec<Activity>,
}

/// Public shape returned by directory lookups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrganizationRecord {
    pub id: OrganizationId,
    pub name: String,
    pub phone_numbers: Vec<String>,
    /// Names of the declared activities.
    pub activities: Vec<String>,
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl From<Organization> for OrganizationRecord {
    fn from(value: Organization) -> Self {
        Self {
            id: value.id,
            name: value.name,
            phone_numbers: value.phone_numbers,
            activities: value
                .activities
                .into_iter()
                .map(|activity| activity.name)
                .collect(),
            address: value.building.address,
            latitude: value.building.latitude,
            longitude: value.building.longitude,
        }
    }
}

/// Decodes the persisted phone-number blob.
///
/// The blob is a JSON array of strings. A missing blob means no numbers.
pub fn decode_phone_numbers(blob: Option<&str>) -> Result<Vec<String>, serde_json::Error> {
    match blob {
        None => Ok(Vec::new()),
        Some(text) => serde_json::from_str(text),
    }
}

/// Encodes phone numbers into the persisted blob format.
pub fn encode_phone_numbers(phone_numbers: &[String]) -> Result<String, serde_json::Error> {
    serde_json::to_string(phone_numbers)
}
