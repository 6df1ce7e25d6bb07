//! Building domain model.

use serde::{Deserialize, Serialize};

/// Store-assigned building identifier.
pub type BuildingId = i64;

/// A physical building that organizations occupy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Building {
    pub id: BuildingId,
    /// Street address as entered by the data provider.
    pub address: String,
    /// Degrees, WGS84.
    pub latitude: f64,
    /// Degrees, WGS84.
    pub longitude: f64,
}

impl Building {
    pub fn new(
        id: BuildingId,
        address: impl Into<String>,
        latitude: f64,
        longitude: f64,
    ) -> Self {
        Self {
            id,
            address: address.into(),
            latitude,
            longitude,
        }
    }
}
