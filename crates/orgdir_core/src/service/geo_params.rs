//! Location search request validation.
//!
//! # Responsibility
//! - Turn raw location search parameters into a validated `GeoArea`.
//!
//! # Invariants
//! - Validation never touches the store.
//! - Radius mode requires a center and `radius_km` and forbids every
//!   rectangle bound; rectangle mode requires all four bounds and forbids
//!   `radius_km`.
//! - Inverted rectangle bounds are accepted and match nothing.

use crate::geo::area::{GeoArea, GeoRect, RadiusArea, SearchType};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Raw location search request as received from the edge.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeoSearchParams {
    /// `radius` or `rectangle`.
    pub search_type: String,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub radius_km: Option<f64>,
    pub min_lat: Option<f64>,
    pub max_lat: Option<f64>,
    pub min_lon: Option<f64>,
    pub max_lon: Option<f64>,
}

impl GeoSearchParams {
    pub fn radius(lat: f64, lon: f64, radius_km: f64) -> Self {
        Self {
            search_type: SearchType::Radius.to_string(),
            lat: Some(lat),
            lon: Some(lon),
            radius_km: Some(radius_km),
            ..Self::default()
        }
    }

    pub fn rectangle(min_lat: f64, max_lat: f64, min_lon: f64, max_lon: f64) -> Self {
        Self {
            search_type: SearchType::Rectangle.to_string(),
            min_lat: Some(min_lat),
            max_lat: Some(max_lat),
            min_lon: Some(min_lon),
            max_lon: Some(max_lon),
            ..Self::default()
        }
    }

    /// Validates the parameter combination for the requested mode.
    pub fn validate(&self) -> Result<GeoArea, GeoParamError> {
        let search_type: SearchType = self
            .search_type
            .parse()
            .map_err(GeoParamError::UnknownSearchType)?;

        for (name, value) in self.named_values() {
            if let Some(value) = value {
                if !value.is_finite() {
                    return Err(GeoParamError::NonFiniteParameter(name));
                }
            }
        }

        match search_type {
            SearchType::Radius => self.validate_radius(),
            SearchType::Rectangle => self.validate_rectangle(),
        }
    }

    fn validate_radius(&self) -> Result<GeoArea, GeoParamError> {
        let radius_km = self.radius_km.ok_or(GeoParamError::MissingRadius)?;
        if self.rectangle_bounds().iter().any(Option::is_some) {
            return Err(GeoParamError::RectangleBoundsWithRadius);
        }
        let (Some(center_lat), Some(center_lon)) = (self.lat, self.lon) else {
            return Err(GeoParamError::MissingCenter);
        };
        if radius_km < 0.0 {
            return Err(GeoParamError::NegativeRadius(radius_km));
        }

        Ok(GeoArea::Radius(RadiusArea {
            center_lat,
            center_lon,
            radius_km,
        }))
    }

    fn validate_rectangle(&self) -> Result<GeoArea, GeoParamError> {
        let [Some(min_lat), Some(max_lat), Some(min_lon), Some(max_lon)] = self.rectangle_bounds()
        else {
            return Err(GeoParamError::MissingRectangleBounds);
        };
        if self.radius_km.is_some() {
            return Err(GeoParamError::RadiusWithRectangle);
        }

        Ok(GeoArea::Rectangle(GeoRect {
            min_lat,
            max_lat,
            min_lon,
            max_lon,
        }))
    }

    fn rectangle_bounds(&self) -> [Option<f64>; 4] {
        [self.min_lat, self.max_lat, self.min_lon, self.max_lon]
    }

    fn named_values(&self) -> [(&'static str, Option<f64>); 7] {
        [
            ("lat", self.lat),
            ("lon", self.lon),
            ("radius_km", self.radius_km),
            ("min_lat", self.min_lat),
            ("max_lat", self.max_lat),
            ("min_lon", self.min_lon),
            ("max_lon", self.max_lon),
        ]
    }
}

/// Location search parameter combination is invalid.
#[derive(Debug, Clone, PartialEq)]
pub enum GeoParamError {
    UnknownSearchType(String),
    MissingCenter,
    MissingRadius,
    RectangleBoundsWithRadius,
    MissingRectangleBounds,
    RadiusWithRectangle,
    NonFiniteParameter(&'static str),
    NegativeRadius(f64),
}

impl Display for GeoParamError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownSearchType(value) => write!(
                f,
                "unknown search type `{value}`; expected radius|rectangle"
            ),
            Self::MissingCenter => write!(f, "radius search requires lat and lon"),
            Self::MissingRadius => write!(f, "radius search requires radius_km"),
            Self::RectangleBoundsWithRadius => write!(
                f,
                "radius search does not accept min_lat, max_lat, min_lon, max_lon"
            ),
            Self::MissingRectangleBounds => write!(
                f,
                "rectangle search requires min_lat, max_lat, min_lon, max_lon"
            ),
            Self::RadiusWithRectangle => {
                write!(f, "rectangle search does not accept radius_km")
            }
            Self::NonFiniteParameter(name) => write!(f, "parameter `{name}` must be finite"),
            Self::NegativeRadius(value) => {
                write!(f, "radius_km must not be negative, got {value}")
            }
        }
    }
}

impl Error for GeoParamError {}
