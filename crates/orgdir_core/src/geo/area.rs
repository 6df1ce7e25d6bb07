//! Search areas and the building spatial filter.
//!
//! # Responsibility
//! - Model the two mutually exclusive location search modes.
//! - Decide which buildings fall inside an area.
//!
//! # Invariants
//! - Both modes use inclusive boundaries.
//! - Rectangles are axis-aligned and do not wrap across the ±180° meridian;
//!   a rectangle with `min_lon > max_lon` matches nothing.
//! - Radius mode is a full scan over the provided buildings.

use crate::geo::distance::haversine_km;
use crate::model::building::{Building, BuildingId};
use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Location search discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchType {
    Radius,
    Rectangle,
}

impl SearchType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Radius => "radius",
            Self::Rectangle => "rectangle",
        }
    }
}

impl Display for SearchType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SearchType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "radius" => Ok(Self::Radius),
            "rectangle" => Ok(Self::Rectangle),
            other => Err(other.to_string()),
        }
    }
}

/// Circle on the sphere: center in degrees, radius in kilometers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RadiusArea {
    pub center_lat: f64,
    pub center_lon: f64,
    pub radius_km: f64,
}

impl RadiusArea {
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        haversine_km(self.center_lat, self.center_lon, lat, lon) <= self.radius_km
    }
}

/// Axis-aligned latitude/longitude rectangle, bounds inclusive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoRect {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl GeoRect {
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        lat >= self.min_lat && lat <= self.max_lat && lon >= self.min_lon && lon <= self.max_lon
    }
}

/// Validated location search area.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GeoArea {
    Radius(RadiusArea),
    Rectangle(GeoRect),
}

impl GeoArea {
    pub fn search_type(&self) -> SearchType {
        match self {
            Self::Radius(_) => SearchType::Radius,
            Self::Rectangle(_) => SearchType::Rectangle,
        }
    }

    pub fn contains(&self, building: &Building) -> bool {
        match self {
            Self::Radius(area) => area.contains(building.latitude, building.longitude),
            Self::Rectangle(rect) => rect.contains(building.latitude, building.longitude),
        }
    }
}

/// Returns the ids of all buildings inside `area`.
pub fn filter_buildings<'a, I>(area: &GeoArea, buildings: I) -> BTreeSet<BuildingId>
where
    I: IntoIterator<Item = &'a Building>,
{
    buildings
        .into_iter()
        .filter(|building| area.contains(building))
        .map(|building| building.id)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{filter_buildings, GeoArea, GeoRect, RadiusArea, SearchType};
    use crate::model::building::Building;
    use std::collections::BTreeSet;

    fn buildings() -> Vec<Building> {
        vec![
            Building::new(1, "Origin", 0.0, 0.0),
            Building::new(2, "Ten east", 0.0, 10.0),
            Building::new(3, "Near origin", 0.001, 0.001),
            Building::new(4, "Red Square", 55.75, 37.62),
        ]
    }

    fn radius(center_lat: f64, center_lon: f64, radius_km: f64) -> GeoArea {
        GeoArea::Radius(RadiusArea {
            center_lat,
            center_lon,
            radius_km,
        })
    }

    #[test]
    fn radius_excludes_building_ten_degrees_away() {
        let all = buildings();
        let hits = filter_buildings(&radius(0.0, 0.0, 500.0), &all);
        assert_eq!(hits, BTreeSet::from([1, 3]));
    }

    #[test]
    fn zero_radius_matches_only_exact_center() {
        let all = buildings();
        let hits = filter_buildings(&radius(0.0, 0.0, 0.0), &all);
        assert_eq!(hits, BTreeSet::from([1]));
    }

    #[test]
    fn radius_boundary_is_inclusive() {
        let all = vec![Building::new(7, "Edge", 0.0, 10.0)];
        let exact = crate::geo::distance::haversine_km(0.0, 0.0, 0.0, 10.0);
        assert_eq!(
            filter_buildings(&radius(0.0, 0.0, exact), &all),
            BTreeSet::from([7])
        );
        assert!(filter_buildings(&radius(0.0, 0.0, exact - 1e-6), &all).is_empty());
    }

    #[test]
    fn degenerate_rectangle_matches_only_that_point() {
        let all = buildings();
        let rect = GeoArea::Rectangle(GeoRect {
            min_lat: 55.75,
            max_lat: 55.75,
            min_lon: 37.62,
            max_lon: 37.62,
        });
        assert_eq!(filter_buildings(&rect, &all), BTreeSet::from([4]));
    }

    #[test]
    fn rectangle_bounds_are_inclusive_on_both_axes() {
        let all = buildings();
        let rect = GeoArea::Rectangle(GeoRect {
            min_lat: 0.0,
            max_lat: 0.001,
            min_lon: 0.0,
            max_lon: 10.0,
        });
        assert_eq!(filter_buildings(&rect, &all), BTreeSet::from([1, 2, 3]));
    }

    #[test]
    fn rectangle_does_not_wrap_across_antimeridian() {
        let all = vec![
            Building::new(1, "West of line", 0.0, 179.5),
            Building::new(2, "East of line", 0.0, -179.5),
        ];
        let wrapped = GeoArea::Rectangle(GeoRect {
            min_lat: -1.0,
            max_lat: 1.0,
            min_lon: 179.0,
            max_lon: -179.0,
        });
        assert!(filter_buildings(&wrapped, &all).is_empty());
    }

    #[test]
    fn search_type_parses_case_insensitively() {
        assert_eq!("Radius".parse::<SearchType>(), Ok(SearchType::Radius));
        assert_eq!(" rectangle ".parse::<SearchType>(), Ok(SearchType::Rectangle));
        assert_eq!("circle".parse::<SearchType>(), Err("circle".to_string()));
        assert_eq!(radius(0.0, 0.0, 1.0).search_type(), SearchType::Radius);
    }
}
