//! Query configuration for isochrone runs.

use crate::{
    error::ConfigError,
    search::Query,
    seed::{Coordinate, Utm, WalkParams, DEFAULT_WALK_SPEED_KMH},
    time::Minutes,
};

/// Parameters shared by every origin of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct IsochroneConfig {
    /// Walking radius around the origin (metres).
    pub walk_radius_m: f64,

    /// Walking speed (km/h).
    pub walk_speed_kmh: f64,

    /// Clock time the traveller leaves the origin (minutes since service-day start).
    pub departure_time_min: Minutes,

    /// Travel budget; arrivals later than departure + budget are pruned.
    pub max_travel_time_min: Minutes,

    /// Optional cap on settled queue entries per search.
    pub max_iterations: Option<usize>,

    /// Fixed UTM zone for distance measurement.
    /// `None` picks the zone containing each origin.
    pub utm_zone: Option<u8>,
}

impl IsochroneConfig {
    pub fn new(
        walk_radius_m: f64,
        walk_speed_kmh: f64,
        departure_time_min: Minutes,
        max_travel_time_min: Minutes,
    ) -> Self {
        Self {
            walk_radius_m,
            walk_speed_kmh,
            departure_time_min,
            max_travel_time_min,
            ..Self::default()
        }
    }

    pub fn horizon(&self) -> Minutes {
        self.departure_time_min + self.max_travel_time_min
    }

    pub fn walk_params(&self) -> WalkParams {
        WalkParams::new(self.walk_radius_m, self.walk_speed_kmh)
    }

    pub fn query(&self) -> Query {
        Query {
            departure: self.departure_time_min,
            max_travel_time: self.max_travel_time_min,
            max_iterations: self.max_iterations,
        }
    }

    pub fn projection_for(&self, origin: Coordinate) -> Result<Utm, ConfigError> {
        match self.utm_zone {
            Some(zone) => Utm::new(zone, origin.lat >= 0.0),
            None => Ok(Utm::for_coordinate(origin)),
        }
    }
}

impl Default for IsochroneConfig {
    fn default() -> Self {
        Self {
            walk_radius_m: 500.0,
            walk_speed_kmh: DEFAULT_WALK_SPEED_KMH,
            departure_time_min: 510.0, // 08:30
            max_travel_time_min: 30.0,
            max_iterations: None,
            utm_zone: None,
        }
    }
}
