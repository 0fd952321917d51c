//! Walk-accessible starting stops around an origin.
//!
//! Stops and origin are projected into a planar metric frame and compared
//! by Euclidean distance; every stop inside the walking radius becomes a
//! seed whose time is the walk duration from the origin.

use std::{collections::BTreeMap, fmt, str::FromStr};

use geo::{Distance, Euclidean, Point};
use tracing::debug;

use crate::{data::StopIdx, error::ConfigError, time::Minutes};

pub const DEFAULT_WALK_SPEED_KMH: f64 = 4.5;

/// WGS84 position in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.lat, self.lon)
    }
}

impl FromStr for Coordinate {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ConfigError::InvalidCoordinate(s.to_owned());
        let (lat, lon) = s.split_once(',').ok_or_else(invalid)?;
        let lat: f64 = lat.trim().parse().map_err(|_| invalid())?;
        let lon: f64 = lon.trim().parse().map_err(|_| invalid())?;

        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
            return Err(invalid());
        }
        Ok(Self { lat, lon })
    }
}

/// Maps geographic coordinates onto a plane measured in metres.
pub trait Projection {
    fn project(&self, coordinate: Coordinate) -> Point<f64>;
}

/// Universal Transverse Mercator on the WGS84 ellipsoid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Utm {
    zone: u8,
    north: bool,
}

const WGS84_A: f64 = 6_378_137.0;
const WGS84_F: f64 = 1.0 / 298.257_223_563;
const UTM_K0: f64 = 0.9996;
const UTM_FALSE_EASTING: f64 = 500_000.0;
const UTM_FALSE_NORTHING_SOUTH: f64 = 10_000_000.0;

impl Utm {
    pub fn new(zone: u8, north: bool) -> Result<Self, ConfigError> {
        if (1..=60).contains(&zone) {
            Ok(Self { zone, north })
        } else {
            Err(ConfigError::InvalidUtmZone(zone))
        }
    }

    /// The standard zone containing `coordinate`.
    pub fn for_coordinate(coordinate: Coordinate) -> Self {
        let zone = ((coordinate.lon + 180.0) / 6.0).floor() as i32 + 1;
        Self {
            zone: zone.clamp(1, 60) as u8,
            north: coordinate.lat >= 0.0,
        }
    }

    pub fn zone(&self) -> u8 {
        self.zone
    }

    pub fn epsg(&self) -> u32 {
        let base = if self.north { 32600 } else { 32700 };
        base + self.zone as u32
    }

    fn central_meridian(&self) -> f64 {
        (self.zone as f64 * 6.0 - 183.0).to_radians()
    }
}

impl Projection for Utm {
    fn project(&self, coordinate: Coordinate) -> Point<f64> {
        let e2 = WGS84_F * (2.0 - WGS84_F);
        let e4 = e2 * e2;
        let e6 = e4 * e2;
        let ep2 = e2 / (1.0 - e2);

        let phi = coordinate.lat.to_radians();
        let (sin_phi, cos_phi) = phi.sin_cos();
        let tan_phi = phi.tan();

        let n = WGS84_A / (1.0 - e2 * sin_phi * sin_phi).sqrt();
        let t = tan_phi * tan_phi;
        let c = ep2 * cos_phi * cos_phi;
        let a = cos_phi * (coordinate.lon.to_radians() - self.central_meridian());

        let m = WGS84_A
            * ((1.0 - e2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0) * phi
                - (3.0 * e2 / 8.0 + 3.0 * e4 / 32.0 + 45.0 * e6 / 1024.0) * (2.0 * phi).sin()
                + (15.0 * e4 / 256.0 + 45.0 * e6 / 1024.0) * (4.0 * phi).sin()
                - (35.0 * e6 / 3072.0) * (6.0 * phi).sin());

        let easting = UTM_K0
            * n
            * (a + (1.0 - t + c) * a.powi(3) / 6.0
                + (5.0 - 18.0 * t + t * t + 72.0 * c - 58.0 * ep2) * a.powi(5) / 120.0)
            + UTM_FALSE_EASTING;

        let mut northing = UTM_K0
            * (m + n
                * tan_phi
                * (a * a / 2.0
                    + (5.0 - t + 9.0 * c + 4.0 * c * c) * a.powi(4) / 24.0
                    + (61.0 - 58.0 * t + t * t + 600.0 * c - 330.0 * ep2) * a.powi(6) / 720.0));
        if !self.north {
            northing += UTM_FALSE_NORTHING_SOUTH;
        }

        Point::new(easting, northing)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WalkParams {
    pub radius_m: f64,
    pub speed_kmh: f64,
}

impl WalkParams {
    pub fn new(radius_m: f64, speed_kmh: f64) -> Self {
        Self {
            radius_m,
            speed_kmh,
        }
    }

    pub fn metres_per_minute(&self) -> f64 {
        self.speed_kmh * 1000.0 / 60.0
    }

    pub fn walk_time(&self, distance_m: f64) -> Minutes {
        distance_m / self.metres_per_minute()
    }
}

/// Starting stops of a query and the time each is reached.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SeedSet(BTreeMap<StopIdx, Minutes>);

impl SeedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keeps the earlier time if `stop` is already seeded.
    pub fn insert(&mut self, stop: StopIdx, time: Minutes) {
        self.0
            .entry(stop)
            .and_modify(|seeded| *seeded = seeded.min(time))
            .or_insert(time);
    }

    pub fn get(&self, stop: StopIdx) -> Option<Minutes> {
        self.0.get(&stop).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (StopIdx, Minutes)> + '_ {
        self.0.iter().map(|(&stop, &time)| (stop, time))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Moves walk times measured from minute 0 onto the schedule clock.
    pub fn departing_at(self, departure: Minutes) -> Self {
        Self(
            self.0
                .into_iter()
                .map(|(stop, time)| (stop, time + departure))
                .collect(),
        )
    }
}

impl FromIterator<(StopIdx, Minutes)> for SeedSet {
    fn from_iter<T: IntoIterator<Item = (StopIdx, Minutes)>>(iter: T) -> Self {
        let mut seeds = Self::new();
        for (stop, time) in iter {
            seeds.insert(stop, time);
        }
        seeds
    }
}

/// Stops within walking radius of `origin`, seeded with their walk time.
pub fn find_start_stops<P: Projection>(
    stops: impl IntoIterator<Item = (StopIdx, Coordinate)>,
    origin: Coordinate,
    walk: &WalkParams,
    projection: &P,
) -> SeedSet {
    let origin_point = projection.project(origin);

    let seeds: SeedSet = stops
        .into_iter()
        .filter_map(|(stop, coordinate)| {
            let distance = Euclidean.distance(origin_point, projection.project(coordinate));
            (distance <= walk.radius_m).then(|| (stop, walk.walk_time(distance)))
        })
        .collect();

    debug!(
        %origin,
        radius_m = walk.radius_m,
        seeds = seeds.len(),
        "found walkable start stops"
    );
    seeds
}
