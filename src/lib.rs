//! Transit reachability from walkable origins.
//!
//! Builds a time-expanded graph from GTFS `stop_times`, seeds it with the
//! stops walkable from an origin, and finds the earliest arrival at every
//! stop reachable within a travel-time budget.

pub mod adjacency;
pub mod config;
pub mod data;
pub mod edges;
pub mod error;
pub mod gtfs;
pub mod isochrone;
pub mod search;
pub mod seed;
pub mod time;
pub mod timetable;

pub use adjacency::AdjacencyIndex;
pub use config::IsochroneConfig;
pub use error::{ConfigError, ScheduleError, TimeFormatError};
pub use isochrone::{ReachableStop, ReachableStops};
pub use search::{reachable_stops, Outcome, Query, Reachable};
pub use seed::{Coordinate, SeedSet};
pub use timetable::Timetable;
