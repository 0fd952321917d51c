//! An immutable schedule snapshot ready for repeated queries.

use rayon::prelude::*;
use tracing::info;

use crate::{
    adjacency::AdjacencyIndex,
    config::IsochroneConfig,
    data::{DenseId, Registry, StopIdx, TripIdx},
    edges::build_edges,
    error::{ConfigError, ScheduleError},
    gtfs::{self, Feed},
    search::{reachable_stops, Reachable},
    seed::{find_start_stops, Coordinate, SeedSet},
};

#[derive(Debug, Clone, Default)]
struct StopInfo {
    name: Option<String>,
    coordinate: Option<Coordinate>,
}

#[derive(Debug)]
pub struct Timetable {
    pub stops: Registry<StopIdx>,
    pub trips: Registry<TripIdx>,
    pub index: AdjacencyIndex,
    /// Edges dropped while building because arrival preceded departure.
    pub discarded_negative: usize,
    stop_info: Vec<StopInfo>,
}

impl Timetable {
    /// Stops are numbered in `stops` order, followed by any stop only
    /// referenced from `stop_times`.
    pub fn new(
        stops: &[gtfs::Stop],
        stop_times: &[gtfs::StopTime],
    ) -> Result<Self, ScheduleError> {
        let mut registry = Registry::default();
        let mut stop_info = Vec::new();
        for stop in stops {
            let idx: StopIdx = registry.intern(&stop.stop_id);
            if idx.index() == stop_info.len() {
                stop_info.push(StopInfo::default());
            }
            stop_info[idx.index()] = StopInfo {
                name: stop.stop_name.clone(),
                coordinate: stop
                    .stop_lat
                    .zip(stop.stop_lon)
                    .map(|(lat, lon)| Coordinate::new(lat, lon)),
            };
        }

        let mut trips = Registry::default();
        let edge_set = build_edges(stop_times, &mut registry, &mut trips)?;
        stop_info.resize(registry.len(), StopInfo::default());

        let index = AdjacencyIndex::build(&edge_set.edges, registry.len());
        info!(
            stops = registry.len(),
            trips = trips.len(),
            edges = index.len(),
            discarded_negative = edge_set.discarded_negative,
            "built timetable"
        );

        Ok(Self {
            stops: registry,
            trips,
            index,
            discarded_negative: edge_set.discarded_negative,
            stop_info,
        })
    }

    pub fn from_feed(feed: &Feed) -> Result<Self, ScheduleError> {
        Self::new(&feed.stops, &feed.stop_times)
    }

    pub fn stop_idx(&self, stop_id: &str) -> Option<StopIdx> {
        self.stops.get(stop_id)
    }

    pub fn stop_id(&self, stop: StopIdx) -> Option<&str> {
        self.stops.resolve(stop)
    }

    pub fn trip_id(&self, trip: TripIdx) -> Option<&str> {
        self.trips.resolve(trip)
    }

    pub fn stop_name(&self, stop: StopIdx) -> Option<&str> {
        self.stop_info.get(stop.index())?.name.as_deref()
    }

    pub fn coordinate(&self, stop: StopIdx) -> Option<Coordinate> {
        self.stop_info.get(stop.index())?.coordinate
    }

    /// Every stop with a known position.
    pub fn located_stops(&self) -> impl Iterator<Item = (StopIdx, Coordinate)> + '_ {
        self.stop_info
            .iter()
            .enumerate()
            .filter_map(|(index, info)| Some((StopIdx::from_index(index), info.coordinate?)))
    }

    /// Walkable start stops around `origin`, already on the departure clock.
    pub fn seeds_from(
        &self,
        origin: Coordinate,
        config: &IsochroneConfig,
    ) -> Result<SeedSet, ConfigError> {
        let projection = config.projection_for(origin)?;
        let seeds = find_start_stops(
            self.located_stops(),
            origin,
            &config.walk_params(),
            &projection,
        );
        Ok(seeds.departing_at(config.departure_time_min))
    }

    pub fn reach_from(
        &self,
        origin: Coordinate,
        config: &IsochroneConfig,
    ) -> Result<Reachable, ConfigError> {
        let seeds = self.seeds_from(origin, config)?;
        Ok(reachable_stops(&self.index, &seeds, &config.query()))
    }

    /// One search per origin on the rayon pool, results in `origins` order.
    pub fn reach_from_all(
        &self,
        origins: &[Coordinate],
        config: &IsochroneConfig,
    ) -> Result<Vec<Reachable>, ConfigError> {
        origins
            .par_iter()
            .map(|&origin| self.reach_from(origin, config))
            .collect()
    }
}
