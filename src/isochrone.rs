//! Search results keyed by GTFS identifiers, for downstream geometry.

use std::collections::BTreeMap;

use geo::{ConvexHull, MultiPoint, Point, Polygon};
use geojson::JsonValue;

use crate::{
    search::Reachable,
    seed::Coordinate,
    time::{self, Minutes},
    timetable::Timetable,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Via {
    pub stop_id: String,
    pub trip_id: String,
}

/// Earliest arrivals and predecessors by `stop_id`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReachableStops {
    pub arrivals: BTreeMap<String, Minutes>,
    /// Absent for stops reached on foot from the origin.
    pub parents: BTreeMap<String, Via>,
}

/// A reachable stop joined with its position.
#[derive(Debug, Clone, PartialEq)]
pub struct ReachableStop {
    pub stop_id: String,
    pub stop_name: Option<String>,
    pub coordinate: Coordinate,
    pub arrival_min: Minutes,
    pub via: Option<Via>,
}

impl ReachableStop {
    /// Arrival as a wall-clock `HH:MM:SS`.
    pub fn arrival_clock(&self) -> String {
        time::format_clock(time::wrap_day(self.arrival_min))
    }
}

impl ReachableStops {
    pub fn from_search(reachable: &Reachable, timetable: &Timetable) -> Self {
        let mut result = Self::default();

        for (stop, label) in reachable.iter() {
            let Some(stop_id) = timetable.stop_id(stop) else {
                continue;
            };
            result.arrivals.insert(stop_id.to_owned(), label.arrival);

            let via = label.parent.and_then(|parent| {
                Some(Via {
                    stop_id: timetable.stop_id(parent.stop)?.to_owned(),
                    trip_id: timetable.trip_id(parent.trip)?.to_owned(),
                })
            });
            if let Some(via) = via {
                result.parents.insert(stop_id.to_owned(), via);
            }
        }

        result
    }

    pub fn len(&self) -> usize {
        self.arrivals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arrivals.is_empty()
    }

    /// Only stops reached no later than `max_arrival`.
    pub fn within(&self, max_arrival: Minutes) -> Self {
        let arrivals: BTreeMap<String, Minutes> = self
            .arrivals
            .iter()
            .filter(|&(_, &arrival)| arrival <= max_arrival)
            .map(|(stop_id, &arrival)| (stop_id.clone(), arrival))
            .collect();
        let parents = self
            .parents
            .iter()
            .filter(|(stop_id, _)| arrivals.contains_key(*stop_id))
            .map(|(stop_id, via)| (stop_id.clone(), via.clone()))
            .collect();

        Self { arrivals, parents }
    }

    /// Stop ids from the walked-to start stop to `stop_id`, inclusive.
    pub fn route_to(&self, stop_id: &str) -> Vec<&str> {
        let Some((mut current, _)) = self.arrivals.get_key_value(stop_id) else {
            return Vec::new();
        };
        let mut route = vec![current.as_str()];

        while let Some(via) = self.parents.get(current) {
            current = &via.stop_id;
            route.push(current.as_str());
            if route.len() > self.arrivals.len() {
                break;
            }
        }

        route.reverse();
        route
    }

    /// Reachable stops with a known position, in `stop_id` order.
    pub fn located(&self, timetable: &Timetable) -> Vec<ReachableStop> {
        self.arrivals
            .iter()
            .filter_map(|(stop_id, &arrival_min)| {
                let stop = timetable.stop_idx(stop_id)?;
                Some(ReachableStop {
                    stop_id: stop_id.clone(),
                    stop_name: timetable.stop_name(stop).map(str::to_owned),
                    coordinate: timetable.coordinate(stop)?,
                    arrival_min,
                    via: self.parents.get(stop_id).cloned(),
                })
            })
            .collect()
    }

    /// Convex hull of the located reachable stops, in lon/lat.
    ///
    /// `None` when fewer than three stops have a position.
    pub fn hull(&self, timetable: &Timetable) -> Option<Polygon<f64>> {
        let points: Vec<Point<f64>> = self
            .located(timetable)
            .iter()
            .map(|stop| Point::new(stop.coordinate.lon, stop.coordinate.lat))
            .collect();
        if points.len() < 3 {
            return None;
        }

        Some(MultiPoint::from(points).convex_hull())
    }
}

/// GeoJSON feature for one origin's isochrone polygon.
pub fn hull_feature(
    origin: usize,
    coordinate: Coordinate,
    reachable: usize,
    hull: &Polygon<f64>,
) -> geojson::Feature {
    let mut properties: serde_json::Map<String, JsonValue> = serde_json::Map::new();
    properties.insert(String::from("origin"), JsonValue::from(origin));
    properties.insert(String::from("origin_lat"), JsonValue::from(coordinate.lat));
    properties.insert(String::from("origin_lon"), JsonValue::from(coordinate.lon));
    properties.insert(String::from("reachable"), JsonValue::from(reachable));

    geojson::Feature {
        bbox: None,
        geometry: Some(geojson::Geometry {
            bbox: None,
            value: geojson::Value::from(hull),
            foreign_members: None,
        }),
        id: Some(geojson::feature::Id::Number(origin.into())),
        properties: Some(properties),
        foreign_members: None,
    }
}
