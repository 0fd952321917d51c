//! Turns ordered trip visits into timed edges between consecutive stops.

use itertools::Itertools;
use tracing::{trace, warn};

use crate::{
    data::{Edge, Registry, StopIdx, TripIdx},
    error::ScheduleError,
    gtfs::StopTime,
    time::{self, Minutes},
};

#[derive(Debug, Default)]
pub struct EdgeSet {
    pub edges: Vec<Edge>,
    /// Consecutive visit pairs dropped because arrival preceded departure.
    pub discarded_negative: usize,
}

struct Visit {
    stop: StopIdx,
    arrival: Minutes,
    departure: Minutes,
}

/// Builds one edge per consecutive pair of visits of every trip.
///
/// Visits are ordered by `stop_sequence`; equal sequence numbers keep their
/// row order in `stop_times`. Trips are processed in `trip_id` order so the
/// output is independent of row interleaving.
pub fn build_edges(
    stop_times: &[StopTime],
    stops: &mut Registry<StopIdx>,
    trips: &mut Registry<TripIdx>,
) -> Result<EdgeSet, ScheduleError> {
    let mut edge_set = EdgeSet::default();
    let mut duplicated_sequences = 0;

    let by_trip = stop_times
        .iter()
        .map(|stop_time| (stop_time.trip_id.as_str(), stop_time))
        .into_group_map();

    for (trip_id, mut group) in by_trip.into_iter().sorted_by(|a, b| a.0.cmp(b.0)) {
        // group_map keeps row order, so a stable sort leaves ties in row order
        group.sort_by_key(|stop_time| stop_time.stop_sequence);
        duplicated_sequences += group
            .iter()
            .tuple_windows()
            .filter(|(a, b)| a.stop_sequence == b.stop_sequence)
            .count();

        let trip = trips.intern(trip_id);
        let visits = group
            .iter()
            .map(|stop_time| decode_visit(stop_time, stops))
            .collect::<Result<Vec<_>, _>>()?;

        let before = edge_set.edges.len();
        for (from, to) in visits.iter().tuple_windows() {
            match Edge::new(trip, from.stop, to.stop, from.departure, to.arrival) {
                Some(edge) => edge_set.edges.push(edge),
                None => edge_set.discarded_negative += 1,
            }
        }
        trace!(
            trip_id,
            visits = visits.len(),
            edges = edge_set.edges.len() - before,
            "built trip edges"
        );
    }

    if duplicated_sequences > 0 {
        warn!(
            duplicated_sequences,
            "stop_times has repeated stop_sequence values within a trip, kept in row order"
        );
    }
    if edge_set.discarded_negative > 0 {
        warn!(
            discarded = edge_set.discarded_negative,
            "discarded edges with negative travel time"
        );
    }

    Ok(edge_set)
}

fn decode_visit(
    stop_time: &StopTime,
    stops: &mut Registry<StopIdx>,
) -> Result<Visit, ScheduleError> {
    let invalid = |source| ScheduleError::InvalidTime {
        trip_id: stop_time.trip_id.clone(),
        stop_sequence: stop_time.stop_sequence,
        source,
    };

    Ok(Visit {
        stop: stops.intern(&stop_time.stop_id),
        arrival: time::decode(&stop_time.arrival_time).map_err(invalid)?,
        departure: time::decode(&stop_time.departure_time).map_err(invalid)?,
    })
}
