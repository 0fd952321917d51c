//! Outgoing edges grouped by origin stop.
//!
//! Stored as one flat array of [`Connection`]s with per-stop offsets, so
//! expanding a stop is a slice lookup. The index is never mutated after
//! [`AdjacencyIndex::build`] and can be shared freely between searches.

use crate::{
    data::{DenseId, Edge, StopIdx, TripIdx},
    time::Minutes,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Connection {
    pub to: StopIdx,
    pub departure: Minutes,
    pub arrival: Minutes,
    pub travel_time: Minutes,
    pub trip: TripIdx,
}

impl From<&Edge> for Connection {
    fn from(edge: &Edge) -> Self {
        Self {
            to: edge.to,
            departure: edge.departure,
            arrival: edge.arrival,
            travel_time: edge.travel_time,
            trip: edge.trip,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AdjacencyIndex {
    offsets: Vec<usize>,
    connections: Vec<Connection>,
}

impl AdjacencyIndex {
    /// `stop_count` is a lower bound; stops referenced by `edges` beyond it
    /// are still indexed.
    pub fn build(edges: &[Edge], stop_count: usize) -> Self {
        let stop_count = edges
            .iter()
            .flat_map(|edge| [edge.from.index() + 1, edge.to.index() + 1])
            .fold(stop_count, usize::max);

        let mut offsets = vec![0; stop_count + 1];
        for edge in edges {
            offsets[edge.from.index() + 1] += 1;
        }
        for stop in 0..stop_count {
            offsets[stop + 1] += offsets[stop];
        }

        // slots[stop] is the next free position in that stop's range
        let mut slots = offsets[..stop_count].to_vec();
        let mut connections = vec![None; edges.len()];
        for edge in edges {
            let slot = &mut slots[edge.from.index()];
            connections[*slot] = Some(Connection::from(edge));
            *slot += 1;
        }

        Self {
            offsets,
            connections: connections.into_iter().flatten().collect(),
        }
    }

    /// Edges leaving `stop`, in edge-set order. Unknown stops have none.
    pub fn outgoing(&self, stop: StopIdx) -> &[Connection] {
        let index = stop.index();
        match (self.offsets.get(index), self.offsets.get(index + 1)) {
            (Some(&start), Some(&end)) => &self.connections[start..end],
            _ => &[],
        }
    }

    pub fn stop_count(&self) -> usize {
        self.offsets.len().saturating_sub(1)
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}
