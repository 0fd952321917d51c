//! Multi-source earliest-arrival search with a hard arrival horizon.
//!
//! A Dijkstra variant over the time-expanded graph: a connection can only
//! be taken if it departs no earlier than the traveller reaches its stop,
//! and only if it arrives by `departure + max_travel_time`. Waiting at a
//! stop is unrestricted. Labels are settled in `(arrival, stop)` order so
//! equal arrival times resolve the same way on every run.

use std::{
    cmp::{Ordering, Reverse},
    collections::BinaryHeap,
};

use tracing::debug;

use crate::{
    adjacency::AdjacencyIndex,
    data::{DenseId, StopIdx, TripIdx},
    seed::SeedSet,
    time::Minutes,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Query {
    /// Clock time that seed time 0 corresponds to.
    pub departure: Minutes,
    pub max_travel_time: Minutes,
    /// Stop after settling this many queue entries.
    pub max_iterations: Option<usize>,
}

impl Query {
    pub fn new(departure: Minutes, max_travel_time: Minutes) -> Self {
        Self {
            departure,
            max_travel_time,
            max_iterations: None,
        }
    }

    pub fn with_max_iterations(self, max_iterations: usize) -> Self {
        Self {
            max_iterations: Some(max_iterations),
            ..self
        }
    }

    /// Latest arrival any label may carry.
    pub fn horizon(&self) -> Minutes {
        self.departure + self.max_travel_time
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Parent {
    pub stop: StopIdx,
    pub trip: TripIdx,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Label {
    pub arrival: Minutes,
    /// `None` for seeds.
    pub parent: Option<Parent>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The queue ran dry; every label is optimal.
    Exhausted,
    /// `max_iterations` was hit; labels are valid arrivals but may not be minimal.
    IterationCap,
}

#[derive(Debug, Clone, Copy)]
struct QueueItem {
    arrival: Minutes,
    stop: StopIdx,
}

impl PartialEq for QueueItem {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for QueueItem {}

impl PartialOrd for QueueItem {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueueItem {
    fn cmp(&self, other: &Self) -> Ordering {
        self.arrival
            .total_cmp(&other.arrival)
            .then_with(|| self.stop.cmp(&other.stop))
    }
}

#[derive(Debug)]
pub struct Search<'a> {
    index: &'a AdjacencyIndex,
    horizon: Minutes,
    max_iterations: Option<usize>,

    labels: Vec<Option<Label>>,
    queue: BinaryHeap<Reverse<QueueItem>>,
    iterations: usize,
}

impl<'a> Search<'a> {
    /// Seeds arriving after the horizon are dropped here.
    pub fn new(index: &'a AdjacencyIndex, seeds: &SeedSet, query: &Query) -> Self {
        let horizon = query.horizon();
        let stop_count = seeds
            .iter()
            .map(|(stop, _)| stop.index() + 1)
            .fold(index.stop_count(), usize::max);

        let mut search = Self {
            index,
            horizon,
            max_iterations: query.max_iterations,
            labels: vec![None; stop_count],
            queue: BinaryHeap::new(),
            iterations: 0,
        };

        for (stop, arrival) in seeds.iter().filter(|&(_, arrival)| arrival <= horizon) {
            search.labels[stop.index()] = Some(Label {
                arrival,
                parent: None,
            });
            search.queue.push(Reverse(QueueItem { arrival, stop }));
        }

        search
    }

    fn best_arrival(&self, stop: StopIdx) -> Minutes {
        self.labels[stop.index()].map_or(Minutes::INFINITY, |label| label.arrival)
    }

    /// Settles the next queue entry. Returns `false` once the queue is empty.
    pub fn step(&mut self) -> bool {
        let Some(Reverse(QueueItem { arrival: time, stop })) = self.queue.pop() else {
            return false;
        };
        self.iterations += 1;

        if time > self.best_arrival(stop) {
            return true;
        }

        let index = self.index;
        for connection in index.outgoing(stop) {
            if connection.departure < time || connection.arrival > self.horizon {
                continue;
            }
            if connection.arrival < self.best_arrival(connection.to) {
                self.labels[connection.to.index()] = Some(Label {
                    arrival: connection.arrival,
                    parent: Some(Parent {
                        stop,
                        trip: connection.trip,
                    }),
                });
                self.queue.push(Reverse(QueueItem {
                    arrival: connection.arrival,
                    stop: connection.to,
                }));
            }
        }

        true
    }

    pub fn run(mut self) -> Reachable {
        let seeded = self.queue.len();
        let mut outcome = Outcome::Exhausted;

        loop {
            if self
                .max_iterations
                .is_some_and(|max| self.iterations >= max)
                && !self.queue.is_empty()
            {
                outcome = Outcome::IterationCap;
                break;
            }
            if !self.step() {
                break;
            }
        }

        let reachable = Reachable {
            labels: self.labels,
            outcome,
            iterations: self.iterations,
        };
        debug!(
            seeded,
            horizon = self.horizon,
            reached = reachable.len(),
            iterations = reachable.iterations,
            ?outcome,
            "search finished"
        );
        reachable
    }
}

/// One ride on a path back to a seed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hop {
    pub from: StopIdx,
    pub to: StopIdx,
    pub trip: TripIdx,
    pub arrival: Minutes,
}

/// Labels of every stop reached by a search.
#[derive(Debug, Clone)]
pub struct Reachable {
    labels: Vec<Option<Label>>,
    pub outcome: Outcome,
    pub iterations: usize,
}

impl Reachable {
    pub fn label(&self, stop: StopIdx) -> Option<&Label> {
        self.labels.get(stop.index())?.as_ref()
    }

    pub fn arrival(&self, stop: StopIdx) -> Option<Minutes> {
        self.label(stop).map(|label| label.arrival)
    }

    pub fn parent(&self, stop: StopIdx) -> Option<Parent> {
        self.label(stop)?.parent
    }

    pub fn iter(&self) -> impl Iterator<Item = (StopIdx, &Label)> {
        self.labels
            .iter()
            .enumerate()
            .filter_map(|(index, label)| Some((StopIdx::from_index(index), label.as_ref()?)))
    }

    pub fn len(&self) -> usize {
        self.labels.iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Rides from a seed to `stop`, first hop first. Empty for seeds and
    /// unreached stops.
    pub fn path_to(&self, stop: StopIdx) -> Vec<Hop> {
        let mut hops = Vec::new();
        let mut current = stop;

        while let Some(label) = self.label(current) {
            let Some(parent) = label.parent else { break };
            hops.push(Hop {
                from: parent.stop,
                to: current,
                trip: parent.trip,
                arrival: label.arrival,
            });
            current = parent.stop;

            if hops.len() > self.labels.len() {
                break;
            }
        }

        hops.reverse();
        hops
    }
}

/// Runs a search to completion.
pub fn reachable_stops(index: &AdjacencyIndex, seeds: &SeedSet, query: &Query) -> Reachable {
    Search::new(index, seeds, query).run()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Edge;

    const A: StopIdx = StopIdx(0);
    const B: StopIdx = StopIdx(1);
    const C: StopIdx = StopIdx(2);
    const D: StopIdx = StopIdx(3);

    fn edge(trip: u32, from: StopIdx, to: StopIdx, dep: Minutes, arr: Minutes) -> Edge {
        Edge::new(TripIdx(trip), from, to, dep, arr).unwrap()
    }

    fn seeds(pairs: &[(StopIdx, Minutes)]) -> SeedSet {
        pairs.iter().copied().collect()
    }

    fn line() -> AdjacencyIndex {
        AdjacencyIndex::build(
            &[edge(7, A, B, 0.0, 10.0), edge(8, B, C, 15.0, 25.0)],
            3,
        )
    }

    fn arrivals(reachable: &Reachable) -> Vec<(StopIdx, Minutes)> {
        reachable
            .iter()
            .map(|(stop, label)| (stop, label.arrival))
            .collect()
    }

    #[test]
    fn reaches_along_a_line() {
        let index = line();
        let reachable = reachable_stops(&index, &seeds(&[(A, 0.0)]), &Query::new(0.0, 30.0));

        assert_eq!(arrivals(&reachable), vec![(A, 0.0), (B, 10.0), (C, 25.0)]);
        assert_eq!(reachable.parent(A), None);
        assert_eq!(reachable.parent(B), Some(Parent { stop: A, trip: TripIdx(7) }));
        assert_eq!(reachable.parent(C), Some(Parent { stop: B, trip: TripIdx(8) }));
        assert_eq!(reachable.outcome, Outcome::Exhausted);
    }

    #[test]
    fn horizon_prunes_late_arrivals() {
        let index = line();
        let reachable = reachable_stops(&index, &seeds(&[(A, 0.0)]), &Query::new(0.0, 5.0));

        assert_eq!(arrivals(&reachable), vec![(A, 0.0)]);
        assert_eq!(reachable.arrival(B), None);
        assert_eq!(reachable.arrival(C), None);
    }

    #[test]
    fn horizon_is_inclusive() {
        let index = line();
        let reachable = reachable_stops(&index, &seeds(&[(A, 0.0)]), &Query::new(0.0, 25.0));
        assert_eq!(reachable.arrival(C), Some(25.0));
    }

    #[test]
    fn horizon_is_relative_to_departure() {
        let index = AdjacencyIndex::build(&[edge(0, A, B, 515.0, 530.0)], 2);
        let seeds = seeds(&[(A, 2.0)]).departing_at(510.0);

        let reachable = reachable_stops(&index, &seeds, &Query::new(510.0, 20.0));
        assert_eq!(reachable.arrival(A), Some(512.0));
        assert_eq!(reachable.arrival(B), Some(530.0));

        let reachable = reachable_stops(&index, &seeds, &Query::new(510.0, 19.0));
        assert_eq!(reachable.arrival(B), None);
    }

    #[test]
    fn seeds_past_horizon_are_dropped() {
        let index = line();
        let reachable = reachable_stops(
            &index,
            &seeds(&[(A, 0.0), (B, 12.0)]),
            &Query::new(0.0, 11.0),
        );

        assert_eq!(arrivals(&reachable), vec![(A, 0.0), (B, 10.0)]);
    }

    #[test]
    fn cannot_board_before_arriving() {
        // B is reached at 10, the B->C departure at 9 has already left
        let index = AdjacencyIndex::build(
            &[edge(0, A, B, 0.0, 10.0), edge(1, B, C, 9.0, 12.0)],
            3,
        );
        let reachable = reachable_stops(&index, &seeds(&[(A, 0.0)]), &Query::new(0.0, 60.0));

        assert_eq!(reachable.arrival(B), Some(10.0));
        assert_eq!(reachable.arrival(C), None);
    }

    #[test]
    fn boarding_at_arrival_time_is_allowed() {
        let index = AdjacencyIndex::build(
            &[edge(0, A, B, 0.0, 10.0), edge(1, B, C, 10.0, 12.0)],
            3,
        );
        let reachable = reachable_stops(&index, &seeds(&[(A, 0.0)]), &Query::new(0.0, 60.0));
        assert_eq!(reachable.arrival(C), Some(12.0));
    }

    #[test]
    fn parallel_trips_pick_earliest_feasible() {
        let index = AdjacencyIndex::build(
            &[
                edge(0, A, B, 0.0, 30.0),
                edge(1, A, B, 5.0, 20.0),
                edge(2, A, B, 1.0, 15.0),
            ],
            2,
        );
        let reachable = reachable_stops(&index, &seeds(&[(A, 2.0)]), &Query::new(0.0, 60.0));

        assert_eq!(reachable.arrival(B), Some(20.0));
        assert_eq!(reachable.parent(B), Some(Parent { stop: A, trip: TripIdx(1) }));
    }

    #[test]
    fn equal_arrivals_settle_lower_stop_first() {
        // B and C are both reached at 10 and both reach D at 20; A->C is
        // listed first, but B has the lower index and relaxes D first
        let index = AdjacencyIndex::build(
            &[
                edge(0, A, C, 0.0, 10.0),
                edge(1, A, B, 0.0, 10.0),
                edge(2, C, D, 10.0, 20.0),
                edge(3, B, D, 10.0, 20.0),
            ],
            4,
        );
        let reachable = reachable_stops(&index, &seeds(&[(A, 0.0)]), &Query::new(0.0, 30.0));

        assert_eq!(reachable.arrival(D), Some(20.0));
        assert_eq!(reachable.parent(D), Some(Parent { stop: B, trip: TripIdx(3) }));
        assert_eq!(
            reachable.path_to(D).iter().map(|hop| hop.from).collect::<Vec<_>>(),
            vec![A, B]
        );
    }

    #[test]
    fn queue_orders_by_arrival_then_stop() {
        let item = |arrival, stop| QueueItem {
            arrival,
            stop: StopIdx(stop),
        };

        assert!(item(10.0, 1) < item(10.0, 2));
        assert!(item(9.0, 5) < item(10.0, 1));

        let mut queue: BinaryHeap<_> = [item(10.0, 2), item(10.0, 1), item(5.0, 3)]
            .into_iter()
            .map(Reverse)
            .collect();
        let order: Vec<_> = std::iter::from_fn(|| queue.pop().map(|Reverse(item)| item.stop))
            .collect();
        assert_eq!(order, vec![D, B, C]);
    }

    #[test]
    fn multiple_seeds_compete() {
        let index = AdjacencyIndex::build(
            &[edge(0, A, C, 0.0, 20.0), edge(1, B, C, 5.0, 12.0)],
            3,
        );
        let reachable = reachable_stops(
            &index,
            &seeds(&[(A, 0.0), (B, 4.0)]),
            &Query::new(0.0, 30.0),
        );

        assert_eq!(reachable.arrival(C), Some(12.0));
        assert_eq!(reachable.parent(C), Some(Parent { stop: B, trip: TripIdx(1) }));
    }

    #[test]
    fn later_improvement_replaces_label() {
        // A->C direct is slow, A->B->C via an earlier queue entry is faster
        let index = AdjacencyIndex::build(
            &[
                edge(0, A, C, 1.0, 40.0),
                edge(1, A, B, 1.0, 5.0),
                edge(2, B, C, 6.0, 10.0),
            ],
            3,
        );
        let reachable = reachable_stops(&index, &seeds(&[(A, 0.0)]), &Query::new(0.0, 60.0));

        assert_eq!(reachable.arrival(C), Some(10.0));
        assert_eq!(
            reachable.path_to(C),
            vec![
                Hop { from: A, to: B, trip: TripIdx(1), arrival: 5.0 },
                Hop { from: B, to: C, trip: TripIdx(2), arrival: 10.0 },
            ]
        );
    }

    #[test]
    fn unreached_and_seed_paths_are_empty() {
        let index = line();
        let reachable = reachable_stops(&index, &seeds(&[(A, 0.0)]), &Query::new(0.0, 30.0));

        assert!(reachable.path_to(A).is_empty());
        assert!(reachable.path_to(D).is_empty());
        assert_eq!(reachable.label(D), None);
    }

    #[test]
    fn seeds_outside_the_index_are_labelled() {
        let index = AdjacencyIndex::build(&[], 0);
        let reachable = reachable_stops(&index, &seeds(&[(D, 3.0)]), &Query::new(0.0, 10.0));
        assert_eq!(arrivals(&reachable), vec![(D, 3.0)]);
    }

    #[test]
    fn iteration_cap_returns_partial_labels() {
        let index = line();
        let reachable = reachable_stops(
            &index,
            &seeds(&[(A, 0.0)]),
            &Query::new(0.0, 30.0).with_max_iterations(1),
        );

        assert_eq!(reachable.outcome, Outcome::IterationCap);
        assert_eq!(reachable.iterations, 1);
        assert_eq!(arrivals(&reachable), vec![(A, 0.0), (B, 10.0)]);
    }

    #[test]
    fn iteration_cap_not_hit_when_queue_drains() {
        let index = line();
        let reachable = reachable_stops(
            &index,
            &seeds(&[(A, 0.0)]),
            &Query::new(0.0, 30.0).with_max_iterations(3),
        );

        assert_eq!(reachable.outcome, Outcome::Exhausted);
        assert_eq!(reachable.len(), 3);
    }

    #[test]
    fn searches_share_one_index_across_threads() {
        let index = line();
        let results: Vec<_> = std::thread::scope(|scope| {
            let handles: Vec<_> = [30.0, 5.0, 12.0]
                .into_iter()
                .map(|budget| {
                    let index = &index;
                    scope.spawn(move || {
                        reachable_stops(index, &seeds(&[(A, 0.0)]), &Query::new(0.0, budget)).len()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(results, vec![3, 1, 2]);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        fn graph() -> impl Strategy<Value = Vec<Edge>> {
            prop::collection::vec((0u32..6, 0u32..6, 0u32..100, 0u32..20), 0..30).prop_map(
                |raw| {
                    raw.into_iter()
                        .enumerate()
                        .map(|(trip, (from, to, dep, ride))| {
                            edge(
                                trip as u32,
                                StopIdx(from),
                                StopIdx(to),
                                dep as Minutes,
                                (dep + ride) as Minutes,
                            )
                        })
                        .collect()
                },
            )
        }

        proptest! {
            #[test]
            fn labels_are_feasible_and_deterministic(
                edges in graph(),
                seed_times in prop::collection::vec((0u32..6, 0u32..50), 1..4),
                budget in 0u32..120,
            ) {
                let index = AdjacencyIndex::build(&edges, 6);
                let seeds: SeedSet = seed_times
                    .iter()
                    .map(|&(stop, time)| (StopIdx(stop), time as Minutes))
                    .collect();
                let query = Query::new(0.0, budget as Minutes);

                let first = reachable_stops(&index, &seeds, &query);
                let second = reachable_stops(&index, &seeds, &query);
                prop_assert_eq!(
                    first.iter().map(|(s, l)| (s, *l)).collect::<Vec<_>>(),
                    second.iter().map(|(s, l)| (s, *l)).collect::<Vec<_>>()
                );

                for (stop, label) in first.iter() {
                    prop_assert!(label.arrival <= query.horizon());
                    match label.parent {
                        None => prop_assert_eq!(seeds.get(stop), Some(label.arrival)),
                        Some(parent) => {
                            let from = first.arrival(parent.stop).unwrap();
                            let used = index
                                .outgoing(parent.stop)
                                .iter()
                                .any(|c| c.to == stop
                                    && c.trip == parent.trip
                                    && c.departure >= from
                                    && c.arrival == label.arrival);
                            prop_assert!(used);
                        }
                    }
                }
            }

            #[test]
            fn no_feasible_edge_improves_a_label(
                edges in graph(),
                seed_times in prop::collection::vec((0u32..6, 0u32..50), 1..4),
                budget in 0u32..120,
            ) {
                let index = AdjacencyIndex::build(&edges, 6);
                let seeds: SeedSet = seed_times
                    .iter()
                    .map(|&(stop, time)| (StopIdx(stop), time as Minutes))
                    .collect();
                let query = Query::new(0.0, budget as Minutes);
                let reachable = reachable_stops(&index, &seeds, &query);

                for edge in &edges {
                    let Some(at_from) = reachable.arrival(edge.from) else { continue };
                    if edge.departure >= at_from && edge.arrival <= query.horizon() {
                        let at_to = reachable.arrival(edge.to);
                        prop_assert!(at_to.is_some_and(|t| t <= edge.arrival));
                    }
                }
            }
        }
    }
}
