use std::{collections::HashMap, fmt};

use crate::time::Minutes;

/// Dense index types handed out by a [`Registry`].
pub trait DenseId: Copy + Eq + Ord + fmt::Debug {
    fn from_index(index: usize) -> Self;
    fn index(self) -> usize;
}

macro_rules! dense_id {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub u32);

        impl DenseId for $name {
            fn from_index(index: usize) -> Self {
                Self(index as u32)
            }

            fn index(self) -> usize {
                self.0 as usize
            }
        }
    };
}

dense_id!(StopIdx);
dense_id!(TripIdx);

/// Interns string identifiers into dense indices, with reverse lookup.
#[derive(Debug, Clone)]
pub struct Registry<I> {
    ids: Vec<String>,
    lookup: HashMap<String, I>,
}

impl<I: DenseId> Default for Registry<I> {
    fn default() -> Self {
        Self {
            ids: Vec::new(),
            lookup: HashMap::new(),
        }
    }
}

impl<I: DenseId> Registry<I> {
    pub fn intern(&mut self, id: &str) -> I {
        if let Some(&idx) = self.lookup.get(id) {
            return idx;
        }
        let idx = I::from_index(self.ids.len());
        self.ids.push(id.to_owned());
        self.lookup.insert(id.to_owned(), idx);
        idx
    }

    pub fn get(&self, id: &str) -> Option<I> {
        self.lookup.get(id).copied()
    }

    pub fn resolve(&self, idx: I) -> Option<&str> {
        self.ids.get(idx.index()).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (I, &str)> {
        self.ids
            .iter()
            .enumerate()
            .map(|(index, id)| (I::from_index(index), id.as_str()))
    }
}

/// One ride between two consecutive visits of a trip.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Edge {
    pub trip: TripIdx,
    pub from: StopIdx,
    pub to: StopIdx,
    pub departure: Minutes,
    pub arrival: Minutes,
    pub travel_time: Minutes,
}

impl Edge {
    /// Returns `None` when the arrival precedes the departure.
    pub fn new(
        trip: TripIdx,
        from: StopIdx,
        to: StopIdx,
        departure: Minutes,
        arrival: Minutes,
    ) -> Option<Self> {
        let travel_time = arrival - departure;
        (travel_time >= 0.0).then_some(Self {
            trip,
            from,
            to,
            departure,
            arrival,
            travel_time,
        })
    }
}
