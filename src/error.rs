use std::{io, path::PathBuf};

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TimeFormatError {
    #[error("expected a H:M:S time, got {0:?}")]
    Malformed(String),
}

#[derive(Error, Debug)]
pub enum ScheduleError {
    #[error("{file} is missing required columns {missing:?}")]
    MissingColumns { file: String, missing: Vec<String> },

    #[error("missing GTFS file {0:?}")]
    MissingFile(PathBuf),

    #[error("cannot read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid time on Trip {trip_id:?} at stop_sequence {stop_sequence}: {source}")]
    InvalidTime {
        trip_id: String,
        stop_sequence: u32,
        #[source]
        source: TimeFormatError,
    },

    #[error(transparent)]
    Csv(#[from] csv::Error),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("UTM zone {0} is outside 1..=60")]
    InvalidUtmZone(u8),

    #[error("invalid coordinate {0:?}, expected LAT,LON")]
    InvalidCoordinate(String),
}
