//! Raw GTFS records, read straight from the feed's CSV files.

use std::{
    fs::File,
    io,
    path::{Path, PathBuf},
};

use serde::{de::DeserializeOwned, Deserialize};
use tracing::info;

use crate::error::ScheduleError;

pub const STOPS_FILE: &str = "stops.txt";
pub const STOP_TIMES_FILE: &str = "stop_times.txt";

pub const STOP_COLUMNS: [&str; 3] = ["stop_id", "stop_lat", "stop_lon"];
pub const STOP_TIME_COLUMNS: [&str; 5] = [
    "trip_id",
    "stop_id",
    "stop_sequence",
    "arrival_time",
    "departure_time",
];

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct Stop {
    pub stop_id: String,
    #[serde(default)]
    pub stop_name: Option<String>,
    pub stop_lat: Option<f64>,
    pub stop_lon: Option<f64>,
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct StopTime {
    pub trip_id: String,
    pub arrival_time: String,
    pub departure_time: String,
    pub stop_id: String,
    pub stop_sequence: u32,
}

/// Fails with the full list of `required` columns absent from `headers`.
pub fn require_columns(
    headers: &csv::StringRecord,
    required: &[&str],
    file: &str,
) -> Result<(), ScheduleError> {
    let missing: Vec<String> = required
        .iter()
        .filter(|column| !headers.iter().any(|header| header == **column))
        .map(|column| column.to_string())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(ScheduleError::MissingColumns {
            file: file.to_owned(),
            missing,
        })
    }
}

fn deserialize_into<T: DeserializeOwned, R: io::Read>(
    reader: R,
    required: &[&str],
    file: &str,
) -> Result<Vec<T>, ScheduleError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    require_columns(reader.headers()?, required, file)?;

    reader
        .deserialize()
        .map(|parse_result| parse_result.map_err(ScheduleError::from))
        .collect()
}

pub fn read_stops<R: io::Read>(reader: R) -> Result<Vec<Stop>, ScheduleError> {
    deserialize_into(reader, &STOP_COLUMNS, STOPS_FILE)
}

pub fn read_stop_times<R: io::Read>(reader: R) -> Result<Vec<StopTime>, ScheduleError> {
    deserialize_into(reader, &STOP_TIME_COLUMNS, STOP_TIMES_FILE)
}

fn open_error(path: PathBuf, source: io::Error) -> ScheduleError {
    match source.kind() {
        io::ErrorKind::NotFound => ScheduleError::MissingFile(path),
        _ => ScheduleError::Io { path, source },
    }
}

fn open(dir: &Path, file: &str) -> Result<File, ScheduleError> {
    let path = dir.join(file);
    File::open(&path).map_err(|source| open_error(path, source))
}

/// The slice of a GTFS feed the router needs.
#[derive(Debug, Default)]
pub struct Feed {
    pub stops: Vec<Stop>,
    pub stop_times: Vec<StopTime>,
}

impl Feed {
    pub fn load(dir: &Path) -> Result<Self, ScheduleError> {
        let stops = read_stops(open(dir, STOPS_FILE)?)?;
        let stop_times = read_stop_times(open(dir, STOP_TIMES_FILE)?)?;
        info!(
            feed = %dir.display(),
            stops = stops.len(),
            stop_times = stop_times.len(),
            "loaded GTFS feed"
        );

        Ok(Self { stops, stop_times })
    }
}
