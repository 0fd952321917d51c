use std::{fs::File, io, path::PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use tracing::{info, warn};

use transit_reach::{
    gtfs::Feed, isochrone::hull_feature, time, Coordinate, IsochroneConfig, Outcome,
    ReachableStop, ReachableStops, Timetable,
};

mod logger;

/// Stops reachable by public transit within a time budget.
#[derive(Parser, Debug)]
#[command(name = "transit-reach", version)]
struct Cli {
    /// GTFS feed directory containing stops.txt and stop_times.txt
    feed: PathBuf,

    /// Origin as LAT,LON; repeat for several origins
    #[arg(long = "origin", required = true)]
    origins: Vec<Coordinate>,

    /// Walking radius around each origin in metres
    #[arg(long, default_value_t = IsochroneConfig::default().walk_radius_m)]
    radius: f64,

    /// Walking speed in km/h
    #[arg(long, default_value_t = IsochroneConfig::default().walk_speed_kmh)]
    speed: f64,

    /// Departure time as H:M:S on the service day
    #[arg(long, default_value = "08:30:00")]
    depart: String,

    /// Travel time budget in minutes
    #[arg(long, default_value_t = IsochroneConfig::default().max_travel_time_min)]
    budget: f64,

    /// Only report stops reached within this many minutes of departure
    #[arg(long)]
    within: Option<f64>,

    /// Stop each search after settling this many queue entries
    #[arg(long)]
    max_iterations: Option<usize>,

    /// Measure walking distances in this UTM zone instead of the origin's own
    #[arg(long)]
    utm_zone: Option<u8>,

    /// Write CSV here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Write each origin's convex-hull isochrone here as GeoJSON
    #[arg(long)]
    hull: Option<PathBuf>,
}

impl Cli {
    fn config(&self) -> Result<IsochroneConfig> {
        let departure = time::decode(&self.depart)
            .with_context(|| format!("invalid --depart {:?}", self.depart))?;

        Ok(IsochroneConfig {
            walk_radius_m: self.radius,
            walk_speed_kmh: self.speed,
            departure_time_min: departure,
            max_travel_time_min: self.budget,
            max_iterations: self.max_iterations,
            utm_zone: self.utm_zone,
        })
    }
}

#[derive(Serialize)]
struct Row<'a> {
    origin: usize,
    stop_id: &'a str,
    stop_name: Option<&'a str>,
    stop_lat: f64,
    stop_lon: f64,
    arrival_min: f64,
    arrival_time: String,
    via_stop_id: Option<&'a str>,
    via_trip_id: Option<&'a str>,
}

impl<'a> Row<'a> {
    fn new(origin: usize, stop: &'a ReachableStop) -> Self {
        Self {
            origin,
            stop_id: &stop.stop_id,
            stop_name: stop.stop_name.as_deref(),
            stop_lat: stop.coordinate.lat,
            stop_lon: stop.coordinate.lon,
            arrival_min: stop.arrival_min,
            arrival_time: stop.arrival_clock(),
            via_stop_id: stop.via.as_ref().map(|via| via.stop_id.as_str()),
            via_trip_id: stop.via.as_ref().map(|via| via.trip_id.as_str()),
        }
    }
}

fn main() -> Result<()> {
    logger::init_logger();
    let cli = Cli::parse();
    let config = cli.config()?;

    let feed = Feed::load(&cli.feed)
        .with_context(|| format!("failed to load GTFS feed {}", cli.feed.display()))?;
    let timetable = Timetable::from_feed(&feed)?;
    drop(feed);

    let results = timetable.reach_from_all(&cli.origins, &config)?;

    let writer: Box<dyn io::Write> = match &cli.output {
        Some(path) => Box::new(
            File::create(path).with_context(|| format!("cannot create {}", path.display()))?,
        ),
        None => Box::new(io::stdout().lock()),
    };
    let mut writer = csv::Writer::from_writer(writer);
    let mut hulls = Vec::new();

    for (origin_idx, (origin, reachable)) in cli.origins.iter().zip(&results).enumerate() {
        if reachable.outcome == Outcome::IterationCap {
            warn!(
                %origin,
                iterations = reachable.iterations,
                "search stopped at iteration cap, arrivals may not be earliest"
            );
        }

        let mut stops = ReachableStops::from_search(reachable, &timetable);
        if let Some(within) = cli.within {
            stops = stops.within(config.departure_time_min + within);
        }
        let located = stops.located(&timetable);
        info!(
            origin = origin_idx,
            coordinate = %origin,
            reachable = stops.len(),
            located = located.len(),
            "origin done"
        );

        for stop in &located {
            writer.serialize(Row::new(origin_idx, stop))?;
        }

        if cli.hull.is_some() {
            match stops.hull(&timetable) {
                Some(hull) => {
                    hulls.push(hull_feature(origin_idx, *origin, located.len(), &hull))
                }
                None => warn!(
                    origin = origin_idx,
                    "fewer than three located stops, no hull"
                ),
            }
        }
    }

    writer.flush()?;

    if let Some(path) = &cli.hull {
        let collection = geojson::FeatureCollection {
            bbox: None,
            features: hulls,
            foreign_members: None,
        };
        std::fs::write(path, geojson::GeoJson::from(collection).to_string())
            .with_context(|| format!("cannot write {}", path.display()))?;
    }
    Ok(())
}
