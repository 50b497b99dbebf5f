// Copyright 2026 Viktor Reusch
//
// This file is part of geojson_gpx_convert.
//
// geojson_gpx_convert is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or (at your
// option) any later version.
//
// geojson_gpx_convert is distributed in the hope that it will be useful, but
// WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or
// FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License
// for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with geojson_gpx_convert. If not, see <https://www.gnu.org/licenses/>.

//! Batched elevation enrichment via the
//! [Open-Meteo elevation API](https://open-meteo.com/en/docs/elevation-api).
//!
//! Coordinates are queried in batches to keep the request count low. The
//! service is rate limited, so batches are retried with a growing backoff on
//! HTTP 429 and separated by a fixed throttle delay. When the service stays
//! unreachable, a deterministic synthetic elevation keeps the output usable.

use std::thread;
use std::time::Duration;

use gpx::Gpx;
use log::{info, warn};
use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::Deserialize;

use crate::extract::{PendingPoint, Slot};
use crate::Config;

/// Endpoint of the public Open-Meteo elevation API.
pub const OPEN_METEO_URL: &str = "https://api.open-meteo.com/v1/elevation";

/// Result of a single elevation lookup attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Elevations aligned positionally with the queried coordinates.
    Success(Vec<f64>),
    /// The service asked us to slow down (HTTP 429).
    RateLimited,
    /// Transport error, unexpected status, or unparsable body.
    Failure(String),
}

/// A service mapping coordinates to ground elevations.
///
/// Implemented by [`OpenMeteo`] for production use. Tests substitute scripted
/// lookups to stay offline.
pub trait ElevationLookup {
    /// Look up the elevations for the paired `lats`/`lons` lists.
    fn lookup(&self, lats: &[f64], lons: &[f64]) -> Outcome;
}

/// Blocking client for the Open-Meteo elevation API.
pub struct OpenMeteo {
    client: Client,
    url: String,
}

impl OpenMeteo {
    /// Create a client for the public endpoint.
    pub fn new() -> Self {
        Self::with_url(OPEN_METEO_URL)
    }

    /// Create a client for a custom endpoint, e.g. a local mock server.
    pub fn with_url(url: impl Into<String>) -> Self {
        OpenMeteo {
            client: Client::new(),
            url: url.into(),
        }
    }
}

impl Default for OpenMeteo {
    fn default() -> Self {
        Self::new()
    }
}

/// Response body of the elevation endpoint.
#[derive(Deserialize)]
struct Body {
    /// A missing array is treated like an empty result.
    #[serde(default)]
    elevation: Vec<f64>,
}

impl ElevationLookup for OpenMeteo {
    fn lookup(&self, lats: &[f64], lons: &[f64]) -> Outcome {
        let response = self
            .client
            .get(&self.url)
            .query(&[("latitude", join(lats)), ("longitude", join(lons))])
            .send();
        let response = match response {
            Ok(response) => response,
            Err(err) => return Outcome::Failure(err.to_string()),
        };

        match response.status() {
            StatusCode::TOO_MANY_REQUESTS => Outcome::RateLimited,
            status if !status.is_success() => {
                Outcome::Failure(format!("unexpected status {status}"))
            }
            _ => match response.json::<Body>() {
                Ok(body) => Outcome::Success(body.elevation),
                Err(err) => Outcome::Failure(err.to_string()),
            },
        }
    }
}

/// Join coordinates into the comma-separated list form of the API.
fn join(values: &[f64]) -> String {
    values
        .iter()
        .map(f64::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

/// Fetch an elevation for every pending point and write it into `gpx`.
///
/// The points are queried in batches of `config.batch_size`, with a pause of
/// `config.batch_delay` between consecutive batches. Every pending point
/// receives exactly one elevation, real or synthetic. An empty `pending` list
/// performs no lookup at all.
pub fn enrich(
    gpx: &mut Gpx,
    pending: &[PendingPoint],
    lookup: &dyn ElevationLookup,
    config: &Config,
) {
    if pending.is_empty() {
        return;
    }
    info!("fetching elevation for {} points", pending.len());

    for (index, batch) in pending.chunks(config.batch_size).enumerate() {
        if index > 0 {
            thread::sleep(config.batch_delay);
        }

        let elevations = fetch_batch(batch, lookup, config);
        for (point, elevation) in batch.iter().zip(elevations) {
            write_back(gpx, point, elevation);
        }
    }
}

/// Resolve one batch to a complete list of elevations.
///
/// Up to `config.retries` attempts are made. A rate-limit response waits
/// [`backoff_wait`] and consumes an attempt; any other failure retries
/// immediately, or falls back to [`synthetic_elevation`] on the last attempt.
/// If every attempt was rate limited, the batch is zero-filled as a final
/// default.
fn fetch_batch(
    batch: &[PendingPoint],
    lookup: &dyn ElevationLookup,
    config: &Config,
) -> Vec<f64> {
    let lats: Vec<_> = batch.iter().map(|p| p.lat).collect();
    let lons: Vec<_> = batch.iter().map(|p| p.lon).collect();

    for attempt in 0..config.retries {
        let last = attempt + 1 == config.retries;
        match lookup.lookup(&lats, &lons) {
            Outcome::Success(elevations) if elevations.len() >= batch.len() => {
                return elevations;
            }
            Outcome::Success(elevations) => {
                // A body without the elevation array parses as an empty list.
                warn!(
                    "lookup returned {} elevations for {} points (attempt {})",
                    elevations.len(),
                    batch.len(),
                    attempt + 1,
                );
                if last {
                    warn!("falling back to synthetic elevation data");
                    return synthetic_batch(batch);
                }
            }
            Outcome::RateLimited => {
                let wait = backoff_wait(config.backoff_unit, attempt);
                warn!("rate limited, waiting {}s", wait.as_secs_f64());
                thread::sleep(wait);
            }
            Outcome::Failure(reason) => {
                warn!("elevation lookup failed (attempt {}): {reason}", attempt + 1);
                if last {
                    warn!("falling back to synthetic elevation data");
                    return synthetic_batch(batch);
                }
            }
        }
    }

    // Every attempt was rate limited.
    vec![0.0; batch.len()]
}

/// Wait before the retry following rate-limited attempt number `attempt`.
fn backoff_wait(unit: Duration, attempt: u32) -> Duration {
    unit * (attempt + 1)
}

/// Deterministic placeholder elevation for `(lat, lon)`.
///
/// A crude terrain mock, not physically meaningful: a 1500 m base plus a
/// coordinate-dependent remainder below 1000 m.
pub fn synthetic_elevation(lat: f64, lon: f64) -> f64 {
    1500.0 + (lat * 10.0 + lon * 10.0).abs() % 1000.0
}

fn synthetic_batch(batch: &[PendingPoint]) -> Vec<f64> {
    batch
        .iter()
        .map(|p| synthetic_elevation(p.lat, p.lon))
        .collect()
}

/// Write one elevation into the slot recorded during extraction.
fn write_back(gpx: &mut Gpx, point: &PendingPoint, elevation: f64) {
    match point.slot {
        Slot::Track { track, point } => {
            gpx.tracks[track].segments[0].points[point].elevation = Some(elevation);
        }
        Slot::Waypoint { index } => {
            gpx.waypoints[index].elevation = Some(elevation);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};

    use super::*;
    use crate::extract::{extract, Extraction};
    use crate::geojson::{Feature, Geometry};

    /// Lookup returning a fixed script of outcomes, then echoing zeros.
    struct Scripted {
        outcomes: RefCell<Vec<Outcome>>,
        calls: Cell<u32>,
    }

    impl Scripted {
        fn new(outcomes: Vec<Outcome>) -> Self {
            Scripted {
                outcomes: RefCell::new(outcomes),
                calls: Cell::new(0),
            }
        }
    }

    impl ElevationLookup for Scripted {
        fn lookup(&self, lats: &[f64], _lons: &[f64]) -> Outcome {
            self.calls.set(self.calls.get() + 1);
            let mut outcomes = self.outcomes.borrow_mut();
            if outcomes.is_empty() {
                Outcome::Success(vec![0.0; lats.len()])
            } else {
                outcomes.remove(0)
            }
        }
    }

    /// Lookup handing out consecutive integers, recording batch sizes.
    struct Sequential {
        batch_sizes: RefCell<Vec<usize>>,
        next: Cell<f64>,
    }

    impl Sequential {
        fn new() -> Self {
            Sequential {
                batch_sizes: RefCell::new(vec![]),
                next: Cell::new(0.0),
            }
        }
    }

    impl ElevationLookup for Sequential {
        fn lookup(&self, lats: &[f64], _lons: &[f64]) -> Outcome {
            self.batch_sizes.borrow_mut().push(lats.len());
            let start = self.next.get();
            self.next.set(start + lats.len() as f64);
            Outcome::Success((0..lats.len()).map(|i| start + i as f64).collect())
        }
    }

    fn test_config() -> Config {
        Config {
            batch_delay: Duration::ZERO,
            backoff_unit: Duration::ZERO,
            ..Config::default()
        }
    }

    /// One track with `n` points at distinct coordinates.
    fn track_extraction(n: usize) -> Extraction {
        let coordinates = (0..n).map(|i| vec![i as f64, i as f64]).collect();
        extract(vec![Feature {
            geometry: Some(Geometry::LineString { coordinates }),
            properties: None,
        }])
    }

    fn track_elevations(gpx: &Gpx) -> Vec<f64> {
        gpx.tracks[0].segments[0]
            .points
            .iter()
            .map(|p| p.elevation.unwrap())
            .collect()
    }

    #[test]
    fn empty_input_makes_no_lookup() {
        let Extraction { mut gpx, pending } = track_extraction(0);
        let lookup = Scripted::new(vec![]);

        enrich(&mut gpx, &pending, &lookup, &test_config());

        assert_eq!(lookup.calls.get(), 0);
    }

    #[test]
    fn partitions_into_batches_of_at_most_fifty() {
        let Extraction { mut gpx, pending } = track_extraction(120);
        let lookup = Sequential::new();

        enrich(&mut gpx, &pending, &lookup, &test_config());

        assert_eq!(*lookup.batch_sizes.borrow(), vec![50, 50, 20]);
        // Concatenated batch results land in input order.
        let expected: Vec<f64> = (0..120).map(|i| i as f64).collect();
        assert_eq!(track_elevations(&gpx), expected);
    }

    #[test]
    fn single_point_batch_is_legal() {
        let Extraction { mut gpx, pending } = track_extraction(1);
        let lookup = Sequential::new();

        enrich(&mut gpx, &pending, &lookup, &test_config());

        assert_eq!(*lookup.batch_sizes.borrow(), vec![1]);
        assert_eq!(track_elevations(&gpx), vec![0.0]);
    }

    #[test]
    fn rate_limit_retries_and_keeps_real_values() {
        let Extraction { mut gpx, pending } = track_extraction(2);
        let lookup = Scripted::new(vec![
            Outcome::RateLimited,
            Outcome::Success(vec![812.0, 640.5]),
        ]);

        enrich(&mut gpx, &pending, &lookup, &test_config());

        assert_eq!(lookup.calls.get(), 2);
        assert_eq!(track_elevations(&gpx), vec![812.0, 640.5]);
    }

    #[test]
    fn failure_before_last_attempt_retries_immediately() {
        let Extraction { mut gpx, pending } = track_extraction(1);
        let lookup = Scripted::new(vec![
            Outcome::Failure("connection reset".to_string()),
            Outcome::Success(vec![333.0]),
        ]);

        enrich(&mut gpx, &pending, &lookup, &test_config());

        assert_eq!(lookup.calls.get(), 2);
        assert_eq!(track_elevations(&gpx), vec![333.0]);
    }

    #[test]
    fn failure_on_last_attempt_falls_back_to_synthetic() {
        let Extraction { mut gpx, pending } = track_extraction(2);
        let failure = || Outcome::Failure("unreachable".to_string());
        let lookup = Scripted::new(vec![failure(), failure(), failure()]);

        enrich(&mut gpx, &pending, &lookup, &test_config());

        assert_eq!(lookup.calls.get(), 3);
        let expected: Vec<f64> = pending
            .iter()
            .map(|p| synthetic_elevation(p.lat, p.lon))
            .collect();
        assert_eq!(track_elevations(&gpx), expected);
    }

    #[test]
    fn short_response_triggers_fallback_path() {
        let Extraction { mut gpx, pending } = track_extraction(3);
        let lookup = Scripted::new(vec![
            Outcome::Success(vec![]),
            Outcome::Success(vec![]),
            Outcome::Success(vec![]),
        ]);

        enrich(&mut gpx, &pending, &lookup, &test_config());

        assert_eq!(lookup.calls.get(), 3);
        let expected: Vec<f64> = pending
            .iter()
            .map(|p| synthetic_elevation(p.lat, p.lon))
            .collect();
        assert_eq!(track_elevations(&gpx), expected);
    }

    #[test]
    fn exhausted_rate_limits_zero_fill_the_batch() {
        let Extraction { mut gpx, pending } = track_extraction(2);
        let lookup = Scripted::new(vec![
            Outcome::RateLimited,
            Outcome::RateLimited,
            Outcome::RateLimited,
        ]);

        enrich(&mut gpx, &pending, &lookup, &test_config());

        assert_eq!(lookup.calls.get(), 3);
        assert_eq!(track_elevations(&gpx), vec![0.0, 0.0]);
    }

    #[test]
    fn waypoint_slots_receive_elevation() {
        let Extraction { mut gpx, pending } = extract(vec![Feature {
            geometry: Some(Geometry::Point {
                coordinates: vec![11.4, 47.3],
            }),
            properties: None,
        }]);
        let lookup = Scripted::new(vec![Outcome::Success(vec![575.0])]);

        enrich(&mut gpx, &pending, &lookup, &test_config());

        assert_eq!(gpx.waypoints[0].elevation, Some(575.0));
    }

    #[test]
    fn backoff_grows_with_the_attempt_number() {
        let unit = Duration::from_secs(2);
        assert_eq!(backoff_wait(unit, 0), Duration::from_secs(2));
        assert_eq!(backoff_wait(unit, 1), Duration::from_secs(4));
        assert_eq!(backoff_wait(unit, 2), Duration::from_secs(6));
    }

    #[test]
    fn synthetic_elevation_matches_reference_formula() {
        assert_eq!(synthetic_elevation(50.0, 10.0), 2100.0);
        assert_eq!(synthetic_elevation(-50.0, -10.0), 2100.0);
        assert_eq!(synthetic_elevation(0.0, 0.0), 1500.0);
        assert_eq!(synthetic_elevation(100.0, 0.0), 1500.0);
        assert_eq!(synthetic_elevation(123.0, 45.0), 2180.0);
    }
}
