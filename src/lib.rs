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

//! Library for converting [GeoJSON](https://geojson.org/) tracks to
//! [GPX](https://www.topografix.com/gpx.asp) with elevation data.
//!
//! `LineString` features become GPX tracks and `Point` features become GPX
//! waypoints. Every coordinate is enriched with a ground elevation fetched in
//! batches from the Open-Meteo elevation API, with a deterministic synthetic
//! fallback when the service is unreachable.
//!
//! See [`convert`] for single documents and [`convert_tree`] for whole
//! directory trees.

use std::fs::{self, File};
use std::io::{self, BufReader, Read};
use std::path::Path;
use std::time::Duration;

use gpx::errors::GpxError;
use log::{info, warn};
use thiserror::Error;

pub mod elevation;
pub mod extract;
pub mod geojson;
mod walk;

pub use elevation::{ElevationLookup, OpenMeteo, Outcome};
pub use walk::convert_tree;

use extract::Extraction;
use geojson::GeoJson;

/// Error returned from the conversion functions.
#[derive(Error, Debug)]
pub enum Error {
    /// GeoJSON reading failed.
    #[error("reading GeoJSON failed: {0}")]
    Json(#[from] serde_json::Error),
    /// GPX writing failed.
    #[error("writing GPX failed: {0}")]
    Gpx(#[from] GpxError),
    /// File system access failed.
    #[error("file access failed: {0}")]
    Io(#[from] io::Error),
}

/// Tunables of the enrichment pipeline.
///
/// The defaults match the production converter. Tests inject zero delays
/// together with a stub [`ElevationLookup`] to stay fast and offline.
#[derive(Debug, Clone)]
pub struct Config {
    /// Maximum number of coordinates per lookup request.
    pub batch_size: usize,
    /// Attempts per batch before giving up.
    pub retries: u32,
    /// Throttle pause between consecutive batches.
    pub batch_delay: Duration,
    /// Wait after a rate-limit response, scaled by the attempt number.
    pub backoff_unit: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            batch_size: 50,
            retries: 3,
            batch_delay: Duration::from_secs(2),
            backoff_unit: Duration::from_secs(2),
        }
    }
}

/// Read a GeoJSON document and write an elevation-enriched GPX document.
///
/// A complete GeoJSON document is read from `source`. The converted data is
/// written as a complete GPX file to `sink`. A document without features
/// writes nothing and returns `Ok(false)`.
///
/// If an error occurs, the function returns immediately. The `source` and
/// `sink` might have been modified in this case.
///
/// # Example
/// ```
/// # use geojson_gpx_convert::{convert, Config, ElevationLookup, Outcome};
/// #
/// struct Flat;
/// impl ElevationLookup for Flat {
///     fn lookup(&self, lats: &[f64], _lons: &[f64]) -> Outcome {
///         Outcome::Success(vec![35.0; lats.len()])
///     }
/// }
///
/// let source = r#"{
///     "type": "FeatureCollection",
///     "features": [{
///         "type": "Feature",
///         "geometry": {"type": "Point", "coordinates": [2.2945, 48.858222]},
///         "properties": {"name": "Eiffel Tower"}
///     }]
/// }"#;
/// let mut sink = vec![];
///
/// let config = Config {
///     batch_delay: std::time::Duration::ZERO,
///     ..Config::default()
/// };
/// convert(source.as_bytes(), &mut sink, &Flat, &config).expect("conversion failed");
///
/// let gpx = String::from_utf8(sink).expect("GPX data is not valid UTF-8");
/// assert!(gpx.contains("<wpt"));
/// assert!(gpx.contains("2.2945"));
/// assert!(gpx.contains("48.858222"));
/// assert!(gpx.contains("Eiffel Tower"));
/// assert!(gpx.contains("35"));
/// ```
pub fn convert(
    source: impl Read,
    mut sink: impl io::Write,
    lookup: &dyn ElevationLookup,
    config: &Config,
) -> Result<bool, Error> {
    let document: GeoJson = serde_json::from_reader(source)?;
    let features = document.into_features();
    if features.is_empty() {
        return Ok(false);
    }

    let Extraction { mut gpx, pending } = extract::extract(features);
    elevation::enrich(&mut gpx, &pending, lookup, config);
    gpx::write(&gpx, &mut sink)?;

    Ok(true)
}

/// Convert the file at `input` into a GPX file at `output`.
///
/// Parent directories of `output` are created as needed. The GPX data is
/// assembled in memory and moved into place with a rename, so an interrupted
/// run never leaves a partially written output file. An input without
/// features writes nothing and returns `Ok(false)`.
pub fn convert_file(
    input: &Path,
    output: &Path,
    lookup: &dyn ElevationLookup,
    config: &Config,
) -> Result<bool, Error> {
    info!("processing {}", input.display());

    let source = BufReader::new(File::open(input)?);
    let mut sink = vec![];
    if !convert(source, &mut sink, lookup, config)? {
        warn!("no features found in {}", input.display());
        return Ok(false);
    }

    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent)?;
    }
    let temp = output.with_extension("gpx.part");
    fs::write(&temp, &sink)?;
    fs::rename(&temp, output)?;

    info!("saved to {}", output.display());
    Ok(true)
}
