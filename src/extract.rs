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

//! Extraction of GPX tracks and waypoints from parsed GeoJSON features.

use geo_types::Point;
use gpx::{Gpx, GpxVersion, Track, TrackSegment, Waypoint};
use log::debug;

use crate::geojson::{Feature, Geometry};

/// Name used for features without a `name` property.
pub const UNNAMED: &str = "Unnamed Track";
/// Creator string written to the GPX root element.
const CREATOR: &str = "geojson_gpx_convert";

/// Write-back target of a [`PendingPoint`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    /// Point `point` in the single segment of track `track`.
    Track { track: usize, point: usize },
    /// The waypoint at `index`.
    Waypoint { index: usize },
}

/// A coordinate awaiting its elevation, tagged with the slot it is written to.
///
/// Pending points only live for the duration of one file's enrichment pass.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingPoint {
    pub lat: f64,
    pub lon: f64,
    pub slot: Slot,
}

/// Result of [`extract`]: the GPX document under construction and the
/// coordinates still missing an elevation, in encounter order.
#[derive(Debug)]
pub struct Extraction {
    pub gpx: Gpx,
    pub pending: Vec<PendingPoint>,
}

/// Build the GPX skeleton from `features`.
///
/// Each `LineString` becomes a track with a single segment and each `Point`
/// becomes a waypoint; all other geometries are skipped. GeoJSON stores
/// positions as `[longitude, latitude]`, which is swapped to latitude-first
/// for the internal representation and the elevation lookup. Every extracted
/// coordinate is also recorded as a [`PendingPoint`].
pub fn extract(features: Vec<Feature>) -> Extraction {
    let mut gpx = Gpx {
        version: GpxVersion::Gpx11,
        creator: Some(CREATOR.to_string()),
        ..Default::default()
    };
    let mut pending = vec![];

    for feature in features {
        let name = feature
            .properties
            .and_then(|p| p.name)
            .unwrap_or_else(|| UNNAMED.to_string());

        match feature.geometry {
            Some(Geometry::LineString { coordinates }) => {
                let track_index = gpx.tracks.len();
                let mut segment = TrackSegment::new();
                for position in &coordinates {
                    let (lat, lon) = match lat_lon(position) {
                        Some(coordinate) => coordinate,
                        None => continue,
                    };
                    pending.push(PendingPoint {
                        lat,
                        lon,
                        slot: Slot::Track {
                            track: track_index,
                            point: segment.points.len(),
                        },
                    });
                    segment.points.push(Waypoint::new(Point::new(lon, lat)));
                }

                let mut track = Track::new();
                track.name = Some(name);
                track.segments.push(segment);
                gpx.tracks.push(track);
            }
            Some(Geometry::Point { coordinates }) => {
                let (lat, lon) = match lat_lon(&coordinates) {
                    Some(coordinate) => coordinate,
                    None => continue,
                };
                pending.push(PendingPoint {
                    lat,
                    lon,
                    slot: Slot::Waypoint {
                        index: gpx.waypoints.len(),
                    },
                });

                let mut waypoint = Waypoint::new(Point::new(lon, lat));
                waypoint.name = Some(name);
                gpx.waypoints.push(waypoint);
            }
            _ => debug!("skipping feature {name:?} with unsupported geometry"),
        }
    }

    Extraction { gpx, pending }
}

/// Read a position as `(latitude, longitude)`, rejecting short arrays.
fn lat_lon(position: &[f64]) -> Option<(f64, f64)> {
    match position {
        [lon, lat, ..] => Some((*lat, *lon)),
        _ => None,
    }
}
