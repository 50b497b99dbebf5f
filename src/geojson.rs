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

//! Minimal [GeoJSON](https://geojson.org/) data model for the converter.
//!
//! Only the fields the converter actually reads are modeled. Unknown document
//! and geometry types deserialize into catch-all variants instead of failing,
//! so a file full of unsupported geometries still parses.

use serde::Deserialize;

/// A position array: `[longitude, latitude]`, possibly with extra components.
pub type Position = Vec<f64>;

/// Top-level GeoJSON document.
///
/// A bare `Feature` is accepted in addition to a `FeatureCollection`. Any
/// other document type yields no features.
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
pub enum GeoJson {
    /// A collection of features.
    FeatureCollection {
        #[serde(default)]
        features: Vec<Feature>,
    },
    /// A single feature without a surrounding collection.
    Feature(Feature),
    /// Any other document type.
    #[serde(other)]
    Other,
}

impl GeoJson {
    /// Flatten the document into its list of features.
    pub fn into_features(self) -> Vec<Feature> {
        match self {
            GeoJson::FeatureCollection { features } => features,
            GeoJson::Feature(feature) => vec![feature],
            GeoJson::Other => vec![],
        }
    }
}

/// A single feature: a geometry plus free-form properties.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Feature {
    pub geometry: Option<Geometry>,
    pub properties: Option<Properties>,
}

/// The `properties` object of a feature. Only `name` is used.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Properties {
    pub name: Option<String>,
}

/// The geometry kinds the converter understands.
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
pub enum Geometry {
    /// An ordered path of positions, converted to a track.
    LineString {
        #[serde(default)]
        coordinates: Vec<Position>,
    },
    /// A single position, converted to a waypoint.
    Point {
        #[serde(default)]
        coordinates: Position,
    },
    /// Every other geometry kind; skipped during extraction.
    #[serde(other)]
    Unsupported,
}
