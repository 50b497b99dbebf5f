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

//! This is a very simple command-line interface for the GeoJSON-to-GPX
//! converter.

use std::{env, path::PathBuf, process::ExitCode};

use geojson_gpx_convert::{convert_tree, Config, OpenMeteo};
use log::info;

/// Input directory if none is given on the command line.
const DEFAULT_INPUT: &str = "geojson";
/// Output directory if none is given on the command line.
const DEFAULT_OUTPUT: &str = "assets/tracks";

/// Converts all GeoJSON files below the input directory (first argument,
/// default `geojson`) into GPX files below the output directory (second
/// argument, default `assets/tracks`).
fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut args = env::args().skip(1);
    let input = PathBuf::from(args.next().unwrap_or_else(|| DEFAULT_INPUT.to_string()));
    let output = PathBuf::from(args.next().unwrap_or_else(|| DEFAULT_OUTPUT.to_string()));

    if !input.is_dir() {
        eprintln!("Input directory {} does not exist", input.display());
        return ExitCode::FAILURE;
    }

    match convert_tree(&input, &output, &OpenMeteo::new(), &Config::default()) {
        Ok(converted) => {
            info!("converted {converted} file(s)");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("Conversion failed with: {err:?}");
            ExitCode::FAILURE
        }
    }
}
