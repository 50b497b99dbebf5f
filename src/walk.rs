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

//! Discovery of input files and the per-file conversion loop.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::error;

use crate::elevation::ElevationLookup;
use crate::{convert_file, Config, Error};

/// Input extension, compared case-insensitively.
const INPUT_EXTENSION: &str = "geojson";
/// Extension of the generated files.
const OUTPUT_EXTENSION: &str = "gpx";

/// Convert every `.geojson` file below `input_root`.
///
/// The directory structure is mirrored below `output_root` with the file
/// extension replaced. Files are visited in sorted path order. A file that
/// fails to convert is logged and skipped; the walk itself only fails when
/// `input_root` cannot be traversed. Returns the number of files converted.
pub fn convert_tree(
    input_root: &Path,
    output_root: &Path,
    lookup: &dyn ElevationLookup,
    config: &Config,
) -> Result<usize, Error> {
    let mut inputs = vec![];
    collect(input_root, &mut inputs)?;
    inputs.sort();

    let mut converted = 0;
    for input in inputs {
        // Collected paths are below input_root, so the prefix always strips.
        let relative = input.strip_prefix(input_root).unwrap_or(&input);
        let output = output_root.join(relative).with_extension(OUTPUT_EXTENSION);

        match convert_file(&input, &output, lookup, config) {
            Ok(true) => converted += 1,
            Ok(false) => {}
            Err(err) => error!("skipping {}: {err}", input.display()),
        }
    }

    Ok(converted)
}

/// Recursively gather all files with the input extension.
fn collect(dir: &Path, inputs: &mut Vec<PathBuf>) -> io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect(&path, inputs)?;
        } else if has_input_extension(&path) {
            inputs.push(path);
        }
    }
    Ok(())
}

/// Case-insensitive check for the `.geojson` extension.
fn has_input_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|extension| extension.to_str())
        .is_some_and(|extension| extension.eq_ignore_ascii_case(INPUT_EXTENSION))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_check_ignores_case() {
        assert!(has_input_extension(Path::new("a/b/track.geojson")));
        assert!(has_input_extension(Path::new("track.GeoJSON")));
        assert!(!has_input_extension(Path::new("track.json")));
        assert!(!has_input_extension(Path::new("geojson")));
    }
}
