// Copyright 2023 Viktor Reusch
//
// This file is part of gpx_kml_grid.
//
// gpx_kml_grid is free software: you can redistribute it and/or modify it
// under the terms of the GNU Affero General Public License as published by the
// Free Software Foundation, either version 3 of the License, or (at your
// option) any later version.
//
// gpx_kml_grid is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or
// FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License
// for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with gpx_kml_grid. If not, see <https://www.gnu.org/licenses/>.

//! This is a very simple command-line interface for the GPX-to-KML converter.

use std::{io::stdout, path::PathBuf, process::ExitCode};

use clap::Parser;
use gpx_kml_grid::convert;
use tracing_subscriber::EnvFilter;

/// Convert GPX tracks to a single KML document with a tile grid overlay.
///
/// The KML document is written to STDOUT. Files without a `.gpx` extension
/// are ignored.
#[derive(Parser, Debug)]
#[command(version)]
struct Args {
    /// GPX files to convert
    files: Vec<PathBuf>,
}

fn main() -> ExitCode {
    let args = Args::parse();

    // STDOUT is reserved for the KML document.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    match convert(&args.files, stdout().lock()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Conversion failed with: {err}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_args() {
        Args::command().debug_assert();

        let args = Args::try_parse_from(["gpx_kml_grid_cli", "a.gpx", "notes.txt"]).unwrap();
        assert_eq!(args.files, [PathBuf::from("a.gpx"), PathBuf::from("notes.txt")]);

        let args = Args::try_parse_from(["gpx_kml_grid_cli"]).unwrap();
        assert!(args.files.is_empty());
    }
}
