// Copyright 2021, 2022, 2023 Viktor Reusch
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

//! Library for converting [GPX](https://www.topografix.com/gpx.asp) tracks to
//! a [KML](https://developers.google.com/kml) document with a tile grid.
//!
//! All waypoints, routes, and tracks of the GPX documents are collected,
//! styled uniformly, and overlaid with the grid of
//! [slippy map](https://wiki.openstreetmap.org/wiki/Slippy_map_tilenames)
//! tiles at zoom level [`tile::ZOOM`] covering them.
//!
//! See [`convert`] and [`convert_sources`] for information on how to use this
//! library.

use std::io::{self, Read};
use std::path::{Path, PathBuf};

use geojson::Feature;
use gpx::errors::GpxError;
use thiserror::Error;
use tracing::info;

pub mod emit;
pub mod feature;
pub mod grid;
pub mod ingest;
pub mod style;
pub mod tile;

pub use ingest::RouteSet;

/// Error returned from the [`convert`] function.
#[derive(Error, Debug)]
pub enum Error {
    /// An input file could not be read.
    #[error("reading {} failed: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// GPX reading failed.
    #[error("reading GPX {} failed: {source}", path.display())]
    Gpx {
        path: PathBuf,
        #[source]
        source: GpxError,
    },
    /// No route features were read, so there is nothing to cover with a grid.
    #[error("no GPX routes given")]
    EmptyInput,
    /// A geometry cannot be represented in KML.
    #[error("unsupported geometry: {0}")]
    UnsupportedGeometry(String),
    /// KML writing failed.
    #[error("writing KML failed: {0}")]
    Kml(#[from] kml::Error),
    /// Writing the output failed.
    #[error("writing output failed: {0}")]
    Write(#[source] io::Error),
}

/// Read the GPX files among `paths` and write a KML file with grid to `sink`.
///
/// Paths without a GPX extension are skipped silently. Nothing is written to
/// `sink` if an error occurs.
pub fn convert<P: AsRef<Path>>(
    paths: impl IntoIterator<Item = P>,
    sink: impl io::Write,
) -> Result<(), Error> {
    let routes = RouteSet::default().read_paths(paths)?;
    write_with_grid(routes, sink)
}

/// Read complete GPX documents from `sources` and write a KML file with grid
/// to `sink`.
///
/// # Example
/// ```
/// # use gpx_kml_grid::convert_sources;
/// #
/// let source = r#"<?xml version="1.0" encoding="UTF-8"?>
/// <gpx xmlns="http://www.topografix.com/GPX/1/1" version="1.1">
///     <trk><trkseg>
///         <trkpt lat="48.858222" lon="2.2945"/>
///         <trkpt lat="48.8606" lon="2.3376"/>
///     </trkseg></trk>
/// </gpx>
/// "#;
/// let mut sink = vec![];
///
/// convert_sources([source.as_bytes()], &mut sink).expect("conversion failed");
///
/// let kml = String::from_utf8(sink).expect("KML data is not valid UTF-8");
/// assert!(kml.contains("<kml"));
/// assert!(kml.contains("2.2945"));
/// assert!(kml.contains("<MultiGeometry>"));
/// assert!(kml.contains("<color>ff0000ff</color>"));
/// ```
pub fn convert_sources<R: Read>(
    sources: impl IntoIterator<Item = R>,
    sink: impl io::Write,
) -> Result<(), Error> {
    let mut routes = RouteSet::default();
    for source in sources {
        routes = routes.read(source)?;
    }
    write_with_grid(routes, sink)
}

/// Style the `routes`, build their grid, and write both as KML to `sink`.
fn write_with_grid(routes: RouteSet, sink: impl io::Write) -> Result<(), Error> {
    let features = collect_features(routes)?;
    emit::write_kml(&features, sink)
}

/// Styled grid features followed by the styled route features.
pub fn collect_features(routes: RouteSet) -> Result<Vec<Feature>, Error> {
    let mut routes = routes.into_features();
    style::style_routes(&mut routes);

    let mut features = grid::build_grid(&routes)?;
    info!(routes = routes.len(), grid = features.len(), "built grid");
    features.extend(routes);
    Ok(features)
}
