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

//! Reading GPX documents into GeoJSON features.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use geojson::{Feature, JsonObject, JsonValue, Position, Value};
use gpx::{Link, Route, Track, TrackSegment, Waypoint};
use tracing::debug;

use crate::feature::new_feature;
use crate::Error;

/// Content type of GPX documents.
pub const GPX_CONTENT_TYPE: &str = "application/gpx+xml";

/// Guess the content type of `path` from its extension.
pub fn content_type(path: &Path) -> Option<&'static str> {
    let extension = path.extension()?.to_str()?;
    extension
        .eq_ignore_ascii_case("gpx")
        .then_some(GPX_CONTENT_TYPE)
}

/// Ordered collection of route features read from GPX documents.
#[derive(Debug, Default)]
pub struct RouteSet {
    features: Vec<Feature>,
}

impl RouteSet {
    /// Read all GPX files among `paths`, in order.
    ///
    /// Paths whose content type is not [`GPX_CONTENT_TYPE`] are skipped.
    pub fn read_paths<P: AsRef<Path>>(
        mut self,
        paths: impl IntoIterator<Item = P>,
    ) -> Result<Self, Error> {
        for path in paths {
            self = self.read_path(path.as_ref())?;
        }
        Ok(self)
    }

    /// Read the GPX file at `path` if its content type is GPX.
    pub fn read_path(self, path: &Path) -> Result<Self, Error> {
        if content_type(path) != Some(GPX_CONTENT_TYPE) {
            debug!(path = %path.display(), "skipping non-GPX file");
            return Ok(self);
        }

        let bytes = fs::read(path).map_err(|source| Error::Read {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), bytes = bytes.len(), "read GPX file");
        self.read_named(&bytes[..], path.to_path_buf())
    }

    /// Read a complete GPX document from `source`.
    pub fn read(self, source: impl Read) -> Result<Self, Error> {
        self.read_named(source, PathBuf::new())
    }

    fn read_named(mut self, source: impl Read, path: PathBuf) -> Result<Self, Error> {
        let gpx = gpx::read(source).map_err(|source| Error::Gpx { path, source })?;
        let before = self.features.len();

        self.features
            .extend(gpx.waypoints.into_iter().map(convert_waypoint));
        self.features
            .extend(gpx.routes.into_iter().filter_map(convert_route));
        self.features
            .extend(gpx.tracks.into_iter().filter_map(convert_track));

        debug!(features = self.features.len() - before, "converted GPX document");
        Ok(self)
    }

    /// Access the accumulated features.
    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    /// Take the accumulated features.
    pub fn into_features(self) -> Vec<Feature> {
        self.features
    }
}

/// Convert the position of `waypoint`, including its elevation if present.
fn position(waypoint: &Waypoint) -> Position {
    let point = waypoint.point();
    let mut position = vec![point.x(), point.y()];
    position.extend(waypoint.elevation);
    position
}

/// Convert the points of a route or segment to a line.
///
/// Lines need at least two points, otherwise [`None`] is returned.
fn line(points: &[Waypoint]) -> Option<Vec<Position>> {
    (points.len() >= 2).then(|| points.iter().map(position).collect())
}

/// Convert a GPX `waypoint` to a _Point_ feature.
fn convert_waypoint(waypoint: Waypoint) -> Feature {
    let value = Value::Point(position(&waypoint));

    let mut properties = Properties::new("wpt");
    properties.text("name", waypoint.name);
    properties.text("cmt", waypoint.comment);
    properties.text("desc", waypoint.description);
    properties.text("src", waypoint.source);
    properties.link(&waypoint.links);
    properties.text("time", waypoint.time.and_then(|t| t.format().ok()));
    if let Some(elevation) = waypoint.elevation {
        properties.insert("ele", elevation.into());
    }

    new_feature(value, Some(properties.0))
}

/// Convert a GPX `route` to a _LineString_ feature.
fn convert_route(route: Route) -> Option<Feature> {
    let coords = line(&route.points)?;

    let mut properties = Properties::new("rte");
    properties.text("name", route.name);
    properties.text("cmt", route.comment);
    properties.text("desc", route.description);
    properties.text("src", route.source);
    properties.link(&route.links);
    if let Some(number) = route.number {
        properties.insert("number", number.into());
    }

    Some(new_feature(Value::LineString(coords), Some(properties.0)))
}

/// Convert a GPX `track` to a _LineString_ or _MultiLineString_ feature.
///
/// Segments with less than two points are dropped. If no segment remains,
/// the track yields no feature.
fn convert_track(track: Track) -> Option<Feature> {
    let mut lines: Vec<_> = track.segments.iter().filter_map(convert_segment).collect();
    let value = match lines.len() {
        0 => return None,
        1 => Value::LineString(lines.remove(0)),
        _ => Value::MultiLineString(lines),
    };

    let mut properties = Properties::new("trk");
    properties.text("name", track.name);
    properties.text("cmt", track.comment);
    properties.text("desc", track.description);
    properties.text("src", track.source);
    properties.link(&track.links);
    if let Some(number) = track.number {
        properties.insert("number", number.into());
    }

    Some(new_feature(value, Some(properties.0)))
}

fn convert_segment(segment: &TrackSegment) -> Option<Vec<Position>> {
    line(&segment.points)
}

/// Builder for the properties of a converted feature.
struct Properties(JsonObject);

impl Properties {
    /// Start with the `_gpxType` of the source element.
    fn new(gpx_type: &str) -> Self {
        let mut properties = JsonObject::new();
        properties.insert("_gpxType".to_string(), gpx_type.into());
        Self(properties)
    }

    fn insert(&mut self, key: &str, value: JsonValue) {
        self.0.insert(key.to_string(), value);
    }

    fn text(&mut self, key: &str, value: Option<String>) {
        if let Some(value) = value {
            self.insert(key, value.into());
        }
    }

    /// Only the first link is kept.
    fn link(&mut self, links: &[Link]) {
        if let Some(link) = links.first() {
            self.insert("link", link.href.clone().into());
        }
    }
}
