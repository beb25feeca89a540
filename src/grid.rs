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

//! Tile grid overlay covering the routes.

use geojson::{Feature, JsonObject, Value};
use tracing::debug;

use crate::feature::{bounding_box, combine, new_feature, BoundingBox};
use crate::style::grid_style;
use crate::tile::{
    latitude_to_tile_row, longitude_to_tile_column, tile_column_to_longitude,
    tile_row_to_latitude, ZOOM,
};
use crate::Error;

/// Number of tiles added around the routes on each side.
pub const PADDING: i64 = 1;

/// Inclusive range of tile indices along one axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AxisRange {
    pub from: i64,
    pub to: i64,
}

impl AxisRange {
    /// Iterate over all indices, including both ends.
    pub fn iter(self) -> impl Iterator<Item = i64> {
        self.from..=self.to
    }
}

/// Tile columns (`x`) and rows (`y`) covered by the grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TileRange {
    pub x: AxisRange,
    pub y: AxisRange,
}

impl TileRange {
    /// Tiles covering `bbox` at zoom level `z`, padded by [`PADDING`].
    ///
    /// Rows grow southward, so the northern edge determines the first row.
    pub fn covering(bbox: &BoundingBox, z: u8) -> Self {
        Self {
            x: AxisRange {
                from: longitude_to_tile_column(bbox.min_x, z) - PADDING,
                to: longitude_to_tile_column(bbox.max_x, z) + PADDING,
            },
            y: AxisRange {
                from: latitude_to_tile_row(bbox.max_y, z) - PADDING,
                to: latitude_to_tile_row(bbox.min_y, z) + PADDING,
            },
        }
    }

    /// One line per column boundary followed by one line per row boundary.
    pub fn lines(&self, z: u8) -> Vec<Feature> {
        let north = tile_row_to_latitude(self.y.from, z);
        let south = tile_row_to_latitude(self.y.to, z);
        let west = tile_column_to_longitude(self.x.from, z);
        let east = tile_column_to_longitude(self.x.to, z);

        let meridians = self.x.iter().map(|x| {
            let lon = tile_column_to_longitude(x, z);
            grid_line([lon, north], [lon, south])
        });
        let parallels = self.y.iter().map(|y| {
            let lat = tile_row_to_latitude(y, z);
            grid_line([west, lat], [east, lat])
        });
        meridians.chain(parallels).collect()
    }
}

fn grid_line(from: [f64; 2], to: [f64; 2]) -> Feature {
    new_feature(
        Value::LineString(vec![from.to_vec(), to.to_vec()]),
        Some(JsonObject::new()),
    )
}

/// Build the styled grid covering all `routes`.
///
/// The grid lines are combined into a single _MultiLineString_ feature.
pub fn build_grid(routes: &[Feature]) -> Result<Vec<Feature>, Error> {
    let bbox = bounding_box(routes).ok_or(Error::EmptyInput)?;
    let range = TileRange::covering(&bbox, ZOOM);
    debug!(?bbox, ?range, "computed grid range");

    let mut grid = combine(range.lines(ZOOM));
    if let Some(properties) = grid.first_mut().and_then(|f| f.properties.as_mut()) {
        *properties = grid_style();
    }
    Ok(grid)
}
