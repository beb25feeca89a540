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

//! Conversion between geographic degrees and
//! [slippy map](https://wiki.openstreetmap.org/wiki/Slippy_map_tilenames)
//! tile indices.

use std::f64::consts::PI;

/// Zoom level of the generated grid.
pub const ZOOM: u8 = 14;

/// Largest latitude representable in Web Mercator.
pub const MAX_LATITUDE: f64 = 85.051_128_779_8;

/// Number of tiles along one axis at zoom level `z`.
fn tiles_per_axis(z: u8) -> f64 {
    2f64.powi(i32::from(z))
}

/// Longitude of the western edge of tile column `x`.
pub fn tile_column_to_longitude(x: i64, z: u8) -> f64 {
    x as f64 / tiles_per_axis(z) * 360.0 - 180.0
}

/// Latitude of the northern edge of tile row `y`.
pub fn tile_row_to_latitude(y: i64, z: u8) -> f64 {
    let n = PI - 2.0 * PI * y as f64 / tiles_per_axis(z);
    (0.5 * (n.exp() - (-n).exp())).atan().to_degrees()
}

/// Tile column containing longitude `lon`.
pub fn longitude_to_tile_column(lon: f64, z: u8) -> i64 {
    ((lon + 180.0) / 360.0 * tiles_per_axis(z)).floor() as i64
}

/// Tile row containing latitude `lat`.
///
/// `lat` is clamped to [`MAX_LATITUDE`] because the projection diverges at
/// the poles.
pub fn latitude_to_tile_row(lat: f64, z: u8) -> i64 {
    let lat = lat.clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians();
    ((1.0 - (lat.tan() + 1.0 / lat.cos()).ln() / PI) / 2.0 * tiles_per_axis(z)).floor() as i64
}
