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

//! Fixed [simplestyle](https://github.com/mapbox/simplestyle-spec) styles
//! for routes and the tile grid.

use geojson::{Feature, JsonObject, JsonValue};

/// Line width of routes.
pub const ROUTE_STROKE_WIDTH: u32 = 10;
/// Opacity of routes.
pub const ROUTE_STROKE_OPACITY: f64 = 0.5;
/// Colour of routes.
pub const ROUTE_STROKE: &str = "#4264fb";

/// Line width of grid lines.
pub const GRID_STROKE_WIDTH: u32 = 1;
/// Colour of grid lines.
pub const GRID_STROKE: &str = "#ff0000";

/// Properties applied to every route.
pub fn route_style() -> JsonObject {
    JsonObject::from_iter([
        ("stroke-width".to_string(), JsonValue::from(ROUTE_STROKE_WIDTH)),
        ("stroke-opacity".to_string(), JsonValue::from(ROUTE_STROKE_OPACITY)),
        ("stroke".to_string(), JsonValue::from(ROUTE_STROKE)),
    ])
}

/// Properties applied to the grid.
pub fn grid_style() -> JsonObject {
    JsonObject::from_iter([
        ("stroke-width".to_string(), JsonValue::from(GRID_STROKE_WIDTH)),
        ("stroke".to_string(), JsonValue::from(GRID_STROKE)),
    ])
}

/// Replace the properties of every route carrying properties with
/// [`route_style`].
///
/// Routes without properties are left untouched.
pub fn style_routes(routes: &mut [Feature]) {
    for properties in routes.iter_mut().filter_map(|r| r.properties.as_mut()) {
        *properties = route_style();
    }
}
