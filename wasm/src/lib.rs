// Copyright 2022, 2023 Viktor Reusch
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

//! This is a WASM wrapper for `gpx_kml_grid`.

use wasm_bindgen::{prelude::wasm_bindgen, JsError};

/// This wraps `gpx_kml_grid::convert_sources` for a single GPX document.
#[wasm_bindgen]
pub fn convert(source: &[u8]) -> Result<Box<[u8]>, JsError> {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();

    let mut sink = vec![];
    gpx_kml_grid::convert_sources([source], &mut sink)?;
    Ok(sink.into_boxed_slice())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert() {
        let source = include_bytes!("../../resources/eiffel.gpx");
        let kml = convert(source).unwrap_or_else(|_| panic!("conversion failed"));
        let kml = std::str::from_utf8(&kml).expect("KML data is not valid UTF-8");
        assert!(kml.contains("<kml"));
        assert!(kml.contains("<MultiGeometry>"));
        assert!(kml.contains("2.294"));
    }
}
