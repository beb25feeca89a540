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

//! Helpers for working with GeoJSON features.

use geojson::{Feature, Geometry, JsonObject, JsonValue, Position, Value};

/// Minimal axis-aligned rectangle in geographic degrees.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    /// Bounding box of a single position.
    fn at(position: &[f64]) -> Option<Self> {
        match position {
            [x, y, ..] => Some(Self {
                min_x: *x,
                min_y: *y,
                max_x: *x,
                max_y: *y,
            }),
            _ => None,
        }
    }

    /// Smallest box containing both `self` and `other`.
    fn union(self, other: Self) -> Self {
        Self {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
        }
    }
}

/// Create a feature from a geometry `value` and `properties`.
pub fn new_feature(value: Value, properties: Option<JsonObject>) -> Feature {
    Feature {
        bbox: None,
        geometry: Some(Geometry::new(value)),
        id: None,
        properties,
        foreign_members: None,
    }
}

/// Compute the bounding box of all `features`.
///
/// Returns [`None`] if the features contain no position at all.
pub fn bounding_box<'a>(features: impl IntoIterator<Item = &'a Feature>) -> Option<BoundingBox> {
    let mut bbox = None;
    for geometry in features.into_iter().filter_map(|f| f.geometry.as_ref()) {
        extend_bbox(&mut bbox, &geometry.value);
    }
    bbox
}

fn extend_bbox(bbox: &mut Option<BoundingBox>, value: &Value) {
    match value {
        Value::Point(p) => add_position(bbox, p),
        Value::MultiPoint(ps) | Value::LineString(ps) => {
            ps.iter().for_each(|p| add_position(bbox, p))
        }
        Value::MultiLineString(ls) | Value::Polygon(ls) => {
            ls.iter().flatten().for_each(|p| add_position(bbox, p))
        }
        Value::MultiPolygon(polys) => polys
            .iter()
            .flatten()
            .flatten()
            .for_each(|p| add_position(bbox, p)),
        Value::GeometryCollection(geometries) => {
            for geometry in geometries {
                extend_bbox(bbox, &geometry.value);
            }
        }
    }
}

fn add_position(bbox: &mut Option<BoundingBox>, position: &Position) {
    if let Some(other) = BoundingBox::at(position) {
        *bbox = Some(match *bbox {
            Some(b) => b.union(other),
            None => other,
        });
    }
}

/// Combine features of the same kind into multi-geometry features.
///
/// Points are merged into one _MultiPoint_, lines into one _MultiLineString_
/// and polygons into one _MultiPolygon_, in this order. The merged features
/// carry the original properties as the `collectedProperties` array.
/// Features without geometry or with a _GeometryCollection_ follow
/// unchanged.
pub fn combine(features: impl IntoIterator<Item = Feature>) -> Vec<Feature> {
    let mut points = Merged::default();
    let mut lines = Merged::default();
    let mut polygons = Merged::default();
    let mut rest = vec![];

    for feature in features {
        let properties = &feature.properties;
        let merged = match feature.geometry.as_ref().map(|g| &g.value) {
            Some(Value::Point(p)) => points.push(vec![p.clone()], properties),
            Some(Value::MultiPoint(ps)) => points.push(ps.clone(), properties),
            Some(Value::LineString(l)) => lines.push(vec![l.clone()], properties),
            Some(Value::MultiLineString(ls)) => lines.push(ls.clone(), properties),
            Some(Value::Polygon(p)) => polygons.push(vec![p.clone()], properties),
            Some(Value::MultiPolygon(ps)) => polygons.push(ps.clone(), properties),
            Some(Value::GeometryCollection(_)) | None => false,
        };
        if !merged {
            rest.push(feature);
        }
    }

    let mut combined = vec![];
    combined.extend(points.finish(Value::MultiPoint));
    combined.extend(lines.finish(Value::MultiLineString));
    combined.extend(polygons.finish(Value::MultiPolygon));
    combined.extend(rest);
    combined
}

/// Accumulator for one kind of geometry in [`combine`].
struct Merged<T> {
    parts: Vec<T>,
    properties: Vec<JsonValue>,
}

impl<T> Default for Merged<T> {
    fn default() -> Self {
        Self {
            parts: vec![],
            properties: vec![],
        }
    }
}

impl<T> Merged<T> {
    /// Always returns `true` to mark the feature as merged.
    fn push(&mut self, parts: Vec<T>, properties: &Option<JsonObject>) -> bool {
        self.parts.extend(parts);
        self.properties.push(
            properties
                .clone()
                .map(JsonValue::Object)
                .unwrap_or(JsonValue::Null),
        );
        true
    }

    fn finish(self, wrap: fn(Vec<T>) -> Value) -> Option<Feature> {
        if self.properties.is_empty() {
            return None;
        }
        let mut properties = JsonObject::new();
        properties.insert(
            "collectedProperties".to_string(),
            JsonValue::Array(self.properties),
        );
        Some(new_feature(wrap(self.parts), Some(properties)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(coords: &[[f64; 2]]) -> Feature {
        let coords = coords.iter().map(|c| c.to_vec()).collect();
        new_feature(Value::LineString(coords), Some(JsonObject::new()))
    }

    #[test]
    fn test_bounding_box() {
        let features = [
            line(&[[1.0, 2.0], [3.0, -1.0]]),
            new_feature(Value::Point(vec![-4.0, 0.5, 100.0]), None),
        ];
        assert_eq!(
            bounding_box(&features),
            Some(BoundingBox {
                min_x: -4.0,
                min_y: -1.0,
                max_x: 3.0,
                max_y: 2.0,
            })
        );
    }

    #[test]
    fn test_bounding_box_empty() {
        assert_eq!(bounding_box(std::iter::empty()), None);

        let no_geometry = Feature {
            geometry: None,
            ..new_feature(Value::Point(vec![]), None)
        };
        assert_eq!(bounding_box(&[no_geometry]), None);
    }

    #[test]
    fn test_bounding_box_nested_collection() {
        let inner = Geometry::new(Value::MultiPolygon(vec![vec![vec![
            vec![0.0, 0.0],
            vec![5.0, 0.0],
            vec![5.0, 7.0],
            vec![0.0, 0.0],
        ]]]));
        let feature = new_feature(Value::GeometryCollection(vec![inner]), None);
        let bbox = bounding_box(&[feature]).unwrap();
        assert_eq!((bbox.max_x, bbox.max_y), (5.0, 7.0));
    }

    #[test]
    fn test_combine_lines() {
        let combined = combine(vec![
            line(&[[0.0, 0.0], [1.0, 1.0]]),
            line(&[[2.0, 2.0], [3.0, 3.0]]),
        ]);
        assert_eq!(combined.len(), 1);

        let geometry = &combined[0].geometry.as_ref().unwrap().value;
        let Value::MultiLineString(lines) = geometry else {
            panic!("expected MultiLineString, got {geometry:?}");
        };
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1][0], vec![2.0, 2.0]);

        let collected = &combined[0].properties.as_ref().unwrap()["collectedProperties"];
        assert_eq!(collected.as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_combine_mixed() {
        let combined = combine(vec![
            line(&[[0.0, 0.0], [1.0, 1.0]]),
            new_feature(Value::Point(vec![0.0, 0.0]), None),
            new_feature(Value::GeometryCollection(vec![]), None),
        ]);
        let kinds: Vec<_> = combined
            .iter()
            .map(|f| match f.geometry.as_ref().unwrap().value {
                Value::MultiPoint(_) => "MultiPoint",
                Value::MultiLineString(_) => "MultiLineString",
                Value::GeometryCollection(_) => "GeometryCollection",
                _ => "other",
            })
            .collect();
        assert_eq!(kinds, ["MultiPoint", "MultiLineString", "GeometryCollection"]);
    }

    #[test]
    fn test_combine_nothing() {
        assert!(combine(vec![]).is_empty());
    }
}
