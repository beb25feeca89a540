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

//! Serialization of GeoJSON features to [KML](https://developers.google.com/kml).
//!
//! [simplestyle](https://github.com/mapbox/simplestyle-spec) properties of
//! lines and polygons are turned into shared KML _Style_ elements.

use std::collections::HashMap;
use std::io::Write;

use geojson::{Feature, JsonObject, JsonValue, Position, Value};
use kml::types::{
    AltitudeMode, Coord, Element, Geometry, LineString, LinearRing, MultiGeometry, Placemark,
    Point, Polygon,
};
use kml::{Kml, KmlDocument, KmlVersion, KmlWriter};

use crate::Error;

/// This line needs to be prepended to the KML output.
const XML_HEAD: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;
/// Namespace attributes for the `<kml>` tag.
const NAMESPACES: &[(&str, &str)] = &[("xmlns", "http://www.opengis.net/kml/2.2")];
/// Default value for tessellating lines in KML.
const DEFAULT_TESSELLATE: bool = true;
/// Line colour if a style does not set `stroke`.
const DEFAULT_LINE_COLOR: &str = "ff555555";
/// Line width if a style does not set `stroke-width`.
const DEFAULT_LINE_WIDTH: &str = "2";
/// Fill colour if a style does not set `fill`.
const DEFAULT_FILL_COLOR: &str = "88555555";

/// Use double precision for coordinate values.
type CoordValue = f64;

/// Write `features` as a complete KML file to `sink`.
///
/// The document is rendered in memory first, so `sink` is only written if
/// every feature could be converted.
pub fn write_kml<'a>(
    features: impl IntoIterator<Item = &'a Feature>,
    mut sink: impl Write,
) -> Result<(), Error> {
    let mut elements = vec![];
    let mut styles = vec![];
    for feature in features {
        push_feature(feature, &mut styles, &mut elements)?;
    }

    let document = Kml::Document {
        elements,
        attrs: Default::default(),
    };
    let namespaces = NAMESPACES
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    let kml = Kml::<CoordValue>::KmlDocument(KmlDocument {
        version: KmlVersion::V22,
        attrs: namespaces,
        elements: vec![document],
    });

    let mut buffer = vec![];
    writeln!(&mut buffer, "{XML_HEAD}").map_err(Error::Write)?;
    KmlWriter::from_writer(&mut buffer).write(&kml)?;
    writeln!(&mut buffer).map_err(Error::Write)?;

    sink.write_all(&buffer)
        .and_then(|()| sink.flush())
        .map_err(Error::Write)
}

/// Convert a single `feature` to a _Placemark_ and push it to `elements`.
///
/// A _Style_ is pushed before the placemark if the feature uses a style
/// whose id is not yet contained in `styles`.
fn push_feature(
    feature: &Feature,
    styles: &mut Vec<String>,
    elements: &mut Vec<Kml<CoordValue>>,
) -> Result<(), Error> {
    let value = &feature
        .geometry
        .as_ref()
        .ok_or_else(|| Error::UnsupportedGeometry("feature without geometry".to_string()))?
        .value;
    let geometry = convert_geometry(value)?;

    let empty = JsonObject::new();
    let properties = feature.properties.as_ref().unwrap_or(&empty);

    let mut children = vec![];
    let lineal = matches!(
        value,
        Value::LineString(_)
            | Value::MultiLineString(_)
            | Value::Polygon(_)
            | Value::MultiPolygon(_)
    );
    if let Some(id) = style_id(properties).filter(|_| lineal) {
        if !styles.contains(&id) {
            elements.push(Kml::Element(line_style(properties, &id)));
            styles.push(id.clone());
        }
        children.push(simple_element("styleUrl", format!("#{id}")));
    }
    if !properties.is_empty() {
        children.push(extended_data(properties));
    }

    elements.push(Kml::Placemark(Placemark {
        name: properties.get("name").map(text),
        description: properties.get("description").map(text),
        geometry: Some(geometry),
        children,
        ..Default::default()
    }));
    Ok(())
}

/// Textual representation of a property value.
fn text(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Convert a GeoJSON geometry to a KML geometry.
fn convert_geometry(value: &Value) -> Result<Geometry<CoordValue>, Error> {
    Ok(match value {
        Value::Point(position) => Geometry::Point(convert_point(position)?),
        Value::LineString(positions) => Geometry::LineString(convert_line(positions)?),
        Value::Polygon(rings) => Geometry::Polygon(convert_polygon(rings)?),
        Value::MultiPoint(positions) => multi_geometry(positions, |p| {
            convert_point(p).map(Geometry::Point)
        })?,
        Value::MultiLineString(lines) => multi_geometry(lines, |l| {
            convert_line(l).map(Geometry::LineString)
        })?,
        Value::MultiPolygon(polygons) => multi_geometry(polygons, |p| {
            convert_polygon(p).map(Geometry::Polygon)
        })?,
        Value::GeometryCollection(geometries) => {
            multi_geometry(geometries, |g| convert_geometry(&g.value))?
        }
    })
}

fn multi_geometry<T>(
    parts: &[T],
    convert: impl Fn(&T) -> Result<Geometry<CoordValue>, Error>,
) -> Result<Geometry<CoordValue>, Error> {
    Ok(Geometry::MultiGeometry(MultiGeometry {
        geometries: parts.iter().map(convert).collect::<Result<_, _>>()?,
        ..Default::default()
    }))
}

/// Convert a GeoJSON position with optional altitude.
fn convert_coord(position: &Position) -> Result<Coord<CoordValue>, Error> {
    match position[..] {
        [x, y] => Ok(Coord { x, y, z: None }),
        [x, y, z, ..] => Ok(Coord { x, y, z: Some(z) }),
        _ => Err(Error::UnsupportedGeometry(format!(
            "position with {} ordinates",
            position.len()
        ))),
    }
}

fn convert_coords(positions: &[Position]) -> Result<(Vec<Coord<CoordValue>>, AltitudeMode), Error> {
    let coords: Vec<_> = positions
        .iter()
        .map(convert_coord)
        .collect::<Result<_, _>>()?;
    let altitude_mode = altitude_mode(coords.iter().any(|c| c.z.is_some()));
    Ok((coords, altitude_mode))
}

fn altitude_mode(elevation_avail: bool) -> AltitudeMode {
    if elevation_avail {
        AltitudeMode::Absolute
    } else {
        Default::default()
    }
}

fn convert_point(position: &Position) -> Result<Point<CoordValue>, Error> {
    let coord = convert_coord(position)?;
    Ok(Point {
        altitude_mode: altitude_mode(coord.z.is_some()),
        coord,
        ..Default::default()
    })
}

fn convert_line(positions: &[Position]) -> Result<LineString<CoordValue>, Error> {
    let (coords, altitude_mode) = convert_coords(positions)?;
    Ok(LineString {
        tessellate: DEFAULT_TESSELLATE,
        altitude_mode,
        coords,
        ..Default::default()
    })
}

fn convert_ring(positions: &[Position]) -> Result<LinearRing<CoordValue>, Error> {
    let (coords, altitude_mode) = convert_coords(positions)?;
    Ok(LinearRing {
        tessellate: DEFAULT_TESSELLATE,
        altitude_mode,
        coords,
        ..Default::default()
    })
}

/// The first ring is the outer boundary, all others are holes.
fn convert_polygon(rings: &[Vec<Position>]) -> Result<Polygon<CoordValue>, Error> {
    let (outer, inner) = rings
        .split_first()
        .ok_or_else(|| Error::UnsupportedGeometry("polygon without rings".to_string()))?;
    let outer = convert_ring(outer)?;
    Ok(Polygon {
        altitude_mode: altitude_mode(outer.coords.iter().any(|c| c.z.is_some())),
        outer,
        inner: inner
            .iter()
            .map(|r| convert_ring(r))
            .collect::<Result<_, _>>()?,
        tessellate: DEFAULT_TESSELLATE,
        ..Default::default()
    })
}

/// Build an id uniquely describing the line and fill style in `properties`.
///
/// Each present key contributes a `<prefix>_<value>` part, parts are joined
/// by `-`. Non-alphanumeric characters of values are escaped as `_<hex>_`,
/// so distinct styles never share an id.
///
/// Returns [`None`] if `properties` contain no line or fill style.
fn style_id(properties: &JsonObject) -> Option<String> {
    let parts = [
        ("stroke", "s"),
        ("stroke-width", "sw"),
        ("stroke-opacity", "so"),
        ("fill", "f"),
        ("fill-opacity", "fo"),
    ];
    let id: Vec<_> = parts
        .into_iter()
        .filter_map(|(key, prefix)| {
            let value = text(properties.get(key)?);
            // `#` is optional in colours.
            let value = match key {
                "stroke" | "fill" => value.trim_start_matches('#').to_string(),
                _ => value,
            };
            Some(format!("{prefix}_{}", escape_id(&value)))
        })
        .collect();
    Some(id.join("-")).filter(|id| !id.is_empty())
}

fn escape_id(value: &str) -> String {
    let mut escaped = String::new();
    for c in value.chars() {
        if c.is_ascii_alphanumeric() {
            escaped.push(c);
        } else {
            escaped.push_str(&format!("_{:x}_", u32::from(c)));
        }
    }
    escaped
}

/// Create the shared _Style_ element with `id` for `properties`.
fn line_style(properties: &JsonObject, id: &str) -> Element {
    let color = kml_color(properties.get("stroke"), properties.get("stroke-opacity"))
        .unwrap_or_else(|| DEFAULT_LINE_COLOR.to_string());
    let width = properties
        .get("stroke-width")
        .map(text)
        .unwrap_or_else(|| DEFAULT_LINE_WIDTH.to_string());

    let mut children = vec![Element {
        name: "LineStyle".to_string(),
        children: vec![simple_element("color", color), simple_element("width", width)],
        ..Default::default()
    }];
    if properties.contains_key("fill") || properties.contains_key("fill-opacity") {
        let fill = kml_color(properties.get("fill"), properties.get("fill-opacity"))
            .unwrap_or_else(|| DEFAULT_FILL_COLOR.to_string());
        children.push(Element {
            name: "PolyStyle".to_string(),
            children: vec![simple_element("color", fill)],
            ..Default::default()
        });
    }

    Element {
        name: "Style".to_string(),
        attrs: HashMap::from([("id".to_string(), id.to_string())]),
        children,
        ..Default::default()
    }
}

/// Convert a CSS hex colour with opacity to the KML `aabbggrr` format.
///
/// Returns [`None`] if `color` is not a three or six digit hex colour.
fn kml_color(color: Option<&JsonValue>, opacity: Option<&JsonValue>) -> Option<String> {
    let hex = color?.as_str()?.trim_start_matches('#').to_ascii_lowercase();
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let hex = match hex.len() {
        3 => hex.chars().flat_map(|c| [c, c]).collect(),
        6 => hex,
        _ => return None,
    };

    let alpha = opacity
        .and_then(JsonValue::as_f64)
        .filter(|o| (0.0..=1.0).contains(o))
        .map_or(0xff, |o| (o * 255.0).floor() as u8);
    Some(format!("{alpha:02x}{}{}{}", &hex[4..6], &hex[2..4], &hex[0..2]))
}

/// Create the _ExtendedData_ listing all `properties`.
fn extended_data(properties: &JsonObject) -> Element {
    let children = properties
        .iter()
        .map(|(key, value)| Element {
            name: "Data".to_string(),
            attrs: HashMap::from([("name".to_string(), key.clone())]),
            children: vec![simple_element("value", text(value))],
            ..Default::default()
        })
        .collect();

    Element {
        name: "ExtendedData".to_string(),
        children,
        ..Default::default()
    }
}

/// Create a simple KML element with `name` and `content`.
fn simple_element(name: impl Into<String>, content: impl Into<String>) -> Element {
    Element {
        name: name.into(),
        content: Some(content.into()),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::new_feature;
    use crate::style::{grid_style, route_style};

    fn render(features: &[Feature]) -> String {
        let mut sink = vec![];
        write_kml(features, &mut sink).expect("writing KML failed");
        String::from_utf8(sink).expect("KML is not valid UTF-8")
    }

    fn line() -> Value {
        Value::LineString(vec![vec![1.0, 2.0], vec![3.0, 4.0, 5.0]])
    }

    #[test]
    fn test_document() {
        let kml = render(&[]);
        assert!(kml.starts_with(XML_HEAD));
        assert!(kml.contains(r#"xmlns="http://www.opengis.net/kml/2.2""#));
        assert!(kml.contains("<Document"));
        assert!(kml.ends_with("</kml>\n"));
    }

    #[test]
    fn test_route_style() {
        let kml = render(&[
            new_feature(line(), Some(route_style())),
            new_feature(line(), Some(route_style())),
        ]);
        assert_eq!(kml.matches("<Style ").count(), 1);
        assert!(kml.contains(r#"id="s_4264fb-sw_10-so_0_2e_5""#));
        assert!(kml.contains("<color>7ffb6442</color>"));
        assert!(kml.contains("<width>10</width>"));
        assert_eq!(kml.matches("<styleUrl>#s_4264fb-sw_10-so_0_2e_5</styleUrl>").count(), 2);
        assert_eq!(kml.matches("<LineString>").count(), 2);
        assert!(kml.contains("<altitudeMode>absolute</altitudeMode>"));
    }

    #[test]
    fn test_grid_style() {
        let kml = render(&[new_feature(
            Value::MultiLineString(vec![vec![vec![0.0, 0.0], vec![0.0, 1.0]]]),
            Some(grid_style()),
        )]);
        assert!(kml.contains(r#"id="s_ff0000-sw_1""#));
        assert!(kml.contains("<color>ff0000ff</color>"));
        assert!(kml.contains("<MultiGeometry>"));
    }

    #[test]
    fn test_points_are_unstyled() {
        let kml = render(&[new_feature(Value::Point(vec![1.0, 2.0]), Some(route_style()))]);
        assert!(kml.contains("<Point>"));
        assert!(!kml.contains("<Style"));
        assert!(!kml.contains("<styleUrl>"));
    }

    #[test]
    fn test_name_and_extended_data() {
        let mut properties = JsonObject::new();
        properties.insert("name".to_string(), "Walk & Talk".into());
        properties.insert("number".to_string(), 3.into());
        let kml = render(&[
            new_feature(line(), Some(properties)),
            new_feature(line(), None),
        ]);
        assert!(kml.contains("<name>Walk &amp; Talk</name>"));
        assert!(kml.contains("<value>3</value>"));
        assert_eq!(kml.matches("<ExtendedData>").count(), 1);
        assert_eq!(kml.matches("<Placemark>").count(), 2);
    }

    #[test]
    fn test_style_ids_are_distinct() {
        let style = |width: JsonValue| {
            let mut properties = JsonObject::new();
            properties.insert("stroke-width".to_string(), width);
            style_id(&properties).unwrap()
        };
        assert_ne!(style(1.0.into()), style(10.into()));
        assert_ne!(style("1_0".into()), style(1.0.into()));
        assert_eq!(style(10.into()), "sw_10");

        let mut properties = JsonObject::new();
        properties.insert("stroke".to_string(), "w10".into());
        assert_ne!(style_id(&properties).unwrap(), style(10.into()));

        assert_eq!(style_id(&JsonObject::new()), None);
    }

    #[test]
    fn test_placemark_order() {
        let kml = render(&[new_feature(line(), Some(route_style()))]);
        let position = |tag: &str| kml.find(tag).unwrap_or_else(|| panic!("{tag} missing"));
        assert!(position("<styleUrl>") < position("<ExtendedData>"));
        assert!(position("<ExtendedData>") < position("<LineString>"));
    }

    #[test]
    fn test_polygon() {
        let ring = vec![vec![0.0, 0.0], vec![1.0, 0.0], vec![1.0, 1.0], vec![0.0, 0.0]];
        let kml = render(&[new_feature(Value::Polygon(vec![ring.clone(), ring]), None)]);
        assert!(kml.contains("<outerBoundaryIs>"));
        assert!(kml.contains("<innerBoundaryIs>"));
    }

    #[test]
    fn test_kml_color() {
        let color = |c: &str, o: Option<f64>| {
            kml_color(Some(&c.into()), o.map(JsonValue::from).as_ref())
        };
        assert_eq!(color("#4264fb", Some(0.5)).as_deref(), Some("7ffb6442"));
        assert_eq!(color("#ff0000", None).as_deref(), Some("ff0000ff"));
        assert_eq!(color("#abc", Some(0.0)).as_deref(), Some("00ccbbaa"));
        assert_eq!(color("#12345", None), None);
        assert_eq!(color("red", None), None);
        assert_eq!(color("#FF0000", Some(2.0)).as_deref(), Some("ff0000ff"));
    }

    #[test]
    fn test_missing_geometry() {
        let feature = Feature {
            geometry: None,
            ..new_feature(line(), None)
        };
        let mut sink = vec![];
        let err = write_kml(&[feature], &mut sink).unwrap_err();
        assert!(matches!(err, Error::UnsupportedGeometry(_)), "unexpected error: {err:?}");
        assert!(sink.is_empty());
    }

    #[test]
    fn test_short_position() {
        let feature = new_feature(Value::LineString(vec![vec![1.0, 2.0], vec![3.0]]), None);
        let mut sink = vec![];
        let err = write_kml(&[feature], &mut sink).unwrap_err();
        assert!(matches!(err, Error::UnsupportedGeometry(_)), "unexpected error: {err:?}");
        assert!(sink.is_empty());
    }
}
