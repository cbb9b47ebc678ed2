//! Geometry values and their GeoJSON-style mapping form

use serde_json::{json, Value as JsonValue};

use crate::errors::{QueryError, QueryResult};

/// An (x, y) coordinate pair
pub type Coordinate = (f64, f64);

/// Well-known geometry shapes
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Point(Coordinate),
    LineString(Vec<Coordinate>),
    /// Exterior ring first, then holes
    Polygon(Vec<Vec<Coordinate>>),
}

impl Geometry {
    /// GeoJSON type name
    pub fn geometry_type(&self) -> &'static str {
        match self {
            Geometry::Point(_) => "Point",
            Geometry::LineString(_) => "LineString",
            Geometry::Polygon(_) => "Polygon",
        }
    }

    /// Canonical `{type, coordinates}` mapping
    pub fn to_mapping(&self) -> JsonValue {
        let coordinates = match self {
            Geometry::Point(c) => point(c),
            Geometry::LineString(line) => ring(line),
            Geometry::Polygon(rings) => JsonValue::Array(rings.iter().map(|r| ring(r)).collect()),
        };
        json!({
            "type": self.geometry_type(),
            "coordinates": coordinates,
        })
    }

    /// Parse well-known text (`POINT`, `LINESTRING`, `POLYGON`).
    ///
    /// Z and M ordinates are accepted and dropped.
    pub fn from_wkt(text: &str) -> QueryResult<Self> {
        let text = text.trim();
        let open = text.find('(').ok_or_else(|| wkt_error(text, "missing '('"))?;
        let close = text.rfind(')').ok_or_else(|| wkt_error(text, "missing ')'"))?;
        if close < open {
            return Err(wkt_error(text, "unbalanced parentheses"));
        }

        let tag = text[..open].trim().to_ascii_uppercase();
        let body = &text[open + 1..close];

        match tag.split_whitespace().next() {
            Some("POINT") => Ok(Geometry::Point(parse_coordinate(body)?)),
            Some("LINESTRING") => Ok(Geometry::LineString(parse_coordinates(body)?)),
            Some("POLYGON") => {
                let rings = split_groups(body)?
                    .into_iter()
                    .map(parse_coordinates)
                    .collect::<QueryResult<Vec<_>>>()?;
                if rings.is_empty() {
                    return Err(wkt_error(text, "polygon without rings"));
                }
                Ok(Geometry::Polygon(rings))
            }
            _ => Err(wkt_error(text, "unsupported geometry type")),
        }
    }
}

fn point(c: &Coordinate) -> JsonValue {
    json!([c.0, c.1])
}

fn ring(coords: &[Coordinate]) -> JsonValue {
    JsonValue::Array(coords.iter().map(point).collect())
}

fn wkt_error(text: &str, reason: &str) -> QueryError {
    QueryError::invalid_value("wkt", format!("{} in '{}'", reason, text))
}

fn parse_coordinate(text: &str) -> QueryResult<Coordinate> {
    let mut parts = text.split_whitespace().map(|p| {
        p.parse::<f64>()
            .map_err(|_| wkt_error(text, "coordinate is not numeric"))
    });
    match (parts.next(), parts.next()) {
        (Some(x), Some(y)) => Ok((x?, y?)),
        _ => Err(wkt_error(text, "coordinate needs two ordinates")),
    }
}

fn parse_coordinates(text: &str) -> QueryResult<Vec<Coordinate>> {
    text.split(',').map(parse_coordinate).collect()
}

/// Split `(a), (b)` into the text inside each top-level group
fn split_groups(text: &str) -> QueryResult<Vec<&str>> {
    let mut groups = Vec::new();
    let mut start = None;
    for (i, c) in text.char_indices() {
        match (c, start) {
            ('(', None) => start = Some(i + 1),
            (')', Some(s)) => {
                groups.push(&text[s..i]);
                start = None;
            }
            ('(', Some(_)) | (')', None) => {
                return Err(wkt_error(text, "nested or stray parenthesis"));
            }
            _ => {}
        }
    }
    if start.is_some() {
        return Err(wkt_error(text, "unterminated ring"));
    }
    Ok(groups)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_from_wkt() {
        let geom = Geometry::from_wkt("POINT (30 10)").unwrap();
        assert_eq!(geom, Geometry::Point((30.0, 10.0)));
        assert_eq!(
            geom.to_mapping(),
            json!({"type": "Point", "coordinates": [30.0, 10.0]})
        );
    }

    #[test]
    fn test_linestring_from_wkt() {
        let geom = Geometry::from_wkt("linestring(30 10, 10 30, 40 40)").unwrap();
        assert_eq!(
            geom,
            Geometry::LineString(vec![(30.0, 10.0), (10.0, 30.0), (40.0, 40.0)])
        );
    }

    #[test]
    fn test_polygon_with_hole() {
        let geom = Geometry::from_wkt(
            "POLYGON ((35 10, 45 45, 15 40, 10 20, 35 10), (20 30, 35 35, 30 20, 20 30))",
        )
        .unwrap();
        match &geom {
            Geometry::Polygon(rings) => {
                assert_eq!(rings.len(), 2);
                assert_eq!(rings[0][0], (35.0, 10.0));
                assert_eq!(rings[1].len(), 4);
            }
            other => panic!("expected polygon, got {:?}", other),
        }
        assert_eq!(geom.to_mapping()["type"], "Polygon");
    }

    #[test]
    fn test_z_ordinate_dropped() {
        let geom = Geometry::from_wkt("POINT Z (1 2 3)").unwrap();
        assert_eq!(geom, Geometry::Point((1.0, 2.0)));
    }

    #[test]
    fn test_invalid_wkt_rejected() {
        assert!(Geometry::from_wkt("CIRCLE (1 2)").is_err());
        assert!(Geometry::from_wkt("POINT (a b)").is_err());
        assert!(Geometry::from_wkt("POINT 1 2").is_err());
    }
}
