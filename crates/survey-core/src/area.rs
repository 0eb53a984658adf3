//! Area definition parsing.
//!
//! Regions arrive as placemarks whose coordinates are whitespace-separated
//! `lon,lat[,alt]` tuples. Four names are required; anything else in the
//! document is ignored.

use std::collections::BTreeMap;

use roxmltree::{Document, Node};

use crate::error::AreaError;
use crate::models::{AreaConfig, GeoPoint, Polygon};

pub const TAKEOFF_REGION: &str = "Take-Off Location";
pub const SENSITIVE_REGION: &str = "Sensitive Area";
pub const SURVEY_REGION: &str = "Survey Area";
pub const FLIGHT_REGION: &str = "Flight Region";

pub const REQUIRED_REGIONS: [&str; 4] =
    [TAKEOFF_REGION, SENSITIVE_REGION, SURVEY_REGION, FLIGHT_REGION];

/// Parse a coordinate list such as `"-2.67,51.42,0 -2.66,51.42,0"`.
pub fn parse_coordinates(region: &str, text: &str) -> Result<Vec<GeoPoint>, AreaError> {
    let malformed = |detail: String| AreaError::MalformedCoordinates {
        region: region.to_string(),
        detail,
    };

    let mut points = Vec::new();
    for tuple in text.split_whitespace() {
        let parts: Vec<&str> = tuple.split(',').collect();
        if !(2..=3).contains(&parts.len()) {
            return Err(malformed(format!("expected lon,lat[,alt], got '{tuple}'")));
        }
        let mut values = [0.0; 3];
        for (slot, part) in values.iter_mut().zip(&parts) {
            *slot = part
                .trim()
                .parse::<f64>()
                .map_err(|_| malformed(format!("'{part}' is not a number")))?;
        }
        let [lon, lat, _alt] = values;
        if !lat.is_finite() || !lon.is_finite() {
            return Err(malformed(format!("non-finite coordinate in '{tuple}'")));
        }
        points.push(GeoPoint::new(lat, lon));
    }

    if points.is_empty() {
        return Err(AreaError::EmptyRegion(region.to_string()));
    }
    Ok(points)
}

fn parse_point(region: &str, text: &str) -> Result<GeoPoint, AreaError> {
    match parse_coordinates(region, text)?.as_slice() {
        [point] => Ok(*point),
        points => Err(AreaError::MalformedCoordinates {
            region: region.to_string(),
            detail: format!("expected a single point, got {}", points.len()),
        }),
    }
}

fn parse_polygon(region: &str, text: &str) -> Result<Polygon, AreaError> {
    let polygon = Polygon::new(parse_coordinates(region, text)?);
    if polygon.is_empty() {
        return Err(AreaError::MalformedCoordinates {
            region: region.to_string(),
            detail: "a polygon needs at least 3 vertices".to_string(),
        });
    }
    Ok(polygon)
}

fn child<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.children()
        .find(|n| n.is_element() && n.tag_name().name() == name)
}

fn descendant<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.descendants()
        .find(|n| n.is_element() && n.tag_name().name() == name)
}

fn coordinates_text(placemark: Node) -> Option<String> {
    let polygon = descendant(placemark, "Polygon")
        .and_then(|poly| descendant(poly, "outerBoundaryIs"))
        .and_then(|outer| descendant(outer, "LinearRing"))
        .and_then(|ring| child(ring, "coordinates"));
    let point = descendant(placemark, "Point").and_then(|pt| child(pt, "coordinates"));

    polygon
        .or(point)
        .and_then(|coords| coords.text())
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}

/// Collect `name -> coordinate text` for every placemark in a KML document.
///
/// Element names are matched without their namespace. A polygon wins over a
/// point when a placemark carries both.
pub fn extract_regions(kml: &str) -> Result<BTreeMap<String, String>, AreaError> {
    let doc = Document::parse(kml)?;
    let mut regions = BTreeMap::new();

    for placemark in doc
        .descendants()
        .filter(|n| n.is_element() && n.tag_name().name() == "Placemark")
    {
        let Some(name) = child(placemark, "name").and_then(|n| n.text()) else {
            continue;
        };
        if let Some(coords) = coordinates_text(placemark) {
            regions.insert(name.trim().to_string(), coords);
        }
    }

    Ok(regions)
}

impl AreaConfig {
    /// Build from pre-extracted coordinate strings keyed by region name.
    pub fn from_regions(regions: &BTreeMap<String, String>) -> Result<Self, AreaError> {
        let text = |name: &str| {
            regions
                .get(name)
                .map(String::as_str)
                .ok_or_else(|| AreaError::MissingRegion(name.to_string()))
        };

        Ok(Self {
            takeoff: parse_point(TAKEOFF_REGION, text(TAKEOFF_REGION)?)?,
            sensitive: parse_polygon(SENSITIVE_REGION, text(SENSITIVE_REGION)?)?,
            survey: parse_polygon(SURVEY_REGION, text(SURVEY_REGION)?)?,
            flight_region: parse_polygon(FLIGHT_REGION, text(FLIGHT_REGION)?)?,
        })
    }

    /// Build from a KML document.
    pub fn from_kml(kml: &str) -> Result<Self, AreaError> {
        Self::from_regions(&extract_regions(kml)?)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const SAMPLE_KML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<kml xmlns="http://www.opengis.net/kml/2.2" xmlns:gx="http://www.google.com/kml/ext/2.2">
  <Document>
    <Placemark>
      <name>Take-Off Location</name>
      <Point><coordinates>-2.6715,51.4234,0</coordinates></Point>
    </Placemark>
    <Placemark>
      <name>Sensitive Area</name>
      <Polygon><outerBoundaryIs><LinearRing><coordinates>
        -2.6700,51.4240,0 -2.6690,51.4240,0 -2.6690,51.4250,0 -2.6700,51.4250,0 -2.6700,51.4240,0
      </coordinates></LinearRing></outerBoundaryIs></Polygon>
    </Placemark>
    <Placemark>
      <name>Survey Area</name>
      <Polygon><outerBoundaryIs><LinearRing><coordinates>
        -2.6680,51.4230,0 -2.6660,51.4230,0 -2.6660,51.4245,0 -2.6680,51.4245,0 -2.6680,51.4230,0
      </coordinates></LinearRing></outerBoundaryIs></Polygon>
    </Placemark>
    <Placemark>
      <name>Flight Region</name>
      <Polygon><outerBoundaryIs><LinearRing><coordinates>
        -2.6730,51.4220,0 -2.6650,51.4220,0 -2.6650,51.4260,0 -2.6730,51.4260,0 -2.6730,51.4220,0
      </coordinates></LinearRing></outerBoundaryIs></Polygon>
    </Placemark>
    <Placemark>
      <name>Car Park</name>
      <Point><coordinates>-2.6720,51.4225,0</coordinates></Point>
    </Placemark>
  </Document>
</kml>"#;

    #[test]
    fn parses_all_required_regions() {
        let area = AreaConfig::from_kml(SAMPLE_KML).unwrap();
        assert_eq!(area.takeoff, GeoPoint::new(51.4234, -2.6715));
        assert_eq!(area.sensitive.vertices().len(), 4);
        assert_eq!(area.survey.vertices().len(), 4);
        assert_eq!(area.flight_region.ring().first(), area.flight_region.ring().last());
    }

    #[test]
    fn coordinates_swap_to_lat_lon() {
        let points = parse_coordinates("x", "10.5,20.25 11,21,100").unwrap();
        assert_eq!(points, vec![GeoPoint::new(20.25, 10.5), GeoPoint::new(21.0, 11.0)]);
    }

    #[test]
    fn missing_region_is_reported_by_name() {
        let kml = SAMPLE_KML.replace("Survey Area", "Somewhere Else");
        assert_eq!(
            AreaConfig::from_kml(&kml),
            Err(AreaError::MissingRegion(SURVEY_REGION.to_string()))
        );
    }

    #[test]
    fn non_numeric_coordinates_are_rejected() {
        let err = parse_coordinates("Survey Area", "1,2 abc,3").unwrap_err();
        assert!(matches!(err, AreaError::MalformedCoordinates { .. }));
    }

    #[test]
    fn empty_coordinates_are_rejected() {
        assert_eq!(
            parse_coordinates("Survey Area", "   "),
            Err(AreaError::EmptyRegion("Survey Area".to_string()))
        );
    }

    #[test]
    fn takeoff_must_be_single_point() {
        let mut regions = extract_regions(SAMPLE_KML).unwrap();
        regions.insert(TAKEOFF_REGION.to_string(), "1,2 3,4".to_string());
        assert!(matches!(
            AreaConfig::from_regions(&regions),
            Err(AreaError::MalformedCoordinates { .. })
        ));
    }

    #[test]
    fn broken_xml_is_a_parse_error() {
        assert!(matches!(AreaConfig::from_kml("<kml><Placemark>"), Err(AreaError::Xml(_))));
    }
}
