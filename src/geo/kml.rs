// KML geofence ingestion
//
// A restaurant's geofence is stored as the raw <coordinates> text of a
// Polygon/outerBoundaryIs/LinearRing. Tuples are "lng,lat[,alt]" separated by
// whitespace; altitude is ignored.

use regex::Regex;
use std::sync::OnceLock;

use crate::geo::GeoError;

fn coordinates_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)<coordinates[^>]*>(.*?)</coordinates>").unwrap())
}

/// Parse a geofence ring from stored KML text
///
/// Accepts either the bare <coordinates> payload or a full KML document, in
/// which case the first <coordinates> element is used (the outer boundary in
/// the files the chain uploads).
pub fn parse_ring(kml: &str) -> Result<Vec<(f64, f64)>, GeoError> {
    let payload = match coordinates_regex().captures(kml) {
        Some(captures) => captures.get(1).map(|m| m.as_str()).unwrap_or(""),
        None => kml,
    };

    let mut ring = Vec::new();
    for tuple in payload.split_whitespace() {
        let mut parts = tuple.split(',');
        let lng = parts
            .next()
            .and_then(|s| s.trim().parse::<f64>().ok())
            .ok_or_else(|| GeoError::MalformedRing(format!("bad tuple: {}", tuple)))?;
        let lat = parts
            .next()
            .and_then(|s| s.trim().parse::<f64>().ok())
            .ok_or_else(|| GeoError::MalformedRing(format!("bad tuple: {}", tuple)))?;
        // Third component, when present, is altitude; dropped
        ring.push((lng, lat));
    }

    Ok(ring)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bare_coordinates() {
        let ring = parse_ring("-90.52,14.62 -90.49,14.62 -90.49,14.65 -90.52,14.62").unwrap();
        assert_eq!(ring.len(), 4);
        assert_eq!(ring[0], (-90.52, 14.62));
    }

    #[test]
    fn test_parse_with_altitude() {
        let ring = parse_ring("-90.52,14.62,0 -90.49,14.62,0 -90.49,14.65,0").unwrap();
        assert_eq!(ring, vec![(-90.52, 14.62), (-90.49, 14.62), (-90.49, 14.65)]);
    }

    #[test]
    fn test_parse_full_kml_document() {
        let kml = r#"<?xml version="1.0" encoding="UTF-8"?>
            <kml xmlns="http://www.opengis.net/kml/2.2"><Document><Placemark>
            <Polygon><outerBoundaryIs><LinearRing><coordinates>
                -90.52,14.62,0
                -90.49,14.62,0
                -90.49,14.65,0
                -90.52,14.62,0
            </coordinates></LinearRing></outerBoundaryIs></Polygon>
            </Placemark></Document></kml>"#;
        let ring = parse_ring(kml).unwrap();
        assert_eq!(ring.len(), 4);
        assert_eq!(ring[2], (-90.49, 14.65));
    }

    #[test]
    fn test_empty_input_yields_empty_ring() {
        assert!(parse_ring("").unwrap().is_empty());
    }

    #[test]
    fn test_malformed_tuple_rejected() {
        assert!(parse_ring("-90.52,14.62 not-a-tuple").is_err());
        assert!(parse_ring("-90.52").is_err());
    }
}
