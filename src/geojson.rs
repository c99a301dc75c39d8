//! GeoJSON data model for decoded map features.
//!
//! Only the subset of GeoJSON the map feature layers produce is modelled:
//! points, polygons, and the empty geometry object emitted for detections
//! without an image.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Feature properties, kept in insertion order.
pub type Properties = Map<String, Value>;

/// A longitude/latitude pair.
pub type Position = [f64; 2];

/// A bounding box in WGS84 degrees.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl BoundingBox {
    pub fn new(west: f64, south: f64, east: f64, north: f64) -> BoundingBox {
        BoundingBox {
            west,
            south,
            east,
            north,
        }
    }

    /// Closed-interval containment; points on the edges are inside.
    ///
    /// A box with `west > east` crosses the antimeridian and takes in the
    /// longitudes east of `west` and west of `east`.
    pub fn contains(&self, position: &Position) -> bool {
        let [lng, lat] = *position;
        let in_lng = if self.crosses_antimeridian() {
            lng >= self.west || lng <= self.east
        } else {
            lng >= self.west && lng <= self.east
        };

        in_lng && lat >= self.south && lat <= self.north
    }

    pub fn crosses_antimeridian(&self) -> bool {
        self.west > self.east
    }

    /// The smallest box enclosing every position, or `None` when there are none.
    pub fn enclosing<'a, I>(positions: I) -> Option<BoundingBox>
    where
        I: IntoIterator<Item = &'a Position>,
    {
        positions.into_iter().fold(None, |acc, [lng, lat]| {
            Some(match acc {
                None => BoundingBox::new(*lng, *lat, *lng, *lat),
                Some(bbox) => BoundingBox::new(
                    bbox.west.min(*lng),
                    bbox.south.min(*lat),
                    bbox.east.max(*lng),
                    bbox.north.max(*lat),
                ),
            })
        })
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawGeometry", into = "RawGeometry")]
pub enum Geometry {
    /// Serialized as `{}`.
    Empty,
    Point(Position),
    Polygon(Vec<Vec<Position>>),
}

impl Geometry {
    pub fn as_point(&self) -> Option<&Position> {
        match self {
            Geometry::Point(position) => Some(position),
            _ => None,
        }
    }

    /// Every vertex of the geometry, in order.
    pub fn positions(&self) -> Vec<&Position> {
        match self {
            Geometry::Empty => Vec::new(),
            Geometry::Point(position) => vec![position],
            Geometry::Polygon(rings) => rings.iter().flatten().collect(),
        }
    }
}

// Wire shape of a geometry object. Both fields are absent for the empty geometry.
#[derive(Clone, Serialize, Deserialize)]
struct RawGeometry {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    coordinates: Option<Value>,
}

impl TryFrom<RawGeometry> for Geometry {
    type Error = String;

    fn try_from(raw: RawGeometry) -> Result<Self, Self::Error> {
        match (raw.kind.as_deref(), raw.coordinates) {
            (None, None) => Ok(Geometry::Empty),
            (Some("Point"), Some(coordinates)) => serde_json::from_value(coordinates)
                .map(Geometry::Point)
                .map_err(|e| format!("invalid Point coordinates: {}", e)),
            (Some("Polygon"), Some(coordinates)) => serde_json::from_value(coordinates)
                .map(Geometry::Polygon)
                .map_err(|e| format!("invalid Polygon coordinates: {}", e)),
            (Some(kind), Some(_)) => Err(format!("unsupported geometry type `{}`", kind)),
            (Some(kind), None) => Err(format!("{} geometry has no coordinates", kind)),
            (None, Some(_)) => Err(String::from("geometry has coordinates but no type")),
        }
    }
}

impl From<Geometry> for RawGeometry {
    fn from(geometry: Geometry) -> Self {
        let (kind, coordinates) = match geometry {
            Geometry::Empty => return RawGeometry { kind: None, coordinates: None },
            Geometry::Point([lng, lat]) => ("Point", Value::from(vec![lng, lat])),
            Geometry::Polygon(rings) => (
                "Polygon",
                Value::from(
                    rings
                        .into_iter()
                        .map(|ring| {
                            Value::from(
                                ring.into_iter()
                                    .map(|[lng, lat]| Value::from(vec![lng, lat]))
                                    .collect::<Vec<_>>(),
                            )
                        })
                        .collect::<Vec<_>>(),
                ),
            ),
        };

        RawGeometry {
            kind: Some(String::from(kind)),
            coordinates: Some(coordinates),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "Feature")]
pub struct Feature {
    pub geometry: Geometry,
    #[serde(default)]
    pub properties: Properties,
}

impl Feature {
    pub fn new(geometry: Geometry, properties: Properties) -> Feature {
        Feature {
            geometry,
            properties,
        }
    }

    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "FeatureCollection")]
pub struct FeatureCollection {
    #[serde(default)]
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    pub fn new(features: Vec<Feature>) -> FeatureCollection {
        FeatureCollection { features }
    }

    /// Compact JSON encoding of the collection.
    pub fn to_json_string(&self) -> Result<String, crate::Error> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json_str(data: &str) -> Result<FeatureCollection, crate::Error> {
        Ok(serde_json::from_str(data)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_point_feature_wire_format() {
        let mut properties = Properties::new();
        properties.insert(String::from("value"), json!("object--street-light"));
        properties.insert(String::from("id"), json!(481978503020355_u64));
        let feature = Feature::new(Geometry::Point([-80.5, 25.75]), properties);

        let encoded = serde_json::to_string(&feature).expect("Unable to encode feature");
        assert_eq!(
            r#"{"type":"Feature","geometry":{"type":"Point","coordinates":[-80.5,25.75]},"properties":{"value":"object--street-light","id":481978503020355}}"#,
            encoded
        );
    }

    #[test]
    fn test_empty_geometry_is_empty_object() {
        let encoded = serde_json::to_string(&Geometry::Empty).expect("Unable to encode geometry");
        assert_eq!("{}", encoded);

        let decoded: Geometry = serde_json::from_str("{}").expect("Unable to decode geometry");
        assert_eq!(Geometry::Empty, decoded);
    }

    #[test]
    fn test_parse_polygon_collection() {
        let data = r#"{
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "properties": {},
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[[7.25, 43.69], [7.27, 43.69], [7.27, 43.70], [7.25, 43.69]]]
                }
            }]
        }"#;

        let collection = FeatureCollection::from_json_str(data).expect("Unable to parse GeoJSON");
        assert_eq!(1, collection.features.len());
        match &collection.features[0].geometry {
            Geometry::Polygon(rings) => {
                assert_eq!(1, rings.len());
                assert_eq!(4, rings[0].len());
                assert_eq!([7.27, 43.70], rings[0][2]);
            }
            other => panic!("Expected a polygon, got {:?}", other),
        }
    }

    #[test]
    fn test_unsupported_geometry_is_rejected() {
        let data = r#"{"type": "LineString", "coordinates": [[0.0, 0.0], [1.0, 1.0]]}"#;
        assert!(serde_json::from_str::<Geometry>(data).is_err());
    }

    #[test]
    fn test_bbox_contains_edges() {
        let bbox = BoundingBox::new(-10.0, -10.0, 10.0, 10.0);
        assert!(bbox.contains(&[10.0, -10.0]));
        assert!(bbox.contains(&[0.0, 0.0]));
        assert!(!bbox.contains(&[10.000001, 0.0]));
    }

    #[test]
    fn test_bbox_across_antimeridian() {
        let bbox = BoundingBox::new(179.0, -1.0, -179.0, 1.0);
        assert!(bbox.crosses_antimeridian());
        assert!(bbox.contains(&[179.5, 0.5]));
        assert!(bbox.contains(&[-179.5, 0.5]));
        assert!(bbox.contains(&[180.0, 1.0]));
        assert!(!bbox.contains(&[0.0, 0.0]));
        assert!(!bbox.contains(&[179.5, 2.0]));
    }

    #[test]
    fn test_enclosing_bbox() {
        let positions = vec![[1.0, 2.0], [-3.0, 5.0], [4.0, -1.0]];
        let bbox = BoundingBox::enclosing(&positions).expect("Expected a bounding box");
        assert_eq!(BoundingBox::new(-3.0, -1.0, 4.0, 5.0), bbox);
        assert_eq!(None, BoundingBox::enclosing(&Vec::new()));
    }
}
