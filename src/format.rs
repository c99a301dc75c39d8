//! Conversions between decoded records, features and feature collections.
use std::collections::HashSet;

use serde_json::Value;

use crate::error::Error;
use crate::geojson::{Feature, FeatureCollection, Geometry, Properties};

/// Turns a decoded record into a feature.
///
/// The record's `geometry` becomes the feature geometry; every other attribute
/// is copied verbatim into the properties, in record order.
pub fn feature_to_geojson(record: Properties) -> Result<Feature, Error> {
    let mut properties = record;
    let geometry = properties
        .shift_remove("geometry")
        .ok_or(Error::MissingGeometry)?;

    Ok(Feature::new(serde_json::from_value(geometry)?, properties))
}

/// Wraps features merged from any number of tiles into one collection.
pub fn merged_features_list_to_geojson(features: Vec<Feature>) -> FeatureCollection {
    FeatureCollection::new(features)
}

pub fn geojson_to_features_list(collection: FeatureCollection) -> Vec<Feature> {
    collection.features
}

/// Enriches `src` with properties from the `dest` features it joins with.
///
/// A source and destination feature join when both carry their key property
/// and the keys are equal as integers. Every property the source feature did
/// not originally have is copied over from each joining destination feature;
/// when several destinations supply the same property, the last one wins.
/// Properties the source already had are never overwritten.
pub fn join_geojson_with_keys(
    src: &FeatureCollection,
    src_key: &str,
    dest: &FeatureCollection,
    dest_key: &str,
) -> FeatureCollection {
    let features = src
        .features
        .iter()
        .map(|feature| {
            let key = match feature.property(src_key).and_then(join_key) {
                Some(key) => key,
                None => return feature.clone(),
            };

            let original: HashSet<&String> = feature.properties.keys().collect();
            let mut properties = feature.properties.clone();

            for joined in dest
                .features
                .iter()
                .filter(|joined| joined.property(dest_key).and_then(join_key) == Some(key))
            {
                for (name, value) in joined.properties.iter() {
                    if !original.contains(name) {
                        properties.insert(name.clone(), value.clone());
                    }
                }
            }

            Feature::new(feature.geometry.clone(), properties)
        })
        .collect();

    FeatureCollection::new(features)
}

// Ids arrive both as JSON integers and as decimal strings.
fn join_key(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number
            .as_i64()
            .or_else(|| number.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Reshapes detection records into a collection located at their images.
///
/// Each record becomes a feature at its image's position (an empty geometry
/// when the record has no image). Properties are `image_id`, `created_at`,
/// `pixel_geometry`, `value` and `id`, each present only when the record has
/// the corresponding attribute set to something other than null.
pub fn detection_features_to_geojson(records: &[Properties]) -> Result<FeatureCollection, Error> {
    records
        .iter()
        .map(|record| -> Result<Feature, Error> {
            let image = record.get("image");

            let geometry = image
                .and_then(|image| image.pointer("/geometry/coordinates"))
                .and_then(|coordinates| serde_json::from_value(coordinates.clone()).ok())
                .map_or(Geometry::Empty, Geometry::Point);

            let mut properties = Properties::new();
            if let Some(image_id) = image
                .and_then(|image| image.get("id"))
                .filter(|id| !id.is_null())
            {
                properties.insert(String::from("image_id"), image_id.clone());
            }
            for (source, target) in [
                ("created_at", "created_at"),
                ("geometry", "pixel_geometry"),
                ("value", "value"),
            ] {
                if let Some(value) = record.get(source).filter(|value| !value.is_null()) {
                    properties.insert(String::from(target), value.clone());
                }
            }

            let id = record.get("id").ok_or_else(|| Error::MissingProperty {
                property: String::from("id"),
            })?;
            properties.insert(String::from("id"), id.clone());

            Ok(Feature::new(geometry, properties))
        })
        .collect::<Result<Vec<_>, _>>()
        .map(FeatureCollection::new)
}

/// Corrals the point features of a collection into a single polygon.
///
/// The polygon has one ring made of the point coordinates in collection order.
/// The ring is neither closed nor checked for a minimum number of points.
pub fn geojson_to_polygon(collection: &FeatureCollection) -> Feature {
    let ring = collection
        .features
        .iter()
        .filter_map(|feature| feature.geometry.as_point().copied())
        .collect();

    Feature::new(Geometry::Polygon(vec![ring]), Properties::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn properties(value: Value) -> Properties {
        match value {
            Value::Object(map) => map,
            other => panic!("Expected an object, got {}", other),
        }
    }

    fn point(lng: f64, lat: f64, props: Value) -> Feature {
        Feature::new(Geometry::Point([lng, lat]), properties(props))
    }

    #[test]
    fn test_feature_to_geojson() {
        let record = properties(json!({
            "geometry": {"type": "Point", "coordinates": [30.003755665554, 30.985948744314]},
            "id": "506566177256016",
            "object_value": "object--bench"
        }));

        let feature = feature_to_geojson(record).expect("Record should convert");
        assert_eq!(Geometry::Point([30.003755665554, 30.985948744314]), feature.geometry);
        assert_eq!(
            vec!["id", "object_value"],
            feature.properties.keys().map(String::as_str).collect::<Vec<_>>()
        );
        assert_eq!(Some(&json!("506566177256016")), feature.property("id"));
    }

    #[test]
    fn test_feature_without_geometry() {
        let record = properties(json!({"id": "506566177256016"}));
        assert!(matches!(feature_to_geojson(record), Err(Error::MissingGeometry)));
    }

    #[test]
    fn test_merge_and_extract_preserve_order() {
        let features = vec![
            point(1.0, 1.0, json!({"id": 1})),
            point(2.0, 2.0, json!({"id": 2})),
            point(3.0, 3.0, json!({"id": 3})),
        ];

        let collection = merged_features_list_to_geojson(features.clone());
        assert_eq!(features, geojson_to_features_list(collection));

        let empty = merged_features_list_to_geojson(Vec::new());
        assert_eq!(
            r#"{"type":"FeatureCollection","features":[]}"#,
            empty.to_json_string().unwrap()
        );
    }

    #[test]
    fn test_join_copies_missing_properties_only() {
        let src = FeatureCollection::new(vec![
            point(0.0, 0.0, json!({"id": 1, "value": "original"})),
            point(1.0, 1.0, json!({"id": 2})),
            point(2.0, 2.0, json!({"name": "no key"})),
        ]);
        let dest = FeatureCollection::new(vec![
            point(9.0, 9.0, json!({"key": "1", "value": "ignored", "first_seen_at": 10})),
            point(9.0, 9.0, json!({"key": 3, "first_seen_at": 30})),
        ]);

        let joined = join_geojson_with_keys(&src, "id", &dest, "key");

        assert_eq!(
            properties(json!({"id": 1, "value": "original", "key": "1", "first_seen_at": 10})),
            joined.features[0].properties
        );
        assert_eq!(properties(json!({"id": 2})), joined.features[1].properties);
        assert_eq!(src.features[2], joined.features[2]);
        // Pure: the source collection is untouched
        assert_eq!(2, src.features[0].properties.len());
    }

    #[test]
    fn test_join_last_match_wins() {
        let src = FeatureCollection::new(vec![point(0.0, 0.0, json!({"id": 7}))]);
        let dest = FeatureCollection::new(vec![
            point(0.0, 0.0, json!({"id": 7, "last_seen_at": 1, "a": true})),
            point(0.0, 0.0, json!({"id": 7, "last_seen_at": 2})),
        ]);

        let joined = join_geojson_with_keys(&src, "id", &dest, "id");
        assert_eq!(Some(&json!(2)), joined.features[0].property("last_seen_at"));
        assert_eq!(Some(&json!(true)), joined.features[0].property("a"));
    }

    #[test]
    fn test_detection_without_optional_attributes() {
        let records = vec![properties(json!({"id": "1", "value": "v"}))];
        let collection = detection_features_to_geojson(&records).expect("Records should convert");

        assert_eq!(
            r#"{"type":"FeatureCollection","features":[{"type":"Feature","geometry":{},"properties":{"value":"v","id":"1"}}]}"#,
            collection.to_json_string().unwrap()
        );
    }

    #[test]
    fn test_detection_with_image() {
        let records = vec![properties(json!({
            "created_at": "2021-05-20T17:49:01+0000",
            "geometry": "GjUKBm1weS1vchIVEgIAABgDIg0JhiekKBoqAABKKQAPGgR0eXBlIgkKB3BvbHlnb24ogCB4AQ==",
            "image": {
                "geometry": {"type": "Point", "coordinates": [-97.743279722222, 30.270651388889]},
                "id": "1933525276802129"
            },
            "value": "regulatory--no-parking--g2",
            "id": "1942105415944115"
        }))];

        let collection = detection_features_to_geojson(&records).expect("Records should convert");
        let feature = &collection.features[0];

        assert_eq!(Geometry::Point([-97.743279722222, 30.270651388889]), feature.geometry);
        assert_eq!(
            vec!["image_id", "created_at", "pixel_geometry", "value", "id"],
            feature.properties.keys().map(String::as_str).collect::<Vec<_>>()
        );
        assert_eq!(Some(&json!("1933525276802129")), feature.property("image_id"));
    }

    #[test]
    fn test_detection_skips_null_attributes() {
        let records = vec![properties(json!({
            "id": "1",
            "value": null,
            "created_at": null,
            "geometry": null,
            "image": {"id": null}
        }))];
        let collection = detection_features_to_geojson(&records).expect("Records should convert");

        assert_eq!(
            r#"{"type":"FeatureCollection","features":[{"type":"Feature","geometry":{},"properties":{"id":"1"}}]}"#,
            collection.to_json_string().unwrap()
        );
    }

    #[test]
    fn test_detection_requires_id() {
        let records = vec![properties(json!({"value": "v"}))];
        assert!(matches!(
            detection_features_to_geojson(&records),
            Err(Error::MissingProperty { .. })
        ));
    }

    #[test]
    fn test_geojson_to_polygon() {
        let collection = FeatureCollection::new(vec![
            point(7.2564697265625, 43.69716905314008, json!({"id": 1})),
            point(7.27020263671875, 43.69419030566581, json!({"id": 2})),
        ]);

        let polygon = geojson_to_polygon(&collection);
        assert!(polygon.properties.is_empty());
        assert_eq!(
            Geometry::Polygon(vec![vec![
                [7.2564697265625, 43.69716905314008],
                [7.27020263671875, 43.69419030566581],
            ]]),
            polygon.geometry
        );
    }
}
