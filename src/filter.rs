//! Feature filters and the pipeline that chains them.
//!
//! Each [`Filter`] is a stateless test over a single feature. A pipeline is an
//! ordered list of [`Stage`]s; a feature survives only if every active stage
//! keeps it. Stages never modify features, so their order only affects how
//! early a rejected feature stops being evaluated.
use std::f64::consts::PI;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::trace;

use crate::error::Error;
use crate::geojson::{BoundingBox, Feature, FeatureCollection, Geometry, Position};

/// Property holding when a map feature was first observed, in epoch milliseconds.
pub const FIRST_SEEN_AT: &str = "first_seen_at";

/// Property holding when an image was captured, in epoch milliseconds.
pub const CAPTURED_AT: &str = "captured_at";

/// Mean earth radius used for great-circle distances, in meters.
const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// Units a haversine radius can be given in.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DistanceUnit {
    #[default]
    #[serde(rename = "m")]
    Meters,
    #[serde(rename = "km")]
    Kilometers,
    #[serde(rename = "mi")]
    Miles,
}

impl DistanceUnit {
    fn meters(&self) -> f64 {
        match self {
            DistanceUnit::Meters => 1.0,
            DistanceUnit::Kilometers => 1_000.0,
            DistanceUnit::Miles => 1_609.344,
        }
    }
}

/// Image coverage: panoramas, flat images, or both.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageType {
    Pano,
    Flat,
    All,
}

impl std::str::FromStr for ImageType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pano" => Ok(ImageType::Pano),
            "flat" => Ok(ImageType::Flat),
            "all" => Ok(ImageType::All),
            other => Err(Error::InvalidOption {
                param: String::from("image_type"),
                value: Value::from(other),
                options: vec![Value::from("pano"), Value::from("flat"), Value::from("all")],
            }),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Filter {
    /// Keeps features whose `value` property is one of the listed values.
    Values(Vec<Value>),
    /// Keeps features whose `property` is one of the listed values.
    Property { property: String, values: Vec<Value> },
    /// Keeps features lying inside the box, edges included.
    BoundingBox(BoundingBox),
    /// Keeps features first seen at or after the cutoff (epoch ms).
    ExistedAt(i64),
    /// Keeps features first seen at or before the cutoff (epoch ms).
    ExistedBefore(i64),
    /// Keeps features captured at or after the cutoff (epoch ms).
    MinDate(i64),
    /// Keeps features captured at or before the cutoff (epoch ms).
    MaxDate(i64),
    /// Keeps features captured within the closed range (epoch ms).
    DateRange(i64, i64),
    /// Keeps points closer than `radius` to `coords`.
    HaversineDistance {
        coords: Position,
        radius: f64,
        unit: DistanceUnit,
    },
    Coverage(ImageType),
    OrganizationId(Vec<Value>),
    /// Keeps points inside any of the polygons.
    InShape(Vec<Vec<Vec<Position>>>),
}

impl Filter {
    /// Whether the feature passes this filter.
    pub fn keep(&self, feature: &Feature) -> bool {
        match self {
            Filter::Values(values) => filter_values(feature, "value", values),
            Filter::Property { property, values } => filter_values(feature, property, values),
            Filter::BoundingBox(bbox) => features_in_bounding_box(feature, bbox),
            Filter::ExistedAt(cutoff) => existed_at(feature, *cutoff),
            Filter::ExistedBefore(cutoff) => existed_before(feature, *cutoff),
            Filter::MinDate(cutoff) => {
                timestamp(feature, CAPTURED_AT).map_or(false, |captured| captured >= *cutoff)
            }
            Filter::MaxDate(cutoff) => {
                timestamp(feature, CAPTURED_AT).map_or(false, |captured| captured <= *cutoff)
            }
            Filter::DateRange(min, max) => timestamp(feature, CAPTURED_AT)
                .map_or(false, |captured| captured >= *min && captured <= *max),
            Filter::HaversineDistance {
                coords,
                radius,
                unit,
            } => haversine_dist(feature, coords, *radius, *unit),
            Filter::Coverage(image_type) => coverage(feature, *image_type),
            Filter::OrganizationId(ids) => filter_values(feature, "organization_id", ids),
            Filter::InShape(polygons) => features_in_shape(feature, polygons),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Filter::Values(_) => "filter_values",
            Filter::Property { .. } => "params",
            Filter::BoundingBox(_) => "features_in_bounding_box",
            Filter::ExistedAt(_) => "existed_at",
            Filter::ExistedBefore(_) => "existed_before",
            Filter::MinDate(_) => "min_date",
            Filter::MaxDate(_) => "max_date",
            Filter::DateRange(..) => "daterange",
            Filter::HaversineDistance { .. } => "haversine_dist",
            Filter::Coverage(_) => "coverage",
            Filter::OrganizationId(_) => "organization_id",
            Filter::InShape(_) => "in_shape",
        }
    }
}

/// One step of a pipeline. Skipped stages pass every feature through.
#[derive(Clone, Debug, PartialEq)]
pub enum Stage {
    Active(Filter),
    Skipped,
}

impl Stage {
    pub fn keep(&self, feature: &Feature) -> bool {
        match self {
            Stage::Active(filter) => {
                let keep = filter.keep(feature);
                if !keep {
                    trace!(filter = filter.name(), properties = ?feature.properties, "Feature rejected");
                }
                keep
            }
            Stage::Skipped => true,
        }
    }
}

impl From<Filter> for Stage {
    fn from(filter: Filter) -> Self {
        Stage::Active(filter)
    }
}

impl From<Option<Filter>> for Stage {
    fn from(filter: Option<Filter>) -> Self {
        filter.map_or(Stage::Skipped, Stage::Active)
    }
}

/// Runs every feature of the collection through the stages, in order.
///
/// A feature is dropped at the first active stage that rejects it.
pub fn pipeline(collection: FeatureCollection, stages: &[Stage]) -> Vec<Feature> {
    collection
        .features
        .into_iter()
        .filter(|feature| stages.iter().all(|stage| stage.keep(feature)))
        .collect()
}

pub fn filter_values(feature: &Feature, property: &str, values: &[Value]) -> bool {
    feature
        .property(property)
        .map_or(false, |value| values.contains(value))
}

/// Exact containment of a feature in the query bbox.
///
/// Tiles only approximate the query region, so decoded content may spill past
/// the bbox. Points must lie in the closed box; polygons must have every vertex
/// in it. Features without coordinates never match.
pub fn features_in_bounding_box(feature: &Feature, bbox: &BoundingBox) -> bool {
    let positions = feature.geometry.positions();
    !positions.is_empty() && positions.into_iter().all(|position| bbox.contains(position))
}

pub fn existed_at(feature: &Feature, cutoff: i64) -> bool {
    timestamp(feature, FIRST_SEEN_AT).map_or(false, |first_seen| first_seen >= cutoff)
}

pub fn existed_before(feature: &Feature, cutoff: i64) -> bool {
    timestamp(feature, FIRST_SEEN_AT).map_or(false, |first_seen| first_seen <= cutoff)
}

pub fn haversine_dist(feature: &Feature, coords: &Position, radius: f64, unit: DistanceUnit) -> bool {
    feature
        .geometry
        .as_point()
        .map_or(false, |point| haversine(coords, point) / unit.meters() < radius)
}

pub fn coverage(feature: &Feature, image_type: ImageType) -> bool {
    let wanted = match image_type {
        ImageType::Pano => true,
        ImageType::Flat => false,
        ImageType::All => return true,
    };

    feature.property("is_pano").and_then(Value::as_bool) == Some(wanted)
}

pub fn features_in_shape(feature: &Feature, polygons: &[Vec<Vec<Position>>]) -> bool {
    feature.geometry.as_point().map_or(false, |point| {
        polygons
            .iter()
            .filter_map(|rings| rings.first())
            .any(|outer| point_in_ring(point, outer))
    })
}

/// Collects the polygons of a shape for use with [`Filter::InShape`].
pub fn shape_polygons(shape: &FeatureCollection) -> Vec<Vec<Vec<Position>>> {
    shape
        .features
        .iter()
        .filter_map(|feature| match &feature.geometry {
            Geometry::Polygon(rings) => Some(rings.clone()),
            _ => None,
        })
        .collect()
}

fn timestamp(feature: &Feature, property: &str) -> Option<i64> {
    feature.property(property).and_then(|value| {
        value
            .as_i64()
            .or_else(|| value.as_f64().map(|f| f as i64))
    })
}

// Great-circle distance in meters between two lon/lat positions.
fn haversine(from: &Position, to: &Position) -> f64 {
    let to_rad = PI / 180.0;
    let (lng1, lat1) = (from[0] * to_rad, from[1] * to_rad);
    let (lng2, lat2) = (to[0] * to_rad, to[1] * to_rad);

    let a = ((lat2 - lat1) / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * ((lng2 - lng1) / 2.0).sin().powi(2);

    2.0 * EARTH_RADIUS_M * a.sqrt().asin()
}

// Ray casting against a single ring
fn point_in_ring(point: &Position, ring: &[Position]) -> bool {
    let [x, y] = *point;
    let n = ring.len();
    let mut inside = false;

    for i in 0..n {
        let [xi, yi] = ring[i];
        let [xj, yj] = ring[(i + 1) % n];

        if (yi > y) != (yj > y) && x < (xj - xi) * (y - yi) / (yj - yi) + xi {
            inside = !inside;
        }
    }

    inside
}
