//! Validation of the filter arguments each query accepts.
//!
//! Every check runs before any tile is requested, so a rejected query never
//! costs a network round trip.
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Error;

/// Filter arguments, keyed by name.
pub type Kwargs = Map<String, Value>;

const ZOOM_LEVELS: [u8; 4] = [14, 15, 16, 17];
const IMAGE_TYPES: [&str; 3] = ["pano", "flat", "all"];
const THUMBNAIL_SIZES: [u32; 3] = [256, 1024, 2048];

/// Chronological filters accepted by the map feature point and traffic sign queries.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PointsTrafficSignsFilters {
    pub existed_at: Option<Value>,
    pub existed_before: Option<Value>,
}

/// Filters accepted by the image bounding box query.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageBboxFilters {
    pub max_captured_at: Option<Value>,
    pub min_captured_at: Option<Value>,
    pub image_type: Option<Value>,
    pub compass_angle: Option<Value>,
    pub sequence_id: Option<Value>,
    pub organization_id: Option<Value>,
}

/// Filters accepted by the sequence bounding box query.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SequenceBboxFilters {
    pub max_captured_at: Option<Value>,
    pub min_captured_at: Option<Value>,
    pub image_type: Option<Value>,
    pub organization_id: Option<Value>,
}

/// Checks that every kwarg is one of `options` and that recognised options
/// carry acceptable values.
///
/// `callback` names the calling operation in the resulting error.
pub fn kwarg_check(kwargs: &Kwargs, options: &[&str], callback: &str) -> Result<(), Error> {
    if let Some((key, value)) = kwargs
        .iter()
        .find(|(key, _)| !options.contains(&key.as_str()))
    {
        return Err(Error::InvalidKwarg {
            func: callback.to_owned(),
            key: key.clone(),
            value: value.clone(),
            options: options.iter().map(|option| option.to_string()).collect(),
        });
    }

    if (kwargs.contains_key("min_date") || kwargs.contains_key("max_date"))
        && kwargs.contains_key("daterange")
    {
        return Err(Error::Contradicting {
            contradicts: String::from("daterange"),
            contradicted: String::from("min_date/max_date"),
            message: String::from(
                "Using either or both of min_date and max_date, or use daterange, \
                 but not both at the same time",
            ),
        });
    }

    if let Some(zoom) = kwargs.get("zoom") {
        let (min, max) = (ZOOM_LEVELS[0], ZOOM_LEVELS[ZOOM_LEVELS.len() - 1]);
        let in_range = zoom
            .as_f64()
            .map_or(false, |zoom| zoom >= f64::from(min) && zoom <= f64::from(max));
        if !in_range {
            return Err(invalid_option("zoom", zoom, &ZOOM_LEVELS));
        }
    }

    for param in ["is_pano", "image_type"] {
        if let Some(value) = kwargs.get(param) {
            let allowed = value
                .as_str()
                .map_or(false, |image_type| IMAGE_TYPES.contains(&image_type));
            if !allowed {
                return Err(invalid_option(param, value, &IMAGE_TYPES));
            }
        }
    }

    Ok(())
}

/// Validates the filters of the map feature point and traffic sign queries.
pub fn points_traffic_signs_check(kwargs: &Kwargs) -> Result<PointsTrafficSignsFilters, Error> {
    kwarg_check(
        kwargs,
        &["existed_at", "existed_before"],
        "points_traffic_signs_check",
    )?;

    Ok(PointsTrafficSignsFilters {
        existed_at: non_null(kwargs, "existed_at"),
        existed_before: non_null(kwargs, "existed_before"),
    })
}

pub fn image_check(kwargs: &Kwargs) -> Result<(), Error> {
    kwarg_check(
        kwargs,
        &[
            "min_date",
            "max_date",
            "daterange",
            "radius",
            "image_type",
            "org_id",
            "fields",
        ],
        "image_check",
    )
}

pub fn image_bbox_check(kwargs: &Kwargs) -> Result<ImageBboxFilters, Error> {
    kwarg_check(
        kwargs,
        &[
            "max_captured_at",
            "min_captured_at",
            "image_type",
            "compass_angle",
            "organization_id",
            "sequence_id",
            "zoom",
        ],
        "image_bbox_check",
    )?;

    Ok(ImageBboxFilters {
        max_captured_at: non_null(kwargs, "max_captured_at"),
        min_captured_at: non_null(kwargs, "min_captured_at"),
        image_type: non_null(kwargs, "image_type"),
        compass_angle: non_null(kwargs, "compass_angle"),
        sequence_id: non_null(kwargs, "sequence_id"),
        organization_id: non_null(kwargs, "organization_id"),
    })
}

pub fn sequence_bbox_check(kwargs: &Kwargs) -> Result<SequenceBboxFilters, Error> {
    kwarg_check(
        kwargs,
        &[
            "max_captured_at",
            "min_captured_at",
            "image_type",
            "organization_id",
            "zoom",
        ],
        "sequence_bbox_check",
    )?;

    Ok(SequenceBboxFilters {
        max_captured_at: non_null(kwargs, "max_captured_at"),
        min_captured_at: non_null(kwargs, "min_captured_at"),
        image_type: non_null(kwargs, "image_type"),
        organization_id: non_null(kwargs, "organization_id"),
    })
}

pub fn shape_bbox_check(kwargs: &Kwargs) -> Result<(), Error> {
    kwarg_check(
        kwargs,
        &["max_date", "min_date", "is_pano"],
        "shape_bbox_check",
    )
}

pub fn thumbnail_size_check(thumbnail_size: u32) -> Result<(), Error> {
    size_check("thumbnail_size", thumbnail_size)
}

pub fn resolution_check(resolution: u32) -> Result<(), Error> {
    size_check("resolution", resolution)
}

fn size_check(param: &str, size: u32) -> Result<(), Error> {
    if THUMBNAIL_SIZES.contains(&size) {
        Ok(())
    } else {
        Err(invalid_option(param, &Value::from(size), &THUMBNAIL_SIZES))
    }
}

fn invalid_option<T>(param: &str, value: &Value, options: &[T]) -> Error
where
    T: Clone + Into<Value>,
{
    Error::InvalidOption {
        param: param.to_owned(),
        value: value.clone(),
        options: options.iter().cloned().map(Into::into).collect(),
    }
}

fn non_null(kwargs: &Kwargs, key: &str) -> Option<Value> {
    kwargs.get(key).filter(|value| !value.is_null()).cloned()
}
