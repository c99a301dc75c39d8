//! Map feature queries: tile enumeration, retrieval, filtering and merging.
use futures::executor::block_on;
use futures::{stream, StreamExt, TryStreamExt};
use serde_json::Value;
use tracing::debug;

use crate::config::{Layer, TileConfig};
use crate::error::Error;
use crate::filter::{pipeline, shape_polygons, Filter, Stage};
use crate::format::merged_features_list_to_geojson;
use crate::geojson::{BoundingBox, Feature, FeatureCollection};
use crate::tiles::{tiles_in_bbox, TileCoordinate};
use crate::time::cutoff_from_value;
use crate::verify::{points_traffic_signs_check, Kwargs, PointsTrafficSignsFilters};
use crate::{TileDecoder, TileFetcher, TileRequest};

/// Queries map feature layers through a fetcher and a decoder.
pub struct MapFeatureClient<F, D> {
    config: TileConfig,
    fetcher: F,
    decoder: D,
}

impl<F, D> MapFeatureClient<F, D>
where
    F: TileFetcher,
    D: TileDecoder,
{
    /// A client reading the public Mapillary endpoints.
    pub fn new(fetcher: F, decoder: D) -> Self {
        Self::with_config(TileConfig::default(), fetcher, decoder)
    }

    pub fn with_config(config: TileConfig, fetcher: F, decoder: D) -> Self {
        MapFeatureClient {
            config,
            fetcher,
            decoder,
        }
    }

    pub fn config(&self) -> &TileConfig {
        &self.config
    }

    /// Map feature points or traffic signs inside a bounding box, as a
    /// serialized GeoJSON FeatureCollection.
    ///
    /// `filter_values` restricts the features by their `value`; `None` keeps
    /// every value. `filters` may carry `existed_at` and `existed_before`.
    /// Filters are validated before any tile is requested, and a failure on
    /// any tile fails the whole query.
    pub async fn get_map_features_in_bbox(
        &self,
        bbox: &BoundingBox,
        filter_values: Option<&[String]>,
        filters: &Kwargs,
        layer: Layer,
    ) -> Result<String, Error> {
        let filters = points_traffic_signs_check(filters)?;
        let stages = build_stages(filter_values, Filter::BoundingBox(*bbox), &filters)?;
        let tiles = tiles_in_bbox(bbox, self.config.zoom);

        debug!(layer = %layer, tiles = tiles.len(), "Querying map features in bbox");

        let features = self.filtered_features(&tiles, layer, &stages).await?;
        merged_features_list_to_geojson(features).to_json_string()
    }

    /// Map feature points or traffic signs inside the polygons of a shape.
    ///
    /// Tiles are enumerated over the bounding box of the shape's polygons;
    /// point features are then kept only when they fall inside one of them.
    /// A shape without polygons yields an empty collection.
    pub async fn get_map_features_in_shape(
        &self,
        shape: &FeatureCollection,
        filter_values: Option<&[String]>,
        filters: &Kwargs,
        layer: Layer,
    ) -> Result<String, Error> {
        let filters = points_traffic_signs_check(filters)?;
        let polygons = shape_polygons(shape);
        let bbox = BoundingBox::enclosing(polygons.iter().flatten().flatten());
        let stages = build_stages(filter_values, Filter::InShape(polygons), &filters)?;

        let tiles = match bbox {
            Some(bbox) => tiles_in_bbox(&bbox, self.config.zoom),
            None => Vec::new(),
        };

        debug!(layer = %layer, tiles = tiles.len(), "Querying map features in shape");

        let features = self.filtered_features(&tiles, layer, &stages).await?;
        merged_features_list_to_geojson(features).to_json_string()
    }

    /// Blocking variant of [`MapFeatureClient::get_map_features_in_bbox`].
    pub fn get_map_features_in_bbox_blocking(
        &self,
        bbox: &BoundingBox,
        filter_values: Option<&[String]>,
        filters: &Kwargs,
        layer: Layer,
    ) -> Result<String, Error> {
        block_on(self.get_map_features_in_bbox(bbox, filter_values, filters, layer))
    }

    /// Blocking variant of [`MapFeatureClient::get_map_features_in_shape`].
    pub fn get_map_features_in_shape_blocking(
        &self,
        shape: &FeatureCollection,
        filter_values: Option<&[String]>,
        filters: &Kwargs,
        layer: Layer,
    ) -> Result<String, Error> {
        block_on(self.get_map_features_in_shape(shape, filter_values, filters, layer))
    }

    // Survivors of every tile, in tile enumeration order. At most
    // `concurrency` tiles are in flight; `buffered` hands results back in
    // input order regardless of completion order.
    async fn filtered_features(
        &self,
        tiles: &[TileCoordinate],
        layer: Layer,
        stages: &[Stage],
    ) -> Result<Vec<Feature>, Error> {
        let per_tile: Vec<Vec<Feature>> = stream::iter(tiles)
            .map(|tile| self.filtered_tile(tile, layer, stages))
            .buffered(self.config.concurrency.max(1))
            .try_collect()
            .await?;

        Ok(per_tile.into_iter().flatten().collect())
    }

    async fn filtered_tile(
        &self,
        tile: &TileCoordinate,
        layer: Layer,
        stages: &[Stage],
    ) -> Result<Vec<Feature>, Error> {
        let request = TileRequest {
            layer,
            tile: *tile,
            url: self.config.tile_url(layer, tile),
        };

        let data = self.fetcher.fetch_tile(&request).await?;
        let decoded = self.decoder.decode(&data, tile)?;
        let decoded_count = decoded.features.len();

        let kept = pipeline(decoded, stages);
        debug!(tile = %tile, decoded = decoded_count, kept = kept.len(), "Filtered tile");

        Ok(kept)
    }
}

// Value whitelist, containment, then the chronological filters. Optional
// stages are skipped when the caller did not ask for them.
fn build_stages(
    filter_values: Option<&[String]>,
    containment: Filter,
    filters: &PointsTrafficSignsFilters,
) -> Result<Vec<Stage>, Error> {
    let existed_at = filters
        .existed_at
        .as_ref()
        .map(cutoff_from_value)
        .transpose()?
        .flatten();
    let existed_before = filters
        .existed_before
        .as_ref()
        .map(cutoff_from_value)
        .transpose()?
        .flatten();

    Ok(vec![
        Stage::from(filter_values.map(|values| {
            Filter::Values(values.iter().cloned().map(Value::String).collect())
        })),
        Stage::Active(containment),
        Stage::from(existed_at.map(Filter::ExistedAt)),
        Stage::from(existed_before.map(Filter::ExistedBefore)),
    ])
}
