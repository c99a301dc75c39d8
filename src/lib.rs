//! # Tile Features
//!
//! Tools for querying, filtering and merging map features from vector tile sources.
//!
//! ## Current status
//!
//! The query path covers the map feature point and traffic sign layers. Image, sequence and
//! detection queries only have their filter checks and GeoJSON helpers so far. The fetcher
//! and decoder traits may still grow arguments (auth tokens, per-layer decoding options)
//! before a 1.0 release.
//!
//! ## Current features
//!
//! Given a bounding box (or a polygon shape) and a set of filters, this crate will work out
//! which zoom 14 slippy map tiles cover the region, fetch and decode each of them, run the
//! decoded features through a filter pipeline, and merge the survivors into a single
//! GeoJSON FeatureCollection. It also bundles the GeoJSON reshaping helpers that go along
//! with map feature and detection data.
//!
//! ## Known Limitations
//!
//! Network transport and the binary tile encoding are left to the caller: implement
//! [`TileFetcher`] over your HTTP client of choice and [`TileDecoder`] over your vector
//! tile decoder. Features that straddle a tile border are reported once per tile that
//! contains them; results are not de-duplicated by feature id.

#![deny(warnings)]

// TODO: remove once async fn in traits become object safe
use async_trait::async_trait;

pub mod config;
pub mod error;
pub mod feature;
pub mod filter;
pub mod format;
pub mod geojson;
pub mod tiles;
pub mod time;
pub mod verify;

pub use config::{Layer, TileConfig};
pub use error::Error;
pub use feature::MapFeatureClient;
pub use geojson::{BoundingBox, Feature, FeatureCollection, Geometry};
pub use tiles::TileCoordinate;

/// Everything a fetcher needs to know about one tile.
#[derive(Clone, Debug, PartialEq)]
pub struct TileRequest {
    pub layer: Layer,
    pub tile: TileCoordinate,
    /// Retrieval URL built from the layer's endpoint template
    pub url: String,
}

/// Retrieves raw vector tile bytes. Implementations own transport, auth and
/// retries; errors should be reported as [`Error::Transport`].
#[async_trait]
pub trait TileFetcher: Sync {
    async fn fetch_tile(&self, request: &TileRequest) -> Result<Vec<u8>, Error>;
}

/// Decodes the raw bytes of a tile into lon/lat GeoJSON features.
pub trait TileDecoder: Sync {
    /// Errors on malformed input should be reported as [`Error::Decode`].
    fn decode(&self, data: &[u8], tile: &TileCoordinate) -> Result<FeatureCollection, Error>;
}
