//! Vector tile endpoint configuration, loaded from YAML.
//!
//! Further reading: https://www.mapillary.com/developer/api-documentation/#vector-tiles
use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::tiles::{TileCoordinate, DEFAULT_ZOOM, MAX_ZOOM};

/// Endpoints of the public Mapillary map feature tiles.
pub static DEFAULT_CONFIG: Lazy<TileConfig> = Lazy::new(|| TileConfig {
    name: String::from("Mapillary"),
    zoom: DEFAULT_ZOOM,
    concurrency: 1,
    layers: Layers {
        points: LayerEndpoint {
            url: String::from(
                "https://tiles.mapillary.com/maps/vtp/mly_map_feature_point/2/{z}/{x}/{y}",
            ),
        },
        traffic_signs: LayerEndpoint {
            url: String::from(
                "https://tiles.mapillary.com/maps/vtp/mly_map_feature_traffic_sign/2/{z}/{x}/{y}",
            ),
        },
    },
});

/// Which map feature layer a query reads from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Layer {
    #[default]
    Points,
    TrafficSigns,
}

impl Layer {
    pub fn as_str(&self) -> &'static str {
        match self {
            Layer::Points => "points",
            Layer::TrafficSigns => "traffic_signs",
        }
    }
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Layer {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "points" => Ok(Layer::Points),
            "traffic_signs" => Ok(Layer::TrafficSigns),
            other => Err(Error::InvalidLayer(other.to_owned())),
        }
    }
}

#[derive(Clone, Deserialize, Serialize, Debug, PartialEq)]
pub struct TileConfig {
    pub name: String,
    #[serde(default = "default_zoom")]
    pub zoom: u8,
    /// Number of tiles in flight at once; 1 fetches strictly one at a time.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    pub layers: Layers,
}

#[derive(Clone, Deserialize, Serialize, Debug, PartialEq)]
pub struct Layers {
    pub points: LayerEndpoint,
    pub traffic_signs: LayerEndpoint,
}

#[derive(Clone, Deserialize, Serialize, Debug, PartialEq)]
pub struct LayerEndpoint {
    /// URL template with `{z}`, `{x}` and `{y}` placeholders
    pub url: String,
}

fn default_zoom() -> u8 {
    DEFAULT_ZOOM
}

fn default_concurrency() -> usize {
    1
}

impl Default for TileConfig {
    fn default() -> Self {
        DEFAULT_CONFIG.clone()
    }
}

impl TileConfig {
    /// Constructs a new TileConfig from a YAML string
    pub fn from(data: &str) -> Result<TileConfig, Error> {
        let mut result: TileConfig = serde_yaml::from_str(data)?;

        if result.zoom > MAX_ZOOM {
            return Err(Error::InvalidZoom {
                zoom: result.zoom,
                max: MAX_ZOOM,
            });
        }

        for endpoint in [&mut result.layers.points, &mut result.layers.traffic_signs] {
            endpoint.url = endpoint.url.trim().to_owned();
        }

        // A zero here would never poll a single tile
        result.concurrency = result.concurrency.max(1);

        Ok(result)
    }

    pub fn endpoint(&self, layer: Layer) -> &LayerEndpoint {
        match layer {
            Layer::Points => &self.layers.points,
            Layer::TrafficSigns => &self.layers.traffic_signs,
        }
    }

    /// Builds the retrieval URL of one tile of a layer.
    pub fn tile_url(&self, layer: Layer, tile: &TileCoordinate) -> String {
        self.endpoint(layer)
            .url
            .replace("{z}", &tile.z.to_string())
            .replace("{x}", &tile.x.to_string())
            .replace("{y}", &tile.y.to_string())
    }
}

#[cfg(test)]
mod tests {
    use std::fs::File;
    use std::io::Read;

    use super::*;

    #[test]
    fn test_parse_tile_config() {
        let mut file =
            File::open("test_data/vector_tiles.yml").expect("Unable to open the test yml file.");
        let mut data = String::new();
        file.read_to_string(&mut data)
            .expect("Unable to read the file");

        let config: Result<TileConfig, _> = TileConfig::from(data.as_str());
        match config {
            Ok(result) => {
                assert_eq!("Mapillary staging", result.name);
                assert_eq!(14, result.zoom);
                assert_eq!(4, result.concurrency);
                assert_eq!(
                    "https://tiles.example.com/points/{z}/{x}/{y}.mvt",
                    result.layers.points.url
                );
            }
            Err(e) => panic!("{}", e),
        }
    }

    #[test]
    fn test_defaults_fill_in() {
        let data = r#"
name: Minimal
layers:
  points:
    url: "https://tiles.example.com/p/{z}/{x}/{y}"
  traffic_signs:
    url: "https://tiles.example.com/t/{z}/{x}/{y}"
"#;
        let config = TileConfig::from(data).expect("Unable to parse config");
        assert_eq!(DEFAULT_ZOOM, config.zoom);
        assert_eq!(1, config.concurrency);
    }

    #[test]
    fn test_zoom_beyond_limit() {
        let data = r#"
name: Too deep
zoom: 32
layers:
  points:
    url: "https://tiles.example.com/p/{z}/{x}/{y}"
  traffic_signs:
    url: "https://tiles.example.com/t/{z}/{x}/{y}"
"#;
        match TileConfig::from(data) {
            Err(Error::InvalidZoom { zoom, max }) => {
                assert_eq!(32, zoom);
                assert_eq!(MAX_ZOOM, max);
            }
            other => panic!("Expected a zoom error, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_yaml() {
        match TileConfig::from("name: [unterminated") {
            Err(Error::Config(_)) => {}
            other => panic!("Expected a config error, got {:?}", other),
        }
    }

    #[test]
    fn test_tile_url_per_layer() {
        let config = TileConfig::default();
        let tile = TileCoordinate::new(8296, 5636, 14);

        assert_eq!(
            "https://tiles.mapillary.com/maps/vtp/mly_map_feature_point/2/14/8296/5636",
            config.tile_url(Layer::Points, &tile)
        );
        assert_eq!(
            "https://tiles.mapillary.com/maps/vtp/mly_map_feature_traffic_sign/2/14/8296/5636",
            config.tile_url(Layer::TrafficSigns, &tile)
        );
    }

    #[test]
    fn test_layer_names() {
        assert_eq!(Layer::Points, "points".parse().unwrap());
        assert_eq!(Layer::TrafficSigns, "traffic_signs".parse().unwrap());
        assert!("lines".parse::<Layer>().is_err());
        assert_eq!("traffic_signs", Layer::TrafficSigns.to_string());
        assert_eq!(Layer::Points, Layer::default());
    }
}
