use serde_json::Value;

/// Boxed error produced by a tile fetcher or decoder.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Record has no geometry.")]
    MissingGeometry,

    #[error("Record is missing the required property `{property}`.")]
    MissingProperty { property: String },

    #[error("Invalid kwarg `{key}` (value: {value}) passed to {func}; expected one of {options:?}.")]
    InvalidKwarg {
        func: String,
        key: String,
        value: Value,
        options: Vec<String>,
    },

    #[error("`{contradicts}` contradicts `{contradicted}`: {message}")]
    Contradicting {
        contradicts: String,
        contradicted: String,
        message: String,
    },

    #[error("Invalid value {value} for option `{param}`; expected one of {options:?}.")]
    InvalidOption {
        param: String,
        value: Value,
        options: Vec<Value>,
    },

    #[error("Unable to interpret `{0}` as a date.")]
    InvalidDate(String),

    #[error("Unknown layer `{0}`; expected `points` or `traffic_signs`.")]
    InvalidLayer(String),

    #[error("Zoom level {zoom} is out of range; expected at most {max}.")]
    InvalidZoom { zoom: u8, max: u8 },

    #[error("Invalid YAML in TileConfig.")]
    Config(#[from] serde_yaml::Error),

    #[error("Invalid GeoJSON.")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Transport(BoxError),

    #[error(transparent)]
    Decode(BoxError),
}
