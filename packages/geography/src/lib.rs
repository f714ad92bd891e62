#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Department and municipality polygons and the choropleth join.
//!
//! Boundaries come from the census boundary service as GeoJSON feature
//! collections. Each feature is reduced to a [`GeoFeature`] (raw code,
//! name, geometry) and joined against statistic rows by normalized
//! administrative code; the family's [`palettes`] entry then colors it.

pub mod features;
pub mod join;
pub mod palettes;
pub mod source;

use thiserror::Error;

pub use features::GeoFeature;
pub use join::{Joined, join, join_scale, value_index};
pub use palettes::{Palette, PaletteError, PaletteRegistry};
pub use source::{GeoSource, HttpGeoSource};

/// Errors that can occur while loading geographic features.
#[derive(Debug, Error)]
pub enum GeoError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The boundary service answered with a non-success status.
    #[error("HTTP status {status} from {url}")]
    Status {
        /// Response status code.
        status: u16,
        /// Requested URL.
        url: String,
    },

    /// JSON parsing failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The body was JSON but not GeoJSON.
    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] Box<geojson::Error>),

    /// Data conversion error.
    #[error("Conversion error: {message}")]
    Conversion {
        /// Description of what went wrong.
        message: String,
    },
}
