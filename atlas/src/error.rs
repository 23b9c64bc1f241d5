use crate::Source;
use chrono::{DateTime, Utc};
use oceangrid::GridError;
use ssp::SspError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AtlasError {
    #[error("{0} data set is not available locally")]
    DatasetUnavailable(Source),

    #[error("no data, {0}")]
    NoData(#[from] NoData),

    #[error("unable to load {dataset} grid, {err}")]
    LoadFailure {
        dataset: Source,
        #[source]
        err: GridError,
    },

    #[error("operation cancelled")]
    Cancelled,

    #[error("unable to download {0}")]
    Download(Source),

    #[error("unknown atlas source '{0}'")]
    UnknownSource(String),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Config(#[from] serde_json::Error),

    #[error("{0}")]
    Profile(#[from] SspError),
}

/// Why a query point has no usable data.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NoData {
    #[error("every level is masked (land)")]
    Land,

    #[error("{lat}, {lon} is outside the grid")]
    OutOfBounds { lat: f64, lon: f64 },

    #[error("nearest analysis {nearest} is too far from {requested}")]
    Stale {
        requested: DateTime<Utc>,
        nearest: DateTime<Utc>,
    },

    #[error("grid has no time buckets")]
    EmptyTimeAxis,
}
