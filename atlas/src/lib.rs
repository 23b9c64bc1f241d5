//! # Ocean atlases
//!
//! `atlas` looks up sound-speed, temperature and salinity columns in
//! gridded climatologies (WOA09, WOA13) and forecast models (RTOFS,
//! GoMOFS) for a position and time.
//!
//! Grids are loaded lazily, once per dataset of an [`AtlasRegistry`], and
//! shared read-only by every query afterwards.

mod config;
mod dataset;
mod download;
mod error;
mod interp;
mod loader;
mod registry;
mod source;

pub use crate::{
    config::AtlasConfig,
    dataset::AtlasDataset,
    download::Downloader,
    error::{AtlasError, NoData},
    interp::GridInterpolator,
    loader::{FileLoader, GridLoader},
    registry::{AnnotateFailure, AtlasRegistry},
    source::{Source, SourceKind},
};
pub use {oceangrid, ssp};
