use crate::{
    AtlasConfig, AtlasDataset, AtlasError, Downloader, FileLoader, GridInterpolator, GridLoader,
    Source,
};
use chrono::{DateTime, Utc};
use log::{debug, warn};
use oceangrid::{Cancel, Grid};
use rayon::prelude::*;
use ssp::Profile;
use std::{sync::Arc, time::Instant};

/// A source that could not annotate a profile.
#[derive(Debug)]
pub struct AnnotateFailure {
    /// Position of the profile in the annotated slice.
    pub index: usize,
    pub source: Source,
    pub err: AtlasError,
}

/// Every known atlas source, each with its own dataset.
///
/// The registry does not pick a source for the caller, except in
/// [`AtlasRegistry::annotate`] which queries all enabled ones.
/// Registries are independent, and so are their datasets: a slow first
/// load of one source never holds up queries to another.
pub struct AtlasRegistry {
    /// Indexed by `Source::index`.
    datasets: Vec<AtlasDataset>,

    enabled: Vec<Source>,
}

impl AtlasRegistry {
    /// Returns a registry reading `grid.ssg` files under
    /// `config.data_dir`.
    pub fn new(config: &AtlasConfig) -> Self {
        Self::with_loader(config, Arc::new(FileLoader::new(config.load_mode)))
    }

    pub fn with_loader(config: &AtlasConfig, loader: Arc<dyn GridLoader>) -> Self {
        let datasets = Source::ALL
            .into_iter()
            .map(|source| {
                AtlasDataset::new(
                    source,
                    config.folder(source),
                    Arc::clone(&loader),
                    GridInterpolator::with_staleness(config.staleness(source)),
                )
            })
            .collect();
        let mut enabled = config.enabled.clone();
        enabled.sort_unstable();
        enabled.dedup();
        Self { datasets, enabled }
    }

    pub fn dataset(&self, source: Source) -> &AtlasDataset {
        &self.datasets[source.index()]
    }

    pub fn datasets(&self) -> &[AtlasDataset] {
        &self.datasets
    }

    /// Returns true if `source` can be queried without downloading.
    pub fn has(&self, source: Source) -> bool {
        self.dataset(source).is_present()
    }

    /// Sources used by [`AtlasRegistry::annotate`].
    pub fn enabled(&self) -> &[Source] {
        &self.enabled
    }

    pub fn is_enabled(&self, source: Source) -> bool {
        self.enabled.contains(&source)
    }

    pub fn query(
        &self,
        source: Source,
        lat: f64,
        lon: f64,
        timestamp: DateTime<Utc>,
    ) -> Result<Profile, AtlasError> {
        self.dataset(source).query(lat, lon, timestamp)
    }

    pub fn query_with(
        &self,
        source: Source,
        lat: f64,
        lon: f64,
        timestamp: DateTime<Utc>,
        cancel: &Cancel,
    ) -> Result<Profile, AtlasError> {
        self.dataset(source).query_with(lat, lon, timestamp, cancel)
    }

    /// Loads `source` ahead of the first query.
    pub fn load(&self, source: Source, cancel: &Cancel) -> Result<Arc<Grid>, AtlasError> {
        self.dataset(source).load(cancel)
    }

    pub fn reload(&self, source: Source, cancel: &Cancel) -> Result<Arc<Grid>, AtlasError> {
        self.dataset(source).reload(cancel)
    }

    pub fn evict(&self, source: Source) {
        self.dataset(source).evict();
    }

    /// Downloads `source` and drops its cached grid so the next query
    /// picks up the new files.
    pub fn refresh(
        &self,
        source: Source,
        downloader: &dyn Downloader,
        datestamp: Option<DateTime<Utc>>,
    ) -> Result<(), AtlasError> {
        if !downloader.download(source, datestamp) {
            warn!("unable to download {source}");
            return Err(AtlasError::Download(source));
        }
        self.evict(source);
        Ok(())
    }

    /// Sources whose grid is currently in memory.
    pub fn loaded(&self) -> Vec<Source> {
        self.datasets
            .iter()
            .filter(|dataset| dataset.is_loaded())
            .map(AtlasDataset::source)
            .collect()
    }

    /// Attaches to each profile the model profile of every enabled and
    /// present source, keyed by source name in [`Profile::models`].
    ///
    /// Profiles are processed in parallel. A failed lookup leaves that
    /// profile's entry for the source untouched and is reported back.
    pub fn annotate(&self, profiles: &mut [Profile]) -> Vec<AnnotateFailure> {
        let sources: Vec<Source> = self
            .enabled
            .iter()
            .copied()
            .filter(|&source| self.has(source))
            .collect();
        let now = Instant::now();

        let failures: Vec<AnnotateFailure> = profiles
            .par_iter_mut()
            .enumerate()
            .flat_map_iter(|(index, profile)| {
                let (lat, lon, timestamp) = (
                    profile.meta.latitude,
                    profile.meta.longitude,
                    profile.meta.utc_time,
                );
                let mut failures = Vec::new();
                for &source in &sources {
                    match self.query(source, lat, lon, timestamp) {
                        Ok(model) => {
                            profile.models.insert(source.name().to_owned(), model);
                        }
                        Err(err) => failures.push(AnnotateFailure { index, source, err }),
                    }
                }
                failures
            })
            .collect();

        debug!(
            "annotated profiles; profiles: {}, sources: {:?}, failures: {}, exec: {:?}",
            profiles.len(),
            sources,
            failures.len(),
            now.elapsed()
        );
        failures
    }
}
