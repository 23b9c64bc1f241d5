use crate::{AtlasError, GridInterpolator, GridLoader, Source};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use log::{debug, warn};
use oceangrid::{Cancel, Grid, GridError};
use ssp::{Meta, Profile};
use std::{
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, MutexGuard, PoisonError,
    },
    time::Instant,
};

/// Grids loaded so far, keyed by source.
///
/// Readers get `Arc` snapshots, so evicting or replacing an entry never
/// affects a query already in flight.
type GridCache = DashMap<Source, Arc<Grid>>;

/// One atlas source and its lazily loaded grid.
pub struct AtlasDataset {
    source: Source,

    /// Local data folder. Written by the downloader, only read here.
    folder: PathBuf,

    loader: Arc<dyn GridLoader>,

    /// Only locked for lookups and inserts, never across a disk load.
    cache: GridCache,

    /// Held while reading from disk and while evicting.
    loading: Mutex<()>,

    /// Set when the data on disk failed to load; cleared by eviction.
    broken: AtomicBool,

    interpolator: GridInterpolator,
}

impl AtlasDataset {
    pub fn new(
        source: Source,
        folder: PathBuf,
        loader: Arc<dyn GridLoader>,
        interpolator: GridInterpolator,
    ) -> Self {
        Self {
            source,
            folder,
            loader,
            cache: GridCache::new(),
            loading: Mutex::new(()),
            broken: AtomicBool::new(false),
            interpolator,
        }
    }

    pub fn source(&self) -> Source {
        self.source
    }

    pub fn name(&self) -> &'static str {
        self.source.name()
    }

    pub fn folder(&self) -> &Path {
        &self.folder
    }

    pub fn interpolator(&self) -> &GridInterpolator {
        &self.interpolator
    }

    /// Returns true if the grid data is available locally and did not
    /// fail to load.
    pub fn is_present(&self) -> bool {
        !self.broken.load(Ordering::Acquire) && self.loader.is_present(&self.folder)
    }

    /// Returns true if the grid is in memory.
    pub fn is_loaded(&self) -> bool {
        self.cache.contains_key(&self.source)
    }

    /// Returns the cached grid, loading it first if needed.
    ///
    /// Concurrent first loads of the same source are serialized; only
    /// one of them reads from disk. Other datasets are never blocked.
    pub fn load(&self, cancel: &Cancel) -> Result<Arc<Grid>, AtlasError> {
        if !self.is_present() {
            return Err(AtlasError::DatasetUnavailable(self.source));
        }
        if let Some(grid) = self.cached() {
            return Ok(grid);
        }
        if cancel.is_cancelled() {
            return Err(AtlasError::Cancelled);
        }
        let _loading = self.lock_loading();
        // Another caller may have loaded, or failed to, while we waited.
        if let Some(grid) = self.cached() {
            return Ok(grid);
        }
        if !self.is_present() {
            return Err(AtlasError::DatasetUnavailable(self.source));
        }
        let grid = Arc::new(self.load_grid(cancel)?);
        self.cache.insert(self.source, Arc::clone(&grid));
        Ok(grid)
    }

    /// Interpolates a profile at (`lat`, `lon`) for `timestamp`.
    pub fn query(&self, lat: f64, lon: f64, timestamp: DateTime<Utc>) -> Result<Profile, AtlasError> {
        self.query_with(lat, lon, timestamp, &Cancel::never())
    }

    pub fn query_with(
        &self,
        lat: f64,
        lon: f64,
        timestamp: DateTime<Utc>,
        cancel: &Cancel,
    ) -> Result<Profile, AtlasError> {
        let grid = self.load(cancel)?;
        let column = self
            .interpolator
            .interpolate_with(&grid, lat, lon, timestamp, cancel)?;
        let mut meta = Meta::new(lat, lon, timestamp);
        meta.original_path = Some(self.folder.clone());
        Ok(Profile::new(
            meta,
            column.depth,
            column.speed,
            column.temperature,
            column.salinity,
        )?)
    }

    /// Drops the cached grid and clears any load failure, so the next
    /// query reads the data on disk again.
    pub fn evict(&self) {
        let _loading = self.lock_loading();
        if self.cache.remove(&self.source).is_some() {
            debug!("evicted {} grid", self.source);
        }
        self.broken.store(false, Ordering::Release);
    }

    /// Evicts then loads the grid again.
    pub fn reload(&self, cancel: &Cancel) -> Result<Arc<Grid>, AtlasError> {
        self.evict();
        self.load(cancel)
    }
}

/// Private API
impl AtlasDataset {
    fn cached(&self) -> Option<Arc<Grid>> {
        self.cache.get(&self.source).map(|grid| Arc::clone(&grid))
    }

    fn lock_loading(&self) -> MutexGuard<'_, ()> {
        // The guard protects no data, a panicked loader leaves nothing to repair.
        self.loading.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn load_grid(&self, cancel: &Cancel) -> Result<Grid, AtlasError> {
        let now = Instant::now();
        debug!("loading {} grid from {:?}", self.source, self.folder);
        let grid = match self.loader.load(&self.folder, cancel) {
            Ok(grid) => grid,
            Err(GridError::Cancelled) => return Err(AtlasError::Cancelled),
            Err(err) => {
                warn!("{} grid failed to load, {err}", self.source);
                self.broken.store(true, Ordering::Release);
                return Err(AtlasError::LoadFailure {
                    dataset: self.source,
                    err,
                });
            }
        };
        if cancel.is_cancelled() {
            return Err(AtlasError::Cancelled);
        }
        debug!(
            "loaded {} grid; dims: {:?}, exec: {:?}",
            self.source,
            grid.dims(),
            now.elapsed()
        );
        Ok(grid)
    }
}
