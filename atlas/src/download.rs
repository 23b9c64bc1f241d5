use crate::Source;
use chrono::{DateTime, Utc};

/// Fetches atlas data sets onto local storage.
///
/// Nothing in this crate calls a downloader on its own.
/// [`AtlasRegistry::refresh`](crate::AtlasRegistry::refresh) is the
/// explicit download-then-evict step a workflow opts into.
pub trait Downloader {
    fn is_present(&self, source: Source) -> bool;

    /// Downloads `source`. Forecast sources use `datestamp` to pick
    /// the file set; climatologies ignore it.
    fn download(&self, source: Source, datestamp: Option<DateTime<Utc>>) -> bool;
}
