use crate::{AtlasError, Source};
use chrono::Duration;
use oceangrid::LoadMode;
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

/// Atlas settings, usually read from a JSON file.
///
/// ```json
/// {
///   "data_dir": "/data/atlases",
///   "enabled": ["woa09", "woa13"],
///   "load_mode": "mem_map",
///   "staleness_hours": { "rtofs": 36 }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AtlasConfig {
    /// Root holding one folder per source.
    pub data_dir: PathBuf,

    /// Sources used to annotate imported profiles.
    pub enabled: Vec<Source>,

    pub load_mode: LoadMode,

    /// Per-source overrides of [`Source::staleness`].
    pub staleness_hours: BTreeMap<Source, u32>,
}

impl Default for AtlasConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("atlases"),
            enabled: vec![Source::Woa09, Source::Woa13],
            load_mode: LoadMode::default(),
            staleness_hours: BTreeMap::new(),
        }
    }
}

impl AtlasConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, AtlasError> {
        let rdr = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(rdr)?)
    }

    pub fn folder(&self, source: Source) -> PathBuf {
        self.data_dir.join(source.folder_name())
    }

    pub fn staleness(&self, source: Source) -> Option<Duration> {
        self.staleness_hours
            .get(&source)
            .map(|hours| Duration::hours(i64::from(*hours)))
            .or_else(|| source.staleness())
    }
}
