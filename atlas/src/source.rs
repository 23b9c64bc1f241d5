use crate::AtlasError;
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Known atlas data sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Woa09,
    Woa13,
    Rtofs,
    Gomofs,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// Monthly means; any date maps onto a calendar-month bucket.
    Climatology,

    /// Time-stamped model analyses that go stale.
    Forecast,
}

impl Source {
    pub const ALL: [Source; 4] = [Self::Woa09, Self::Woa13, Self::Rtofs, Self::Gomofs];

    pub fn name(self) -> &'static str {
        match self {
            Self::Woa09 => "WOA09",
            Self::Woa13 => "WOA13",
            Self::Rtofs => "RTOFS",
            Self::Gomofs => "GoMOFS",
        }
    }

    /// Folder holding this source's data, relative to the data root.
    pub fn folder_name(self) -> &'static str {
        match self {
            Self::Woa09 => "woa09",
            Self::Woa13 => "woa13",
            Self::Rtofs => "rtofs",
            Self::Gomofs => "gomofs",
        }
    }

    pub fn kind(self) -> SourceKind {
        match self {
            Self::Woa09 | Self::Woa13 => SourceKind::Climatology,
            Self::Rtofs | Self::Gomofs => SourceKind::Forecast,
        }
    }

    /// Default distance between a query time and the nearest analysis
    /// past which a forecast is considered stale.
    pub fn staleness(self) -> Option<Duration> {
        match self {
            Self::Woa09 | Self::Woa13 => None,
            Self::Rtofs => Some(Duration::hours(24)),
            Self::Gomofs => Some(Duration::hours(12)),
        }
    }

    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Source {
    type Err = AtlasError;

    fn from_str(s: &str) -> Result<Self, AtlasError> {
        Self::ALL
            .into_iter()
            .find(|source| source.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| AtlasError::UnknownSource(s.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::{Source, SourceKind};

    #[test]
    fn test_from_str() {
        assert_eq!("woa09".parse::<Source>().unwrap(), Source::Woa09);
        assert_eq!("GOMOFS".parse::<Source>().unwrap(), Source::Gomofs);
        assert!("woa18".parse::<Source>().is_err());
    }

    #[test]
    fn test_index_matches_all() {
        for (idx, source) in Source::ALL.into_iter().enumerate() {
            assert_eq!(source.index(), idx);
        }
    }

    #[test]
    fn test_kinds() {
        assert_eq!(Source::Woa13.kind(), SourceKind::Climatology);
        assert_eq!(Source::Rtofs.kind(), SourceKind::Forecast);
        assert!(Source::Woa13.staleness().is_none());
        assert!(Source::Gomofs.staleness().is_some());
    }

    #[test]
    fn test_serde_names() {
        assert_eq!(serde_json::to_string(&Source::Rtofs).unwrap(), "\"rtofs\"");
    }
}
