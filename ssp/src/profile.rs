use crate::SspError;
use chrono::{DateTime, Utc};
use std::{collections::BTreeMap, ops::Range, path::PathBuf};

/// Per-sample quality tag.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Flag {
    #[default]
    Valid,

    /// Manually excluded by the user.
    User,

    /// Removed by an automatic filter.
    Filtered,
}

impl Flag {
    pub fn is_valid(self) -> bool {
        self == Self::Valid
    }
}

/// Returns `lon` wrapped to `[-180, 180)`.
pub fn wrap_longitude(lon: f64) -> f64 {
    if (-180.0..180.0).contains(&lon) {
        lon
    } else {
        (lon + 180.0).rem_euclid(360.0) - 180.0
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(from = "RawMeta"))]
#[derive(Debug, Clone, PartialEq)]
pub struct Meta {
    /// Degrees north.
    pub latitude: f64,

    /// Degrees east, wrapped to `[-180, 180)`.
    pub longitude: f64,

    pub utc_time: DateTime<Utc>,

    /// File the profile was read from, if any.
    pub original_path: Option<PathBuf>,
}

impl Meta {
    pub fn new(latitude: f64, longitude: f64, utc_time: DateTime<Utc>) -> Self {
        Self {
            latitude,
            longitude: wrap_longitude(longitude),
            utc_time,
            original_path: None,
        }
    }
}

/// A sound speed, temperature and salinity column.
///
/// `depth`, `speed`, `temperature`, `salinity` and `flag` are aligned
/// 1:1. Excluded samples (see [`Flag`]) stay in the profile for
/// auditing; derived computations go through [`Profile::effective`].
///
/// Deserialized profiles are validated like [`Profile::new`] ones.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "RawProfile"))]
#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    pub meta: Meta,

    /// Meters, positive down, strictly increasing.
    pub depth: Vec<f64>,

    /// Meters per second.
    pub speed: Vec<f64>,

    /// Degrees Celsius.
    pub temperature: Vec<f64>,

    /// PSU.
    pub salinity: Vec<f64>,

    pub flag: Vec<Flag>,

    /// Model-predicted profiles for the same position and time, keyed
    /// by source name.
    pub models: BTreeMap<String, Profile>,
}

/// Wire form of [`Meta`], longitude not yet wrapped.
#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct RawMeta {
    latitude: f64,
    longitude: f64,
    utc_time: DateTime<Utc>,
    #[serde(default)]
    original_path: Option<PathBuf>,
}

#[cfg(feature = "serde")]
impl From<RawMeta> for Meta {
    fn from(raw: RawMeta) -> Self {
        Self {
            original_path: raw.original_path,
            ..Self::new(raw.latitude, raw.longitude, raw.utc_time)
        }
    }
}

/// Wire form of [`Profile`], columns not yet checked.
#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct RawProfile {
    meta: Meta,
    depth: Vec<f64>,
    speed: Vec<f64>,
    temperature: Vec<f64>,
    salinity: Vec<f64>,
    flag: Vec<Flag>,
    #[serde(default)]
    models: BTreeMap<String, Profile>,
}

#[cfg(feature = "serde")]
impl TryFrom<RawProfile> for Profile {
    type Error = SspError;

    fn try_from(raw: RawProfile) -> Result<Self, SspError> {
        check_columns(
            &raw.depth,
            [
                ("speed", raw.speed.len()),
                ("temperature", raw.temperature.len()),
                ("salinity", raw.salinity.len()),
                ("flag", raw.flag.len()),
            ],
        )?;
        Ok(Self {
            meta: raw.meta,
            depth: raw.depth,
            speed: raw.speed,
            temperature: raw.temperature,
            salinity: raw.salinity,
            flag: raw.flag,
            models: raw.models,
        })
    }
}

/// Checks that every column is as long as `depth` and that depths are
/// finite, non-negative and strictly increasing.
#[allow(clippy::neg_cmp_op_on_partial_ord)]
fn check_columns<const N: usize>(
    depth: &[f64],
    columns: [(&'static str, usize); N],
) -> Result<(), SspError> {
    let expected = depth.len();
    for (field, actual) in columns {
        if actual != expected {
            return Err(SspError::Length {
                field,
                expected,
                actual,
            });
        }
    }
    if let Some(index) = depth.iter().position(|d| !(d.is_finite() && *d >= 0.0)) {
        return Err(SspError::InvalidDepth {
            index,
            depth: depth[index],
        });
    }
    // Negated so that NaN never passes.
    if let Some(idx) = depth.windows(2).position(|w| !(w[1] > w[0])) {
        return Err(SspError::NotMonotonic(idx + 1));
    }
    Ok(())
}

/// Which samples to extract from a profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// Only samples flagged [`Flag::Valid`].
    Valid,

    /// Every sample, regardless of flag.
    All,
}

/// Columnar copy of the samples selected from a [`Profile`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Samples {
    pub depth: Vec<f64>,
    pub speed: Vec<f64>,
    pub temperature: Vec<f64>,
    pub salinity: Vec<f64>,
}

impl Samples {
    pub fn len(&self) -> usize {
        self.depth.len()
    }

    pub fn is_empty(&self) -> bool {
        self.depth.is_empty()
    }
}

impl Profile {
    /// Returns a profile with every sample flagged valid.
    pub fn new(
        meta: Meta,
        depth: Vec<f64>,
        speed: Vec<f64>,
        temperature: Vec<f64>,
        salinity: Vec<f64>,
    ) -> Result<Self, SspError> {
        check_columns(
            &depth,
            [
                ("speed", speed.len()),
                ("temperature", temperature.len()),
                ("salinity", salinity.len()),
            ],
        )?;
        Ok(Self {
            meta,
            flag: vec![Flag::Valid; depth.len()],
            depth,
            speed,
            temperature,
            salinity,
            models: BTreeMap::new(),
        })
    }

    /// Number of samples, including excluded ones.
    pub fn len(&self) -> usize {
        self.depth.len()
    }

    pub fn is_empty(&self) -> bool {
        self.depth.is_empty()
    }

    /// Flags the samples in `range` (clamped to the profile length).
    pub fn set_flag(&mut self, range: Range<usize>, flag: Flag) {
        let end = range.end.min(self.flag.len());
        let start = range.start.min(end);
        self.flag[start..end].fill(flag);
    }

    /// Returns the samples that feed derived computations.
    pub fn effective(&self) -> Samples {
        self.samples(Selection::Valid)
    }

    pub fn samples(&self, selection: Selection) -> Samples {
        let mut out = Samples::default();
        let rows = self
            .depth
            .iter()
            .zip(&self.speed)
            .zip(&self.temperature)
            .zip(&self.salinity)
            .zip(&self.flag);
        for ((((&d, &c), &t), &s), flag) in rows {
            if selection == Selection::All || flag.is_valid() {
                out.depth.push(d);
                out.speed.push(c);
                out.temperature.push(t);
                out.salinity.push(s);
            }
        }
        out
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::{wrap_longitude, Flag, Meta, Profile, Selection, SspError};
    use chrono::{TimeZone, Utc};

    pub fn meta() -> Meta {
        Meta::new(
            43.13555,
            -70.9395,
            Utc.with_ymd_and_hms(2016, 6, 10, 12, 0, 0).unwrap(),
        )
    }

    /// 200 samples every 0.5 m with 10 user-excluded and 20 filtered
    /// samples in the middle.
    #[allow(clippy::cast_precision_loss)]
    pub fn fake_ssp() -> Profile {
        let n = 200;
        let depth = (0..n).map(|i| i as f64 * 0.5).collect::<Vec<_>>();
        let speed = (0..n).map(|i| 1450.0 + i as f64 * 0.5).collect();
        let mut profile = Profile::new(meta(), depth.clone(), speed, depth.clone(), depth).unwrap();
        profile.set_flag(40..50, Flag::User);
        profile.set_flag(50..70, Flag::Filtered);
        profile
    }

    #[test]
    fn test_wrap_longitude() {
        assert_eq!(wrap_longitude(180.0), -180.0);
        assert_eq!(wrap_longitude(-180.0), -180.0);
        assert_eq!(wrap_longitude(190.0), -170.0);
        assert_eq!(wrap_longitude(-190.0), 170.0);
        assert_eq!(wrap_longitude(359.5), -0.5);
        assert_eq!(Meta::new(0.0, 270.0, meta().utc_time).longitude, -90.0);
        let lon = meta().longitude;
        assert_eq!(wrap_longitude(lon), lon);
    }

    #[test]
    fn test_effective_skips_excluded() {
        let profile = fake_ssp();
        let effective = profile.effective();
        assert_eq!(profile.len(), 200);
        assert_eq!(effective.len(), 170);
        assert_eq!(effective.depth[39], 19.5);
        assert_eq!(effective.depth[40], 35.0);
        assert_eq!(profile.samples(Selection::All).len(), 200);
    }

    #[test]
    fn test_set_flag_clamps() {
        let mut profile = fake_ssp();
        profile.set_flag(190..500, Flag::User);
        assert_eq!(profile.effective().len(), 160);
        profile.set_flag(0..200, Flag::Valid);
        assert_eq!(profile.effective().len(), 200);
    }

    #[test]
    fn test_new_rejects_bad_columns() {
        assert_eq!(
            Profile::new(meta(), vec![0.0, 1.0], vec![1500.0], vec![], vec![]),
            Err(SspError::Length {
                field: "speed",
                expected: 2,
                actual: 1
            })
        );
        assert_eq!(
            Profile::new(
                meta(),
                vec![0.0, 1.0, 1.0],
                vec![1500.0; 3],
                vec![10.0; 3],
                vec![35.0; 3]
            ),
            Err(SspError::NotMonotonic(2))
        );
    }

    #[test]
    fn test_new_rejects_bad_depths() {
        let new = |depth: Vec<f64>| {
            let n = depth.len();
            Profile::new(meta(), depth, vec![1500.0; n], vec![10.0; n], vec![35.0; n])
        };
        assert_eq!(
            new(vec![-1.0, 0.0, 1.0]),
            Err(SspError::InvalidDepth {
                index: 0,
                depth: -1.0
            })
        );
        assert!(matches!(
            new(vec![0.0, f64::NAN, 2.0]),
            Err(SspError::InvalidDepth { index: 1, .. })
        ));
        assert!(matches!(
            new(vec![0.0, 1.0, f64::INFINITY]),
            Err(SspError::InvalidDepth { index: 2, .. })
        ));
        assert_eq!(new(vec![0.0, 2.0, 1.0]), Err(SspError::NotMonotonic(2)));
        assert!(new(vec![0.0, 0.5, 1.0]).is_ok());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_deserialize_validates() {
        let good = r#"{
            "meta": {"latitude": 10.0, "longitude": 400.0, "utc_time": "2016-06-10T12:00:00Z"},
            "depth": [0.0, 1.0],
            "speed": [1500.0, 1501.0],
            "temperature": [10.0, 10.0],
            "salinity": [35.0, 35.0],
            "flag": ["valid", "user"]
        }"#;
        let profile: Profile = serde_json::from_str(good).unwrap();
        assert_eq!(profile.meta.longitude, 40.0);
        assert_eq!(profile.effective().len(), 1);
        assert!(profile.models.is_empty());

        let short_columns = r#"{
            "meta": {"latitude": 10.0, "longitude": 400.0, "utc_time": "2016-06-10T12:00:00Z"},
            "depth": [0.0, 1.0, 2.0, 3.0],
            "speed": [1500.0, 1501.0],
            "temperature": [],
            "salinity": [],
            "flag": []
        }"#;
        let err = serde_json::from_str::<Profile>(short_columns).unwrap_err();
        assert!(err.to_string().contains("speed has 2 samples, expected 4"));

        let short_flag = good.replace(r#"["valid", "user"]"#, r#"["valid"]"#);
        assert!(serde_json::from_str::<Profile>(&short_flag).is_err());

        let descending = good.replace("[0.0, 1.0]", "[1.0, 0.0]");
        assert!(serde_json::from_str::<Profile>(&descending).is_err());
    }
}
