//! Spatial and temporal lookup in a [`Grid`].
//!
//! Horizontally the four nodes surrounding the query point are
//! blended bilinearly; masked nodes are dropped and the remaining
//! weights renormalized. Temporally there is no blending: the nearest
//! bucket (climatology) or analysis (forecast) is used as is.

use crate::{AtlasError, NoData};
use chrono::{DateTime, Datelike, Duration, TimeZone, Utc};
use oceangrid::{Cancel, Grid, TimeAxis};
use ssp::{math::mackenzie, Samples};

/// Combined corner weight below which a level has no coverage.
const MIN_WEIGHT: f64 = 1e-12;

/// Interpolates columns out of a grid.
///
/// Holds no state besides the staleness horizon applied to forecast
/// grids.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GridInterpolator {
    staleness: Option<Duration>,
}

impl GridInterpolator {
    /// Returns an interpolator that accepts analyses of any age.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns an interpolator rejecting analyses further than
    /// `staleness` from the query time.
    pub fn with_staleness(staleness: Option<Duration>) -> Self {
        Self { staleness }
    }

    pub fn staleness(&self) -> Option<Duration> {
        self.staleness
    }

    /// Returns the column at (`lat`, `lon`) for `timestamp`.
    ///
    /// Levels where every surrounding node is masked are left out of
    /// the result; if that leaves nothing the call fails with
    /// [`NoData::Land`].
    pub fn interpolate(
        &self,
        grid: &Grid,
        lat: f64,
        lon: f64,
        timestamp: DateTime<Utc>,
    ) -> Result<Samples, AtlasError> {
        self.interpolate_with(grid, lat, lon, timestamp, &Cancel::never())
    }

    /// Same as [`GridInterpolator::interpolate`], polling `cancel`
    /// between depth levels.
    pub fn interpolate_with(
        &self,
        grid: &Grid,
        lat: f64,
        lon: f64,
        timestamp: DateTime<Utc>,
        cancel: &Cancel,
    ) -> Result<Samples, AtlasError> {
        let axes = grid.axes();
        let t = self.time_index(&axes.time, timestamp)?;

        let out_of_bounds = || NoData::OutOfBounds { lat, lon };
        let (j0, j1, fy) = bracket(&axes.lat, lat).ok_or_else(out_of_bounds)?;
        let (i0, i1, fx) =
            bracket_lon(&axes.lon, lon, grid.is_lon_periodic()).ok_or_else(out_of_bounds)?;
        let corners = [
            (j0, i0, (1.0 - fy) * (1.0 - fx)),
            (j0, i1, (1.0 - fy) * fx),
            (j1, i0, fy * (1.0 - fx)),
            (j1, i1, fy * fx),
        ];

        let mut column = Samples::default();
        for (d, &depth) in axes.depth.iter().enumerate() {
            if cancel.is_cancelled() {
                return Err(AtlasError::Cancelled);
            }
            if let Some(level) = level(grid, t, d, &corners) {
                let speed = level
                    .speed
                    .unwrap_or_else(|| mackenzie(level.temperature, level.salinity, depth));
                column.depth.push(depth);
                column.speed.push(speed);
                column.temperature.push(level.temperature);
                column.salinity.push(level.salinity);
            }
        }

        if column.is_empty() {
            Err(NoData::Land.into())
        } else {
            Ok(column)
        }
    }

    fn time_index(&self, axis: &TimeAxis, timestamp: DateTime<Utc>) -> Result<usize, NoData> {
        match axis {
            TimeAxis::Monthly(months) => {
                nearest_month(months, timestamp).ok_or(NoData::EmptyTimeAxis)
            }
            TimeAxis::Analysis(stamps) => {
                let idx = nearest_analysis(stamps, timestamp).ok_or(NoData::EmptyTimeAxis)?;
                let nearest = stamps[idx];
                match self.staleness {
                    Some(horizon) if nearest - timestamp > horizon || timestamp - nearest > horizon => {
                        Err(NoData::Stale {
                            requested: timestamp,
                            nearest,
                        })
                    }
                    _ => Ok(idx),
                }
            }
        }
    }
}

struct Level {
    temperature: f64,
    salinity: f64,
    speed: Option<f64>,
}

/// Blends the valid corners of depth level `d`.
fn level(grid: &Grid, t: usize, d: usize, corners: &[(usize, usize, f64); 4]) -> Option<Level> {
    let (mut weight, mut temperature, mut salinity, mut speed) = (0.0, 0.0, 0.0, 0.0);
    for &(j, i, w) in corners {
        if let Some(node) = grid.node(t, d, j, i) {
            weight += w;
            temperature += w * f64::from(node.temperature);
            salinity += w * f64::from(node.salinity);
            speed += w * node.speed.map_or(0.0, f64::from);
        }
    }
    if weight < MIN_WEIGHT {
        return None;
    }
    Some(Level {
        temperature: temperature / weight,
        salinity: salinity / weight,
        speed: grid.has_speed().then(|| speed / weight),
    })
}

/// Returns `(lo, hi, frac)` such that `v == axis[lo] + frac * (axis[hi] - axis[lo])`.
///
/// Values up to half a spacing beyond either end clamp to the end
/// node; anything further out is `None`.
#[allow(clippy::float_cmp)]
fn bracket(axis: &[f64], v: f64) -> Option<(usize, usize, f64)> {
    let n = axis.len();
    let (first, last) = (*axis.first()?, *axis.last()?);
    if !v.is_finite() {
        return None;
    }
    if n == 1 {
        return (v == first).then_some((0, 0, 0.0));
    }
    if v < first {
        return (first - v <= (axis[1] - first) / 2.0).then_some((0, 0, 0.0));
    }
    if v >= last {
        return (v - last <= (last - axis[n - 2]) / 2.0).then_some((n - 1, n - 1, 0.0));
    }
    let hi = axis.partition_point(|&a| a <= v);
    let lo = hi - 1;
    Some((lo, hi, (v - axis[lo]) / (axis[hi] - axis[lo])))
}

/// Like [`bracket`], treating longitude as circular.
///
/// On a periodic axis a point between the last node and the first
/// node (+360°) is blended across the seam.
fn bracket_lon(axis: &[f64], lon: f64, periodic: bool) -> Option<(usize, usize, f64)> {
    let (first, last) = (*axis.first()?, *axis.last()?);
    if !lon.is_finite() {
        return None;
    }
    // Same longitude, expressed in the axis' own frame.
    let lon = first + (lon - first).rem_euclid(360.0);
    if lon <= last {
        bracket(axis, lon)
    } else if periodic {
        Some((axis.len() - 1, 0, (lon - last) / (first + 360.0 - last)))
    } else {
        bracket(axis, lon).or_else(|| bracket(axis, lon - 360.0))
    }
}

/// Unix time of the midpoint of calendar month `month` in `year`.
fn month_center(year: i32, month: u32) -> Option<i64> {
    let start = Utc.with_ymd_and_hms(year, month, 1, 0, 0, 0).single()?;
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    let end = Utc
        .with_ymd_and_hms(next_year, next_month, 1, 0, 0, 0)
        .single()?;
    Some((start.timestamp() + end.timestamp()) / 2)
}

/// Returns the index of the month bucket whose midpoint is closest to
/// `timestamp`, looking across year boundaries.
///
/// Ties go to the bucket whose midpoint precedes `timestamp`.
fn nearest_month(months: &[u32], timestamp: DateTime<Utc>) -> Option<usize> {
    let now = timestamp.timestamp();
    let year = timestamp.year();
    months
        .iter()
        .enumerate()
        .filter_map(|(idx, &month)| {
            (year - 1..=year + 1)
                .filter_map(|y| month_center(y, month))
                .map(|center| ((center - now).abs(), center > now))
                .min()
                .map(|(distance, after)| (distance, after, idx))
        })
        .min()
        .map(|(_, _, idx)| idx)
}

/// Returns the index of the analysis closest to `timestamp`; ties go
/// to the earlier one.
fn nearest_analysis(stamps: &[DateTime<Utc>], timestamp: DateTime<Utc>) -> Option<usize> {
    let after = stamps.partition_point(|stamp| *stamp <= timestamp);
    match (after.checked_sub(1), stamps.get(after)) {
        (None, None) => None,
        (Some(before), None) => Some(before),
        (None, Some(_)) => Some(after),
        (Some(before), Some(next)) => {
            if *next - timestamp < timestamp - stamps[before] {
                Some(after)
            } else {
                Some(before)
            }
        }
    }
}
