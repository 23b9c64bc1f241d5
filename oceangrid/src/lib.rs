//! Gridded ocean fields (temperature, salinity and optionally sound
//! speed) on a regular latitude/longitude/depth/time lattice.
//!
//! A [`Grid`] is what the atlas layer interpolates from. It can be
//! built in memory from raw parts, read from a `.ssg` file into
//! memory, or memory-mapped straight from disk.
//!
//! # Missing values
//!
//! Land and below-seafloor cells carry the grid's fill value. A node
//! is considered missing when *any* stored field at that node equals
//! the fill value or is NaN, so the mask is shared by all fields.

mod cancel;
mod error;
mod file;

pub use crate::{cancel::Cancel, error::GridError, file::FILE_NAME};
use byteorder::{ByteOrder, LittleEndian as LE};
use chrono::{DateTime, Utc};
use memmap2::Mmap;
use std::{mem::size_of, sync::Arc};

/// Time dimension of a grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimeAxis {
    /// Climatological buckets, one per calendar month (`1..=12`).
    Monthly(Vec<u32>),

    /// Forecast/analysis timestamps.
    Analysis(Vec<DateTime<Utc>>),
}

impl TimeAxis {
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        match self {
            Self::Monthly(months) => months.len(),
            Self::Analysis(stamps) => stamps.len(),
        }
    }

    fn validate(&self) -> Result<(), GridError> {
        match self {
            Self::Monthly(months) => {
                if months.iter().any(|m| !(1..=12).contains(m)) {
                    return Err(GridError::Format("month bucket outside 1..=12"));
                }
                if !months.windows(2).all(|w| w[0] < w[1]) {
                    return Err(GridError::NotMonotonic("time"));
                }
            }
            Self::Analysis(stamps) => {
                if !stamps.windows(2).all(|w| w[0] < w[1]) {
                    return Err(GridError::NotMonotonic("time"));
                }
            }
        }
        Ok(())
    }
}

/// The four axes of a grid.
#[derive(Debug, Clone, PartialEq)]
pub struct Axes {
    pub time: TimeAxis,

    /// Depth levels in meters, positive down.
    pub depth: Vec<f64>,

    /// Latitudes in degrees.
    pub lat: Vec<f64>,

    /// Longitudes in degrees. Any ascending frame is accepted
    /// (`[-180, 180)`, `[0, 360)`, ...).
    pub lon: Vec<f64>,
}

impl Axes {
    pub fn dims(&self) -> Dims {
        Dims {
            time: self.time.len(),
            depth: self.depth.len(),
            lat: self.lat.len(),
            lon: self.lon.len(),
        }
    }

    fn validate(&self) -> Result<(), GridError> {
        self.time.validate()?;
        for (name, axis) in [("depth", &self.depth), ("lat", &self.lat), ("lon", &self.lon)] {
            if !axis.windows(2).all(|w| w[0] < w[1]) {
                return Err(GridError::NotMonotonic(name));
            }
        }
        Ok(())
    }
}

/// Number of samples along each axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dims {
    pub time: usize,
    pub depth: usize,
    pub lat: usize,
    pub lon: usize,
}

impl Dims {
    /// Total number of nodes (values per field), saturating at
    /// `usize::MAX`.
    pub fn len(&self) -> usize {
        self.checked_len().unwrap_or(usize::MAX)
    }

    /// Total number of nodes, or `None` if it overflows `usize`.
    pub fn checked_len(&self) -> Option<usize> {
        [self.depth, self.lat, self.lon]
            .into_iter()
            .try_fold(self.time, usize::checked_mul)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Values stored at a single non-missing grid node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Node {
    pub temperature: f32,
    pub salinity: f32,
    pub speed: Option<f32>,
}

/// How to handle grid file contents.
///
/// Climatologies are large; mapping avoids reading fields that are
/// never queried, while loading into memory avoids page faults on
/// hot paths. Measure before choosing.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadMode {
    /// Parse fields and load into memory.
    #[default]
    InMem,

    /// Memory map file contents.
    MemMap,
}

pub(crate) enum FieldStore {
    InMem(Box<[f32]>),
    MemMap { map: Arc<Mmap>, offset: usize },
}

impl FieldStore {
    fn get_unchecked(&self, index: usize) -> f32 {
        match self {
            Self::InMem(values) => values[index],
            Self::MemMap { map, offset } => {
                let start = offset + index * size_of::<f32>();
                LE::read_f32(&map[start..start + size_of::<f32>()])
            }
        }
    }
}

pub struct Grid {
    axes: Axes,

    /// Missing-value sentinel.
    fill: f32,

    temperature: FieldStore,

    salinity: FieldStore,

    /// Not every source publishes sound speed; consumers derive it
    /// from temperature and salinity when absent.
    speed: Option<FieldStore>,
}

impl Grid {
    /// Returns a grid built from in-memory parts.
    ///
    /// Field vectors are laid out `[time][depth][lat][lon]`.
    pub fn new(
        axes: Axes,
        fill: f32,
        temperature: Vec<f32>,
        salinity: Vec<f32>,
        speed: Option<Vec<f32>>,
    ) -> Result<Self, GridError> {
        axes.validate()?;
        let expected = axes
            .dims()
            .checked_len()
            .ok_or(GridError::Format("grid too large"))?;
        let check = |field: &'static str, values: &[f32]| {
            if values.len() == expected {
                Ok(())
            } else {
                Err(GridError::Shape {
                    field,
                    expected,
                    actual: values.len(),
                })
            }
        };
        check("temperature", &temperature)?;
        check("salinity", &salinity)?;
        if let Some(speed) = &speed {
            check("speed", speed)?;
        }
        Ok(Self {
            axes,
            fill,
            temperature: FieldStore::InMem(temperature.into_boxed_slice()),
            salinity: FieldStore::InMem(salinity.into_boxed_slice()),
            speed: speed.map(|s| FieldStore::InMem(s.into_boxed_slice())),
        })
    }

    pub(crate) fn from_stores(
        axes: Axes,
        fill: f32,
        temperature: FieldStore,
        salinity: FieldStore,
        speed: Option<FieldStore>,
    ) -> Result<Self, GridError> {
        axes.validate()?;
        Ok(Self {
            axes,
            fill,
            temperature,
            salinity,
            speed,
        })
    }

    pub fn axes(&self) -> &Axes {
        &self.axes
    }

    pub fn dims(&self) -> Dims {
        self.axes.dims()
    }

    pub fn fill(&self) -> f32 {
        self.fill
    }

    pub fn has_speed(&self) -> bool {
        self.speed.is_some()
    }

    /// Returns the node at the given indices, or `None` if it is
    /// masked as missing.
    ///
    /// # Panics
    ///
    /// Panics if any index is out of range.
    pub fn node(&self, t: usize, d: usize, j: usize, i: usize) -> Option<Node> {
        let idx = self.linear_index(t, d, j, i);
        let temperature = self.valid(self.temperature.get_unchecked(idx))?;
        let salinity = self.valid(self.salinity.get_unchecked(idx))?;
        let speed = match &self.speed {
            Some(store) => Some(self.valid(store.get_unchecked(idx))?),
            None => None,
        };
        Some(Node {
            temperature,
            salinity,
            speed,
        })
    }

    pub fn is_missing(&self, t: usize, d: usize, j: usize, i: usize) -> bool {
        self.node(t, d, j, i).is_none()
    }

    /// Returns true if the longitude axis closes on itself around the
    /// globe, i.e. the gap between the last and first node is no wider
    /// than the regular spacing.
    pub fn is_lon_periodic(&self) -> bool {
        let lon = &self.axes.lon;
        match (lon.first(), lon.get(1), lon.last()) {
            (Some(first), Some(second), Some(last)) => {
                let step = second - first;
                let seam = first + 360.0 - last;
                seam > 0.0 && seam <= step * (1.0 + 1e-6)
            }
            _ => false,
        }
    }

    /// Returns the calendar month of each climatological bucket, or
    /// `None` for analysis grids.
    pub fn months(&self) -> Option<&[u32]> {
        match &self.axes.time {
            TimeAxis::Monthly(months) => Some(months),
            TimeAxis::Analysis(_) => None,
        }
    }
}

/// Private API
impl Grid {
    fn linear_index(&self, t: usize, d: usize, j: usize, i: usize) -> usize {
        let Dims {
            time,
            depth,
            lat,
            lon,
        } = self.dims();
        assert!(t < time && d < depth && j < lat && i < lon);
        ((t * depth + d) * lat + j) * lon + i
    }

    fn valid(&self, value: f32) -> Option<f32> {
        #[allow(clippy::float_cmp)]
        if value.is_nan() || value == self.fill {
            None
        } else {
            Some(value)
        }
    }
}

impl std::fmt::Debug for Grid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Grid")
            .field("dims", &self.dims())
            .field("fill", &self.fill)
            .field("has_speed", &self.has_speed())
            .finish()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::{Axes, Grid, GridError, TimeAxis};

    pub const FILL: f32 = -9999.0;

    /// 2 months x 2 depths x 3 lats x 4 lons, global at 90° spacing.
    pub fn small_grid() -> Grid {
        let axes = Axes {
            time: TimeAxis::Monthly(vec![1, 7]),
            depth: vec![0.0, 10.0],
            lat: vec![-10.0, 0.0, 10.0],
            lon: vec![-180.0, -90.0, 0.0, 90.0],
        };
        let n = axes.dims().len();
        #[allow(clippy::cast_precision_loss)]
        let temperature: Vec<f32> = (0..n).map(|i| i as f32).collect();
        let salinity = vec![35.0; n];
        let mut speed: Vec<f32> = (0..n).map(|i| 1500.0 + i as f32).collect();
        // Land at (jan, surface, lat 0, lon 0).
        speed[4 + 2] = FILL;
        Grid::new(axes, FILL, temperature, salinity, Some(speed)).unwrap()
    }

    #[test]
    fn test_node_lookup() {
        let grid = small_grid();
        let node = grid.node(1, 1, 2, 3).unwrap();
        assert_eq!(node.temperature, 47.0);
        assert_eq!(node.speed, Some(1547.0));
        assert!(grid.is_missing(0, 0, 1, 2));
        assert!(grid.node(0, 0, 1, 1).is_some());
    }

    #[test]
    fn test_dims_len_overflow() {
        let dims = super::Dims {
            time: 65536,
            depth: 65536,
            lat: 65536,
            lon: 65536,
        };
        assert_eq!(dims.checked_len(), None);
        assert_eq!(dims.len(), usize::MAX);
        assert_eq!(small_grid().dims().checked_len(), Some(48));
    }

    #[test]
    fn test_lon_periodic() {
        assert!(small_grid().is_lon_periodic());
        let regional = Grid::new(
            Axes {
                time: TimeAxis::Monthly(vec![1]),
                depth: vec![0.0],
                lat: vec![0.0, 1.0],
                lon: vec![-90.0, -89.0],
            },
            FILL,
            vec![0.0; 4],
            vec![0.0; 4],
            None,
        )
        .unwrap();
        assert!(!regional.is_lon_periodic());
    }

    #[test]
    fn test_rejects_bad_shapes() {
        let axes = Axes {
            time: TimeAxis::Monthly(vec![1]),
            depth: vec![0.0, 10.0],
            lat: vec![0.0],
            lon: vec![0.0],
        };
        assert!(matches!(
            Grid::new(axes.clone(), FILL, vec![0.0; 2], vec![0.0; 3], None),
            Err(GridError::Shape {
                field: "salinity",
                expected: 2,
                actual: 3
            })
        ));
        let mut unordered = axes;
        unordered.depth = vec![10.0, 0.0];
        assert!(matches!(
            Grid::new(unordered, FILL, vec![0.0; 2], vec![0.0; 2], None),
            Err(GridError::NotMonotonic("depth"))
        ));
    }

    #[test]
    fn test_rejects_bad_months() {
        let axes = Axes {
            time: TimeAxis::Monthly(vec![0]),
            depth: vec![0.0],
            lat: vec![0.0],
            lon: vec![0.0],
        };
        assert!(Grid::new(axes, FILL, vec![0.0], vec![0.0], None).is_err());
    }
}
