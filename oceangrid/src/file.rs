//! `.ssg` grid file format.
//!
//! All values are little-endian.
//!
//! ```text
//! magic      8 bytes  "SSPGRID\0"
//! version    u16
//! flags      u16      bit 0: speed field stored
//! time_kind  u8       0 = monthly, 1 = analysis
//! reserved   3 bytes
//! n_time, n_depth, n_lat, n_lon: u32
//! fill       f32
//! time axis  n_time  x i64 (month number or unix seconds)
//! depth axis n_depth x f64
//! lat axis   n_lat   x f64
//! lon axis   n_lon   x f64
//! temperature, salinity[, speed]: n_time*n_depth*n_lat*n_lon x f32
//! ```

use crate::{Axes, Cancel, FieldStore, Grid, GridError, TimeAxis};
use byteorder::{LittleEndian as LE, ReadBytesExt, WriteBytesExt};
use chrono::{TimeZone, Utc};
use log::debug;
use memmap2::Mmap;
use std::{
    fs::File,
    io::{BufReader, BufWriter, Read, Write},
    mem::size_of,
    path::Path,
    sync::Arc,
};

/// Name of the grid file expected inside a dataset folder.
pub const FILE_NAME: &str = "grid.ssg";

const MAGIC: &[u8; 8] = b"SSPGRID\0";
const VERSION: u16 = 1;
const FLAG_SPEED: u16 = 0b1;
const TIME_MONTHLY: u8 = 0;
const TIME_ANALYSIS: u8 = 1;
const HEADER_LEN: usize = 8 + 2 + 2 + 1 + 3 + 4 * 4 + 4;

struct Header {
    has_speed: bool,
    fill: f32,
    axes: Axes,

    /// Byte offset of the first field value.
    data_offset: usize,
}

impl Header {
    /// Reads the header of a `len` bytes long file.
    ///
    /// The sizes the header declares are checked against `len` before
    /// anything is allocated for the axes.
    fn read<R: Read>(rdr: &mut R, len: u64, path: &Path) -> Result<Self, GridError> {
        let mut magic = [0_u8; 8];
        rdr.read_exact(&mut magic)?;
        if &magic != MAGIC {
            return Err(GridError::Format("bad magic"));
        }
        if rdr.read_u16::<LE>()? != VERSION {
            return Err(GridError::Format("unsupported version"));
        }
        let has_speed = rdr.read_u16::<LE>()? & FLAG_SPEED != 0;
        let time_kind = rdr.read_u8()?;
        let mut reserved = [0_u8; 3];
        rdr.read_exact(&mut reserved)?;
        let n_time = rdr.read_u32::<LE>()?;
        let n_depth = rdr.read_u32::<LE>()?;
        let n_lat = rdr.read_u32::<LE>()?;
        let n_lon = rdr.read_u32::<LE>()?;
        let fill = rdr.read_f32::<LE>()?;

        let n_fields: u64 = if has_speed { 3 } else { 2 };
        let data_offset = HEADER_LEN as u64
            + u64::from(n_time) * size_of::<i64>() as u64
            + (u64::from(n_depth) + u64::from(n_lat) + u64::from(n_lon)) * size_of::<f64>() as u64;
        let expected_len = [n_time, n_depth, n_lat, n_lon]
            .into_iter()
            .try_fold(1_u64, |nodes, n| nodes.checked_mul(u64::from(n)))
            .and_then(|nodes| nodes.checked_mul(n_fields * size_of::<f32>() as u64))
            .and_then(|fields_len| fields_len.checked_add(data_offset))
            .ok_or(GridError::Format("grid too large"))?;
        if expected_len != len {
            return Err(GridError::Len(len, path.to_owned()));
        }
        let data_offset =
            usize::try_from(data_offset).map_err(|_| GridError::Format("grid too large"))?;

        let mut raw_time = vec![0_i64; n_time as usize];
        rdr.read_i64_into::<LE>(&mut raw_time)?;
        let time = match time_kind {
            TIME_MONTHLY => TimeAxis::Monthly(
                raw_time
                    .into_iter()
                    .map(|m| u32::try_from(m).map_err(|_| GridError::Format("bad month")))
                    .collect::<Result<_, _>>()?,
            ),
            TIME_ANALYSIS => TimeAxis::Analysis(
                raw_time
                    .into_iter()
                    .map(|secs| {
                        Utc.timestamp_opt(secs, 0)
                            .single()
                            .ok_or(GridError::Format("bad analysis timestamp"))
                    })
                    .collect::<Result<_, _>>()?,
            ),
            _ => return Err(GridError::Format("unknown time axis kind")),
        };

        let mut read_axis = |n: u32| -> Result<Vec<f64>, GridError> {
            let mut axis = vec![0.0; n as usize];
            rdr.read_f64_into::<LE>(&mut axis)?;
            Ok(axis)
        };
        let depth = read_axis(n_depth)?;
        let lat = read_axis(n_lat)?;
        let lon = read_axis(n_lon)?;

        Ok(Self {
            has_speed,
            fill,
            axes: Axes {
                time,
                depth,
                lat,
                lon,
            },
            data_offset,
        })
    }
}

impl Grid {
    /// Returns a Grid read into memory from the file at `path`.
    ///
    /// `cancel` is polled between depth slabs; a cancelled load
    /// returns [`GridError::Cancelled`] and nothing else.
    pub fn load<P: AsRef<Path>>(path: P, cancel: &Cancel) -> Result<Self, GridError> {
        let path = path.as_ref();
        let mut file = BufReader::new(File::open(path)?);
        let header = Header::read(&mut file, path.metadata()?.len(), path)?;

        let dims = header.axes.dims();
        let slab = dims.lat * dims.lon;
        let mut read_field = || -> Result<FieldStore, GridError> {
            let mut values = vec![0.0_f32; dims.len()];
            for chunk in values.chunks_mut(slab.max(1)) {
                cancel.check()?;
                file.read_f32_into::<LE>(chunk)?;
            }
            Ok(FieldStore::InMem(values.into_boxed_slice()))
        };
        let temperature = read_field()?;
        let salinity = read_field()?;
        let speed = if header.has_speed {
            Some(read_field()?)
        } else {
            None
        };

        debug!("loaded {path:?}; dims: {dims:?}");
        Self::from_stores(header.axes, header.fill, temperature, salinity, speed)
    }

    /// Returns a Grid using the memory-mapped file as storage.
    pub fn memmap<P: AsRef<Path>>(path: P, cancel: &Cancel) -> Result<Self, GridError> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let map = Arc::new(unsafe { Mmap::map(&file)? });
        let header = Header::read(&mut &map[..], map.len() as u64, path)?;
        cancel.check()?;

        let field_len = header.axes.dims().len() * size_of::<f32>();
        let offset = header.data_offset;
        let store = |n: usize| FieldStore::MemMap {
            map: Arc::clone(&map),
            offset: offset + n * field_len,
        };
        let temperature = store(0);
        let salinity = store(1);
        let speed = header.has_speed.then(|| store(2));

        debug!("mapped {path:?}; dims: {:?}", header.axes.dims());
        Self::from_stores(header.axes, header.fill, temperature, salinity, speed)
    }

    /// Serializes this grid to `path`.
    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<(), GridError> {
        let mut out = BufWriter::new(File::create(path)?);
        let dims = self.dims();
        let as_u32 = |n: usize| u32::try_from(n).map_err(|_| GridError::Format("axis too long"));

        out.write_all(MAGIC)?;
        out.write_u16::<LE>(VERSION)?;
        out.write_u16::<LE>(if self.has_speed() { FLAG_SPEED } else { 0 })?;
        match &self.axes().time {
            TimeAxis::Monthly(_) => out.write_u8(TIME_MONTHLY)?,
            TimeAxis::Analysis(_) => out.write_u8(TIME_ANALYSIS)?,
        }
        out.write_all(&[0; 3])?;
        for n in [dims.time, dims.depth, dims.lat, dims.lon] {
            out.write_u32::<LE>(as_u32(n)?)?;
        }
        out.write_f32::<LE>(self.fill())?;

        match &self.axes().time {
            TimeAxis::Monthly(months) => {
                for month in months {
                    out.write_i64::<LE>(i64::from(*month))?;
                }
            }
            TimeAxis::Analysis(stamps) => {
                for stamp in stamps {
                    out.write_i64::<LE>(stamp.timestamp())?;
                }
            }
        }
        for axis in [&self.axes().depth, &self.axes().lat, &self.axes().lon] {
            for value in axis {
                out.write_f64::<LE>(*value)?;
            }
        }

        let stores = [Some(&self.temperature), Some(&self.salinity), self.speed.as_ref()];
        for store in stores.into_iter().flatten() {
            for idx in 0..dims.len() {
                out.write_f32::<LE>(store.get_unchecked(idx))?;
            }
        }
        out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{Cancel, Grid, GridError, FILE_NAME, MAGIC, TIME_MONTHLY, VERSION};
    use crate::{tests::small_grid, Axes, TimeAxis};
    use byteorder::{LittleEndian as LE, WriteBytesExt};
    use chrono::{TimeZone, Utc};
    use std::io::Write;

    #[test]
    fn test_load_matches_memmap() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(FILE_NAME);
        let grid = small_grid();
        grid.write(&path).unwrap();

        let loaded = Grid::load(&path, &Cancel::never()).unwrap();
        let mapped = Grid::memmap(&path, &Cancel::never()).unwrap();
        assert_eq!(loaded.axes(), grid.axes());
        assert_eq!(mapped.axes(), grid.axes());
        let dims = grid.dims();
        for t in 0..dims.time {
            for d in 0..dims.depth {
                for j in 0..dims.lat {
                    for i in 0..dims.lon {
                        assert_eq!(grid.node(t, d, j, i), loaded.node(t, d, j, i));
                        assert_eq!(grid.node(t, d, j, i), mapped.node(t, d, j, i));
                    }
                }
            }
        }
    }

    #[test]
    fn test_analysis_axis_without_speed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(FILE_NAME);
        let stamps = vec![
            Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 3, 2, 0, 0, 0).unwrap(),
        ];
        let grid = Grid::new(
            Axes {
                time: TimeAxis::Analysis(stamps),
                depth: vec![0.0],
                lat: vec![0.0],
                lon: vec![0.0, 1.0],
            },
            f32::NAN,
            vec![10.0, 11.0, 12.0, 13.0],
            vec![35.0; 4],
            None,
        )
        .unwrap();
        grid.write(&path).unwrap();
        let loaded = Grid::load(&path, &Cancel::never()).unwrap();
        assert_eq!(loaded.axes(), grid.axes());
        assert!(!loaded.has_speed());
        assert_eq!(loaded.node(1, 0, 0, 1).unwrap().temperature, 13.0);
    }

    #[test]
    fn test_truncated_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(FILE_NAME);
        small_grid().write(&path).unwrap();
        let len = path.metadata().unwrap().len();
        let file = std::fs::OpenOptions::new().write(true).open(&path).unwrap();
        file.set_len(len - 4).unwrap();
        assert!(matches!(
            Grid::load(&path, &Cancel::never()),
            Err(GridError::Len(_, _))
        ));
        assert!(matches!(
            Grid::memmap(&path, &Cancel::never()),
            Err(GridError::Len(_, _))
        ));
    }

    #[test]
    fn test_bad_magic() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(FILE_NAME);
        std::fs::File::create(&path)
            .unwrap()
            .write_all(b"NOTAGRID and some more bytes to read")
            .unwrap();
        assert!(matches!(
            Grid::load(&path, &Cancel::never()),
            Err(GridError::Format("bad magic"))
        ));
    }

    #[test]
    fn test_cancelled_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(FILE_NAME);
        small_grid().write(&path).unwrap();
        let cancel = Cancel::never();
        cancel.cancel();
        assert!(matches!(
            Grid::load(&path, &cancel),
            Err(GridError::Cancelled)
        ));
    }

    #[test]
    fn test_oversized_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(FILE_NAME);
        let mut out = Vec::new();
        out.write_all(MAGIC).unwrap();
        out.write_u16::<LE>(VERSION).unwrap();
        out.write_u16::<LE>(0).unwrap();
        out.write_u8(TIME_MONTHLY).unwrap();
        out.write_all(&[0; 3]).unwrap();
        for _ in 0..4 {
            out.write_u32::<LE>(65536).unwrap();
        }
        out.write_f32::<LE>(-9999.0).unwrap();
        for month in 1..=12 {
            out.write_i64::<LE>(month).unwrap();
        }
        std::fs::write(&path, &out).unwrap();

        assert!(matches!(
            Grid::load(&path, &Cancel::never()),
            Err(GridError::Format("grid too large"))
        ));
        assert!(matches!(
            Grid::memmap(&path, &Cancel::never()),
            Err(GridError::Format("grid too large"))
        ));
    }

    #[test]
    fn test_header_larger_than_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(FILE_NAME);
        let mut out = Vec::new();
        out.write_all(MAGIC).unwrap();
        out.write_u16::<LE>(VERSION).unwrap();
        out.write_u16::<LE>(0).unwrap();
        out.write_u8(TIME_MONTHLY).unwrap();
        out.write_all(&[0; 3]).unwrap();
        // Fits in u64 but not in the few bytes that follow.
        for n in [u32::MAX, 1, 1, 1] {
            out.write_u32::<LE>(n).unwrap();
        }
        out.write_f32::<LE>(-9999.0).unwrap();
        std::fs::write(&path, &out).unwrap();

        assert!(matches!(
            Grid::load(&path, &Cancel::never()),
            Err(GridError::Len(36, _))
        ));
    }
}
