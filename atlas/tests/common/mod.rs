#![allow(dead_code, clippy::cast_precision_loss)]

use atlas::{
    oceangrid::{Axes, Grid, TimeAxis, FILE_NAME},
    AtlasConfig, Source,
};
use chrono::{DateTime, TimeZone, Utc};
use std::path::Path;
use tempfile::TempDir;

pub const FILL: f32 = -9999.0;

pub fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
}

/// 5° global climatology, four seasonal buckets, no stored speed.
/// Land covers lat 40..=45, lon 0..=5.
pub fn climatology() -> Grid {
    let axes = Axes {
        time: TimeAxis::Monthly(vec![1, 4, 7, 10]),
        depth: vec![0.0, 10.0, 50.0, 200.0, 1000.0],
        lat: (0..35).map(|j| -85.0 + 5.0 * j as f64).collect(),
        lon: (0..72).map(|i| -180.0 + 5.0 * i as f64).collect(),
    };
    let dims = axes.dims();
    let mut temperature = Vec::with_capacity(dims.len());
    let mut salinity = Vec::with_capacity(dims.len());
    for t in 0..dims.time {
        for (d, depth) in axes.depth.iter().enumerate() {
            for lat in &axes.lat {
                for lon in &axes.lon {
                    let land = (40.0..=45.0).contains(lat) && (0.0..=5.0).contains(lon);
                    if land {
                        temperature.push(FILL);
                        salinity.push(FILL);
                    } else {
                        let surface = 28.0 - 0.25 * lat.abs() + t as f64;
                        temperature.push((surface * (-depth / 500.0).exp() + 2.0) as f32);
                        salinity.push((34.5 + 0.1 * d as f64) as f32);
                    }
                }
            }
        }
    }
    Grid::new(axes, FILL, temperature, salinity, None).unwrap()
}

/// Regional forecast over the Gulf of Mexico with two analyses a day
/// apart and stored speed.
pub fn forecast() -> Grid {
    let axes = Axes {
        time: TimeAxis::Analysis(vec![at(2024, 3, 1, 0), at(2024, 3, 2, 0)]),
        depth: vec![0.0, 20.0, 100.0],
        lat: (0..11).map(|j| 20.0 + j as f64).collect(),
        lon: (0..11).map(|i| -98.0 + i as f64).collect(),
    };
    let dims = axes.dims();
    let n = dims.len();
    let speed = (0..n).map(|idx| 1520.0 - (idx % 7) as f32).collect();
    Grid::new(axes, FILL, vec![24.0; n], vec![36.0; n], Some(speed)).unwrap()
}

pub fn write(root: &Path, source: Source, grid: &Grid) {
    let folder = root.join(source.folder_name());
    std::fs::create_dir_all(&folder).unwrap();
    grid.write(folder.join(FILE_NAME)).unwrap();
}

/// Data root with WOA13 and RTOFS on disk.
pub fn data_dir() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), Source::Woa13, &climatology());
    write(dir.path(), Source::Rtofs, &forecast());
    dir
}

pub fn config(dir: &TempDir) -> AtlasConfig {
    AtlasConfig {
        data_dir: dir.path().to_owned(),
        enabled: vec![Source::Woa09, Source::Woa13, Source::Rtofs],
        ..AtlasConfig::default()
    }
}
