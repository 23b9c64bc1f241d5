use anyhow::{anyhow, Error as AnyError};
use atlas::Source;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use std::{path::PathBuf, str::FromStr};

/// Query ocean atlases and ray trace sound-speed profiles.
#[derive(Parser, Debug, Clone)]
pub struct Cli {
    /// Atlas settings file (JSON).
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Directory holding one folder per atlas source. Overrides the
    /// settings file.
    #[arg(short, long)]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Clone, Debug, Copy, PartialEq)]
pub struct LatLon(pub f64, pub f64);

impl FromStr for LatLon {
    type Err = AnyError;
    fn from_str(s: &str) -> Result<Self, AnyError> {
        let (lat_str, lon_str) = s
            .split_once(',')
            .ok_or_else(|| anyhow!("not a valid lat,lon"))?;
        let lat = f64::from_str(lat_str.trim())?;
        let lon = f64::from_str(lon_str.trim())?;
        if !(-90.0..=90.0).contains(&lat) {
            return Err(anyhow!("latitude {lat} outside [-90, 90]"));
        }
        Ok(Self(lat, lon))
    }
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Show which atlas sources are available locally.
    Status,

    /// Print the profile interpolated from one source as JSON.
    Query {
        /// woa09, woa13, rtofs or gomofs.
        #[arg(short, long)]
        source: Source,

        /// Position "lat,lon" in degrees.
        #[arg(short, long, allow_hyphen_values = true)]
        position: Option<LatLon>,

        /// UTC time (RFC 3339), defaults to now.
        #[arg(short, long)]
        time: Option<DateTime<Utc>>,
    },

    /// Attach atlas profiles from every enabled source to a JSON list
    /// of profiles and print the result.
    Annotate {
        /// JSON file holding a list of profiles.
        profiles: PathBuf,
    },

    /// Ray trace a profile across the swath.
    Trace {
        /// JSON file holding one profile.
        profile: PathBuf,

        /// Transducer depth, in meters.
        #[arg(long)]
        draft: Option<f64>,

        /// Sound speed at the transducer, in m/s. Taken from the
        /// profile when omitted.
        #[arg(long)]
        tss: Option<f64>,

        /// Nominal water depth, in meters.
        #[arg(long)]
        avg_depth: f64,

        /// Maximum angle either side of nadir, in degrees.
        #[arg(long, default_value_t = 70.0)]
        half_swath: f64,

        /// Maximum spacing between traced angles, in degrees.
        #[arg(long, default_value_t = 1.0)]
        angle_step: f64,

        #[command(subcommand)]
        output: Output,
    },
}

#[derive(Debug, Subcommand, Clone, Copy)]
pub enum Output {
    /// Print rays to stdout as CSV.
    Csv,

    /// Print rays to stdout as JSON.
    Json,

    /// Plot to terminal.
    Plot,
}
