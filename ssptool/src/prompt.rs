//! Values a workflow needs from the user.
//!
//! The atlas and ray tracing libraries take resolved coordinates and
//! times as plain arguments; anything that has to be asked for goes
//! through a [`Prompt`].

use anyhow::{anyhow, Error as AnyError};
use chrono::{DateTime, Utc};

pub trait Prompt {
    /// Latitude and longitude, in degrees.
    fn ask_location(&self) -> Option<(f64, f64)>;

    fn ask_date(&self) -> Option<DateTime<Utc>>;

    /// Sound speed at the transducer, in m/s.
    fn ask_tss(&self) -> Option<f64>;

    /// Transducer depth, in meters.
    fn ask_draft(&self) -> Option<f64>;
}

/// Answers from command line arguments.
#[derive(Debug, Clone, Default)]
pub struct ArgsPrompt {
    pub location: Option<(f64, f64)>,
    pub date: Option<DateTime<Utc>>,
    pub tss: Option<f64>,
    pub draft: Option<f64>,
}

impl Prompt for ArgsPrompt {
    fn ask_location(&self) -> Option<(f64, f64)> {
        self.location
    }

    fn ask_date(&self) -> Option<DateTime<Utc>> {
        self.date
    }

    fn ask_tss(&self) -> Option<f64> {
        self.tss
    }

    fn ask_draft(&self) -> Option<f64> {
        self.draft
    }
}

/// Returns where and when to retrieve an atlas profile.
///
/// A missing date means now. A missing location aborts the retrieval.
pub fn retrieval_point(prompt: &dyn Prompt) -> Result<(f64, f64, DateTime<Utc>), AnyError> {
    let (lat, lon) = prompt
        .ask_location()
        .ok_or_else(|| anyhow!("a location is required to retrieve an atlas profile"))?;
    let date = prompt.ask_date().unwrap_or_else(Utc::now);
    Ok((lat, lon, date))
}
