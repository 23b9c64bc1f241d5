//! # Sound-speed profiles
//!
//! `ssp` provides the sound-speed profile data model and the
//! refraction ray tracer used to geo-reference multibeam soundings.

mod error;
mod list;
pub mod math;
mod profile;
mod ray;
mod traced;

pub use crate::{
    error::SspError,
    list::ProfileList,
    profile::{wrap_longitude, Flag, Meta, Profile, Samples, Selection},
    ray::{LayerStack, RayIter, TracedRay, MAX_HALF_FAN, ZERO_GRADIENT},
    traced::{trace, TracedProfile, TracedProfileBuilder},
};
