//! Constant-gradient ray tracing.
//!
//! Between two consecutive nodes of the layer stack the sound speed
//! varies linearly with depth, so a ray follows a circular arc whose
//! geometry has a closed form in terms of its entry and exit angles.
//! The Snell invariant `p = sin(θ) / c` is carried from layer to layer.

use crate::{Profile, SspError};
use std::ops::RangeInclusive;

/// Layers whose gradient magnitude (s⁻¹) is below this threshold are
/// traced as straight lines.
pub const ZERO_GRADIENT: f64 = 1e-9;

/// Most rays traced on either side of nadir.
pub const MAX_HALF_FAN: usize = 1 << 20;

/// Result of tracing one launch angle.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TracedRay {
    /// Launch angle from vertical, degrees. Negative angles are
    /// traced to negative ranges.
    pub angle: f64,

    /// Horizontal distance from the transducer, meters.
    pub range: f64,

    /// Depth below the transducer, meters.
    pub depth: f64,

    /// One-way travel time, seconds.
    pub time: f64,

    /// False if the ray turned before the bottom of the layer stack.
    pub complete: bool,
}

/// Depth/speed nodes a ray is traced through.
///
/// The first node is always the transducer itself.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerStack {
    depth: Vec<f64>,
    speed: Vec<f64>,
}

impl LayerStack {
    /// Builds the layer stack for `profile`.
    ///
    /// Only the profile's effective samples are used. Samples at or
    /// above `tss_depth` are dropped, and the stack is closed at
    /// `avg_depth` with a linearly interpolated node when the profile
    /// extends past it.
    pub fn new(
        profile: &Profile,
        tss_depth: f64,
        tss_value: f64,
        avg_depth: f64,
    ) -> Result<Self, SspError> {
        if !(tss_value > 0.0 && tss_value.is_finite()) {
            return Err(SspError::InvalidSpeed(tss_value));
        }
        if avg_depth <= tss_depth {
            return Err(SspError::Geometry("average depth must be below the transducer"));
        }
        let samples = profile.effective();
        if samples.len() < 2 {
            return Err(SspError::InsufficientProfile {
                layers: samples.len(),
            });
        }
        if let Some(w) = samples.depth.windows(2).find(|w| w[1] <= w[0]) {
            return Err(SspError::DegenerateLayer { depth: w[1] });
        }

        let mut depth = vec![tss_depth];
        let mut speed = vec![tss_value];
        for (&z, &c) in samples.depth.iter().zip(&samples.speed) {
            if z <= tss_depth {
                continue;
            }
            if !(c > 0.0 && c.is_finite()) {
                return Err(SspError::InvalidSpeed(c));
            }
            if z < avg_depth {
                depth.push(z);
                speed.push(c);
            } else {
                // Both vectors are non-empty, they start with the
                // transducer node.
                let (z0, c0) = (depth[depth.len() - 1], speed[speed.len() - 1]);
                depth.push(avg_depth);
                speed.push(c0 + (c - c0) * (avg_depth - z0) / (z - z0));
                break;
            }
        }

        if depth.len() < 2 {
            return Err(SspError::InsufficientProfile {
                layers: depth.len(),
            });
        }
        Ok(Self { depth, speed })
    }

    /// Number of nodes, including the transducer node.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.depth.len()
    }

    /// Absolute depth of the bottom node.
    pub fn bottom(&self) -> f64 {
        self.depth[self.depth.len() - 1]
    }

    /// Traces a single ray launched at `angle` degrees from vertical.
    ///
    /// `angle` must lie strictly inside `(-90, 90)`.
    pub fn trace(&self, angle: f64) -> TracedRay {
        let theta0 = angle.abs().to_radians();
        let p = theta0.sin() / self.speed[0];

        let (mut range, mut depth, mut time) = (0.0, 0.0, 0.0);
        let mut complete = true;
        let mut sin1 = theta0.sin();
        let mut cos1 = theta0.cos();

        for (z, c) in self.depth.windows(2).zip(self.speed.windows(2)) {
            let (dz, c1, c2) = (z[1] - z[0], c[0], c[1]);
            let g = (c2 - c1) / dz;
            let sin2 = p * c2;

            if sin2 >= 1.0 {
                // The ray turns horizontal where c = 1/p, inside this
                // layer, and never reaches its bottom.
                let c_turn = 1.0 / p;
                range += cos1 / (p * g);
                depth += (c_turn - c1) / g;
                time += ((c_turn / c1) * (1.0 + cos1)).ln() / g;
                complete = false;
                break;
            }
            let cos2 = (1.0 - sin2 * sin2).sqrt();

            if g.abs() < ZERO_GRADIENT {
                range += dz * sin1 / cos1;
                time += dz / (c1 * cos1);
            } else {
                let half_sum = (sin1.asin() + sin2.asin()) / 2.0;
                range += dz * half_sum.tan();
                time += ((c2 / c1) * (1.0 + cos1) / (1.0 + cos2)).ln() / g;
            }
            depth += dz;
            sin1 = sin2;
            cos1 = cos2;
        }

        TracedRay {
            angle,
            range: range.copysign(angle),
            depth,
            time,
            complete,
        }
    }

    /// Returns an iterator tracing a symmetric fan of launch angles
    /// covering `[-half_swath, half_swath]` with spacing no wider than
    /// `angle_step`.
    pub fn rays(&self, half_swath: f64, angle_step: f64) -> Result<RayIter<'_>, SspError> {
        RayIter::new(self, half_swath, angle_step)
    }
}

/// Lazily traces a fan of launch angles.
///
/// The fan always has an odd number of rays, with nadir in the
/// middle, and `angle(k) == -angle(len - 1 - k)` exactly.
#[derive(Debug, Clone)]
pub struct RayIter<'a> {
    layers: &'a LayerStack,
    step: f64,
    half_count: usize,
    range: RangeInclusive<usize>,
}

impl<'a> RayIter<'a> {
    pub fn new(
        layers: &'a LayerStack,
        half_swath: f64,
        angle_step: f64,
    ) -> Result<Self, SspError> {
        if !(half_swath > 0.0 && half_swath < 90.0) {
            return Err(SspError::Geometry(
                "half swath must be within (0, 90) degrees",
            ));
        }
        if !(angle_step > 0.0 && angle_step.is_finite()) {
            return Err(SspError::Geometry("angle step must be positive"));
        }
        #[allow(clippy::cast_precision_loss)]
        let max_half_fan = MAX_HALF_FAN as f64;
        if half_swath / angle_step > max_half_fan {
            return Err(SspError::Geometry("angle step too small"));
        }
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let half_count = (half_swath / angle_step).ceil() as usize;
        #[allow(clippy::cast_precision_loss)]
        let step = half_swath / half_count as f64;
        Ok(Self {
            layers,
            step,
            half_count,
            range: 0..=2 * half_count,
        })
    }

    /// Actual spacing between consecutive angles.
    pub fn step(&self) -> f64 {
        self.step
    }

    #[allow(clippy::cast_precision_loss)]
    fn angle(&self, k: usize) -> f64 {
        (k as f64 - self.half_count as f64) * self.step
    }
}

impl<'a> Iterator for RayIter<'a> {
    type Item = TracedRay;

    fn next(&mut self) -> Option<TracedRay> {
        self.range
            .next()
            .map(|k| self.layers.trace(self.angle(k)))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.range.size_hint()
    }
}

impl<'a> ExactSizeIterator for RayIter<'a> {}
