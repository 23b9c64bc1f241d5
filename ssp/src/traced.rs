use crate::{LayerStack, Profile, SspError, TracedRay};
use log::debug;
use std::fmt;

/// Per-angle range/depth/time table for a sound-speed profile.
///
/// Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct TracedProfile {
    tss_depth: f64,
    tss_value: f64,
    avg_depth: f64,
    half_swath: f64,
    angle_step: f64,
    rays: Vec<TracedRay>,
}

impl TracedProfile {
    pub fn builder() -> TracedProfileBuilder {
        TracedProfileBuilder {
            tss_depth: None,
            tss_value: None,
            avg_depth: None,
            half_swath: None,
            angle_step: 1.0,
        }
    }

    /// Transducer depth, meters.
    pub fn tss_depth(&self) -> f64 {
        self.tss_depth
    }

    /// Sound speed at the transducer, m/s.
    pub fn tss_value(&self) -> f64 {
        self.tss_value
    }

    /// Nominal water depth bounding the trace, meters.
    pub fn avg_depth(&self) -> f64 {
        self.avg_depth
    }

    /// Degrees either side of nadir.
    pub fn half_swath(&self) -> f64 {
        self.half_swath
    }

    /// Requested maximum angular spacing, degrees.
    pub fn angle_step(&self) -> f64 {
        self.angle_step
    }

    /// Rays ordered from `-half_swath` to `+half_swath`.
    pub fn rays(&self) -> &[TracedRay] {
        &self.rays
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TracedRay> {
        self.rays.iter()
    }
}

impl fmt::Display for TracedProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "tss: {} m @ {} m/s, avg depth: {} m, half swath: {}°",
            self.tss_depth, self.tss_value, self.avg_depth, self.half_swath
        )?;
        for ray in &self.rays {
            writeln!(
                f,
                "{:7.2}° {:10.3} m {:9.3} m {:8.5} s{}",
                ray.angle,
                ray.range,
                ray.depth,
                ray.time,
                if ray.complete { "" } else { " (turned)" }
            )?;
        }
        Ok(())
    }
}

pub struct TracedProfileBuilder {
    /// Transducer depth (meters, required).
    tss_depth: Option<f64>,

    /// Sound speed at the transducer (m/s, required).
    tss_value: Option<f64>,

    /// Nominal water depth (meters, required).
    avg_depth: Option<f64>,

    /// Maximum angle either side of nadir (degrees, required).
    half_swath: Option<f64>,

    /// Maximum angular spacing between rays (degrees, defaults to 1).
    angle_step: f64,
}

impl TracedProfileBuilder {
    /// Transducer depth (meters, required).
    #[must_use]
    pub fn tss_depth(mut self, meters: f64) -> Self {
        self.tss_depth = Some(meters);
        self
    }

    /// Sound speed at the transducer (m/s, required).
    #[must_use]
    pub fn tss_value(mut self, speed: f64) -> Self {
        self.tss_value = Some(speed);
        self
    }

    /// Nominal water depth (meters, required).
    #[must_use]
    pub fn avg_depth(mut self, meters: f64) -> Self {
        self.avg_depth = Some(meters);
        self
    }

    /// Maximum angle either side of nadir (degrees, required).
    #[must_use]
    pub fn half_swath(mut self, degrees: f64) -> Self {
        self.half_swath = Some(degrees);
        self
    }

    /// Maximum angular spacing between rays (degrees, defaults to 1).
    #[must_use]
    pub fn angle_step(mut self, degrees: f64) -> Self {
        self.angle_step = degrees;
        self
    }

    pub fn build(&self, profile: &Profile) -> Result<TracedProfile, SspError> {
        let tss_depth = self.tss_depth.ok_or(SspError::Builder("tss_depth"))?;
        let tss_value = self.tss_value.ok_or(SspError::Builder("tss_value"))?;
        let avg_depth = self.avg_depth.ok_or(SspError::Builder("avg_depth"))?;
        let half_swath = self.half_swath.ok_or(SspError::Builder("half_swath"))?;

        let now = std::time::Instant::now();
        let layers = LayerStack::new(profile, tss_depth, tss_value, avg_depth)?;
        let rays: Vec<TracedRay> = layers.rays(half_swath, self.angle_step)?.collect();
        debug!(
            "traced profile; layers: {}, rays: {}, exec: {:?}",
            layers.len(),
            rays.len(),
            now.elapsed()
        );

        Ok(TracedProfile {
            tss_depth,
            tss_value,
            avg_depth,
            half_swath,
            angle_step: self.angle_step,
            rays,
        })
    }
}

/// Traces `profile` across `[-half_swath, half_swath]`.
pub fn trace(
    profile: &Profile,
    tss_depth: f64,
    tss_value: f64,
    avg_depth: f64,
    half_swath: f64,
    angle_step: f64,
) -> Result<TracedProfile, SspError> {
    TracedProfile::builder()
        .tss_depth(tss_depth)
        .tss_value(tss_value)
        .avg_depth(avg_depth)
        .half_swath(half_swath)
        .angle_step(angle_step)
        .build(profile)
}

#[cfg(test)]
mod tests {
    use super::{trace, TracedProfile};
    use crate::{profile::tests::fake_ssp, Flag, Profile, SspError};

    fn survey(profile: &Profile) -> Result<TracedProfile, SspError> {
        trace(profile, 5.0, 1500.0, 1000.0, 70.0, 1.0)
    }

    #[test]
    fn test_survey_fan() {
        let traced = survey(&fake_ssp()).unwrap();
        let rays = traced.rays();
        assert_eq!(rays.len(), 141);
        assert_eq!(rays[0].angle, -70.0);
        assert_eq!(rays[140].angle, 70.0);

        // Nadir outwards, starboard side.
        let starboard = &rays[70..];
        assert_eq!(starboard[0].angle, 0.0);
        for pair in starboard.windows(2) {
            assert!(pair[1].range > pair[0].range);
            assert!(pair[1].time > pair[0].time);
            assert!(pair[1].depth >= pair[0].depth);
        }
        for ray in rays {
            assert!(ray.complete);
            assert!(ray.time > 0.0);
            assert!((ray.depth - 94.5).abs() < 1e-9);
        }
    }

    #[test]
    fn test_excluded_samples_are_ignored() {
        let profile = fake_ssp();
        let baseline = survey(&profile).unwrap();

        let mut noisy = profile.clone();
        for idx in 40..70 {
            noisy.speed[idx] = 9999.0;
        }
        assert_eq!(survey(&noisy).unwrap(), baseline);

        let effective = profile.effective();
        let stripped = Profile::new(
            profile.meta.clone(),
            effective.depth,
            effective.speed,
            effective.temperature,
            effective.salinity,
        )
        .unwrap();
        assert_eq!(survey(&stripped).unwrap(), baseline);

        noisy.set_flag(40..70, Flag::Valid);
        assert_ne!(survey(&noisy).unwrap(), baseline);
    }

    #[test]
    fn test_single_sample_is_insufficient() {
        let full = fake_ssp();
        let single = Profile::new(
            full.meta.clone(),
            vec![full.depth[0]],
            vec![full.speed[0]],
            vec![full.temperature[0]],
            vec![full.salinity[0]],
        )
        .unwrap();
        assert_eq!(
            survey(&single),
            Err(SspError::InsufficientProfile { layers: 1 })
        );
    }

    #[test]
    fn test_tiny_angle_step_is_rejected() {
        assert_eq!(
            trace(&fake_ssp(), 5.0, 1500.0, 1000.0, 70.0, 1e-300),
            Err(SspError::Geometry("angle step too small"))
        );
    }

    #[test]
    fn test_builder_requires_params() {
        assert_eq!(
            TracedProfile::builder()
                .tss_depth(5.0)
                .tss_value(1500.0)
                .half_swath(70.0)
                .build(&fake_ssp()),
            Err(SspError::Builder("avg_depth"))
        );
    }

    #[test]
    fn test_display() {
        let traced = survey(&fake_ssp()).unwrap();
        let text = traced.to_string();
        assert_eq!(text.lines().count(), 1 + traced.rays().len());
        assert!(text.starts_with("tss: 5 m @ 1500 m/s"));
    }
}
