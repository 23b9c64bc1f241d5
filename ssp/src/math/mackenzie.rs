use num_traits::{Float, FromPrimitive};

/// Returns the speed of sound in seawater (m/s) from temperature
/// (°C), salinity (PSU) and depth (m) using Mackenzie's nine-term
/// equation.
///
/// Valid for 2-30 °C, 25-40 PSU and 0-8000 m.
///
/// # References
///
/// 1. K.V. Mackenzie, *Nine-term equation for sound speed in the
///    oceans*, J. Acoust. Soc. Am. 70(3), 1981.
#[allow(clippy::many_single_char_names)]
pub fn mackenzie<T>(t: T, s: T, d: T) -> T
where
    T: Float + FromPrimitive,
{
    let k = |v: f64| T::from_f64(v).unwrap_or_else(T::nan);
    let ds = s - k(35.0);
    k(1448.96) + k(4.591) * t - k(5.304e-2) * t.powi(2)
        + k(2.374e-4) * t.powi(3)
        + k(1.340) * ds
        + k(1.630e-2) * d
        + k(1.675e-7) * d.powi(2)
        - k(1.025e-2) * t * ds
        - k(7.139e-13) * t * d.powi(3)
}

#[cfg(test)]
mod tests {
    use super::mackenzie;
    use approx::assert_relative_eq;

    #[test]
    fn test_check_value() {
        assert_relative_eq!(
            mackenzie(25.0_f64, 35.0, 1000.0),
            1550.744_027_5,
            epsilon = 1e-6
        );
    }

    #[test]
    fn test_f32() {
        assert_relative_eq!(mackenzie(10.0_f32, 35.0, 0.0), 1489.8034, epsilon = 1e-3);
    }
}
