//! Integer and rational helpers shared by the reconciler and the editor.

use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// Largest value representable in a 32-bit timescale or timebase field.
pub const MAX_32: u64 = u32::MAX as u64;

/// Greatest common divisor. `gcd(0, b) == b`.
pub fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        let r = a % b;
        a = b;
        b = r;
    }
    a
}

/// Least common multiple, or `None` when the result does not fit in `u64`.
pub fn lcm(a: u64, b: u64) -> Option<u64> {
    if a == 0 || b == 0 {
        return Some(0);
    }
    (a / gcd(a, b)).checked_mul(b)
}

/// Converts `ticks` of timescale `from` into timescale `to`, rounding to nearest.
pub fn rescale(ticks: u64, from: u32, to: u32) -> u64 {
    if from == 0 {
        return 0;
    }
    (ticks as f64 / from as f64 * to as f64 + 0.5) as u64
}

/// Splits a positive value into a significand in `[1, 10)` and a power of ten.
///
/// Non-positive or non-finite input is returned untouched with an exponent of 1.
pub fn sigexp10(value: f64) -> (f64, f64) {
    if !(value.is_finite() && value > 0.0) {
        return (value, 1.0);
    }
    let mut significand = value;
    let mut exponent = 1.0;
    while significand < 1.0 {
        significand *= 10.0;
        exponent /= 10.0;
    }
    while significand >= 10.0 {
        significand /= 10.0;
        exponent *= 10.0;
    }
    (significand, exponent)
}

/// Parses a frame rate written either as a decimal (`23.976`) or as a
/// fraction (`24000/1001`).
pub fn parse_rate(text: &str) -> Option<f64> {
    let text = text.trim();
    match text.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.trim().parse().ok()?;
            let den: f64 = den.trim().parse().ok()?;
            if den == 0.0 { None } else { Some(num / den) }
        }
        None => text.parse().ok(),
    }
}

/// A non-negative rational number of seconds, such as `--skip 1001/24000`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rational {
    pub num: u64,
    pub den: u64,
}

impl Rational {
    pub const ZERO: Rational = Rational { num: 0, den: 1 };

    pub fn new(num: u64, den: u64) -> Option<Self> {
        (den != 0).then_some(Self { num, den })
    }

    pub fn is_zero(&self) -> bool {
        self.num == 0
    }

    /// Converts to ticks of `timescale`, rounding to nearest.
    pub fn to_ticks(&self, timescale: u64) -> u64 {
        (self.num as f64 * timescale as f64 / self.den as f64 + 0.5) as u64
    }
}

impl Default for Rational {
    fn default() -> Self {
        Self::ZERO
    }
}

impl fmt::Display for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.den == 1 {
            write!(f, "{}", self.num)
        } else {
            write!(f, "{}/{}", self.num, self.den)
        }
    }
}

impl FromStr for Rational {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || CoreError::Configuration(format!("invalid rational value '{}'", s));
        let (num, den) = match s.trim().split_once('/') {
            Some((n, d)) => (n.trim(), d.trim()),
            None => (s.trim(), "1"),
        };
        let num = num.parse::<u64>().map_err(|_| invalid())?;
        let den = den.parse::<u64>().map_err(|_| invalid())?;
        Rational::new(num, den).ok_or_else(invalid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gcd_and_lcm() {
        assert_eq!(gcd(48, 18), 6);
        assert_eq!(gcd(0, 7), 7);
        assert_eq!(lcm(24000, 30000), Some(120000));
        assert_eq!(lcm(u64::MAX, u64::MAX - 1), None);
    }

    #[test]
    fn rescale_rounds_to_nearest() {
        assert_eq!(rescale(1001, 24000, 600), 25);
        assert_eq!(rescale(90000, 90000, 1000), 1000);
        assert_eq!(rescale(5, 0, 1000), 0);
    }

    #[test]
    fn sigexp10_splits_decimal_magnitude() {
        let (sig, exp) = sigexp10(23.976);
        assert!((sig - 2.3976).abs() < 1e-12);
        assert_eq!(exp, 10.0);

        let (sig, exp) = sigexp10(0.5);
        assert!((sig - 5.0).abs() < 1e-12);
        assert!((exp - 0.1).abs() < 1e-12);
    }

    #[test]
    fn rates_accept_fractions() {
        assert!((parse_rate("24000/1001").unwrap() - 23.976_023_976).abs() < 1e-9);
        assert_eq!(parse_rate(" 25 "), Some(25.0));
        assert_eq!(parse_rate("30/0"), None);
        assert_eq!(parse_rate("abc"), None);
    }

    #[test]
    fn rationals_parse_and_scale() {
        let r: Rational = "1001/24000".parse().unwrap();
        assert_eq!(r, Rational { num: 1001, den: 24000 });
        assert_eq!(r.to_ticks(24000), 1001);
        assert_eq!("2".parse::<Rational>().unwrap().to_ticks(90000), 180000);
        assert!("1/0".parse::<Rational>().is_err());
        assert!("x".parse::<Rational>().is_err());
    }
}
