//! Numeric helpers for the `!` operator.

use std::f64::consts::{PI, TAU};

/// Lanczos coefficients, g = 7, n = 9.
const LANCZOS: [f64; 9] = [
    0.999_999_999_999_809_9,
    676.520_368_121_885_1,
    -1_259.139_216_722_402_8,
    771.323_428_777_653_1,
    -176.615_029_162_140_6,
    12.507_343_278_686_905,
    -0.138_571_095_265_720_12,
    9.984_369_578_019_572e-6,
    1.505_632_735_149_311_6e-7,
];
const LANCZOS_G: f64 = 7.0;

/// Largest integer whose factorial is finite in `f64`.
const MAX_EXACT_FACTORIAL: f64 = 170.0;

/// The gamma function. `None` at the poles (zero and the negative integers).
pub fn gamma(z: f64) -> Option<f64> {
    if z <= 0.0 && z.fract() == 0.0 {
        return None;
    }
    if z < 0.5 {
        // Reflection formula.
        return Some(PI / ((PI * z).sin() * gamma(1.0 - z)?));
    }
    let z = z - 1.0;
    let mut x = LANCZOS[0];
    for (i, &c) in LANCZOS.iter().enumerate().skip(1) {
        x += c / (z + i as f64);
    }
    let t = z + LANCZOS_G + 0.5;
    Some(TAU.sqrt() * t.powf(z + 0.5) * (-t).exp() * x)
}

/// `x!`, defined as gamma(x + 1). Non-negative integers are multiplied out
/// so the result is exact; everything else goes through [`gamma`].
pub fn factorial(x: f64) -> Option<f64> {
    if x >= 0.0 && x.fract() == 0.0 {
        if x > MAX_EXACT_FACTORIAL {
            return Some(f64::INFINITY);
        }
        let mut acc = 1.0;
        let mut k = 2.0;
        while k <= x {
            acc *= k;
            k += 1.0;
        }
        return Some(acc);
    }
    gamma(x + 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_factorials_are_exact() {
        assert_eq!(factorial(0.0), Some(1.0));
        assert_eq!(factorial(5.0), Some(120.0));
        assert_eq!(factorial(10.0), Some(3_628_800.0));
    }

    #[test]
    fn half_integer_factorial() {
        // 0.5! = sqrt(pi) / 2
        let value = factorial(0.5).expect("defined");
        assert!((value - PI.sqrt() / 2.0).abs() < 1e-12);
    }

    #[test]
    fn negative_half_uses_reflection() {
        // (-0.5)! = gamma(0.5) = sqrt(pi)
        let value = factorial(-0.5).expect("defined");
        assert!((value - PI.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn poles_are_undefined() {
        assert_eq!(factorial(-1.0), None);
        assert_eq!(gamma(0.0), None);
        assert_eq!(gamma(-3.0), None);
    }

    #[test]
    fn huge_factorial_overflows_to_infinity() {
        assert_eq!(factorial(171.0), Some(f64::INFINITY));
    }
}
