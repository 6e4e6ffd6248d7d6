//! Normal distribution approximations.
//!
//! Both functions are closed-form approximations with no iteration, so they
//! are deterministic and cheap enough to call inside tight loops.

use std::f64::consts::SQRT_2;

use crate::error::{EngineError, Result};

// Abramowitz and Stegun formula 7.1.26 for erf(x), |error| <= 1.5e-7.
const ERF_A1: f64 = 0.254_829_592;
const ERF_A2: f64 = -0.284_496_736;
const ERF_A3: f64 = 1.421_413_741;
const ERF_A4: f64 = -1.453_152_027;
const ERF_A5: f64 = 1.061_405_429;
const ERF_P: f64 = 0.327_591_1;

// Acklam's rational approximation for the normal quantile.
const ICDF_A: [f64; 6] = [
    -3.969_683_028_665_376e+01,
    2.209_460_984_245_205e+02,
    -2.759_285_104_469_687e+02,
    1.383_577_518_672_690e+02,
    -3.066_479_806_614_716e+01,
    2.506_628_277_459_239e+00,
];
const ICDF_B: [f64; 5] = [
    -5.447_609_879_822_406e+01,
    1.615_858_368_580_409e+02,
    -1.556_989_798_598_866e+02,
    6.680_131_188_771_972e+01,
    -1.328_068_155_288_572e+01,
];
const ICDF_C: [f64; 6] = [
    -7.784_894_002_430_293e-03,
    -3.223_964_580_411_365e-01,
    -2.400_758_277_161_838e+00,
    -2.549_732_539_343_734e+00,
    4.374_664_141_464_968e+00,
    2.938_163_982_698_783e+00,
];
const ICDF_D: [f64; 4] = [
    7.784_695_709_041_462e-03,
    3.224_671_290_700_398e-01,
    2.445_134_137_142_996e+00,
    3.754_408_661_907_416e+00,
];
const ICDF_P_LOW: f64 = 0.024_25;

/// Approximates the error function.
///
/// Uses the five-term rational polynomial of Abramowitz and Stegun (7.1.26).
#[must_use]
pub fn erf(x: f64) -> f64 {
    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs();

    let t = 1.0 / (1.0 + ERF_P * x);
    let poly = ((((ERF_A5 * t + ERF_A4) * t + ERF_A3) * t + ERF_A2) * t + ERF_A1) * t;
    let y = 1.0 - poly * (-x * x).exp();

    sign * y
}

/// Standard normal cumulative distribution function.
///
/// Accurate to better than 1e-7 in absolute terms.
///
/// # Examples
/// ```
/// use abtest_core::numeric::normal_cdf;
///
/// assert!((normal_cdf(0.0) - 0.5).abs() < 1e-9);
/// assert!((normal_cdf(1.96) - 0.975).abs() < 1e-4);
/// ```
#[must_use]
pub fn normal_cdf(x: f64) -> f64 {
    0.5 * (1.0 + erf(x / SQRT_2))
}

/// Inverse of the standard normal CDF.
///
/// Returns `z` such that `normal_cdf(z) = p`. The lower half is computed
/// directly (tail or central rational approximation) and the upper half by
/// reflection, `inverse_normal(p) = -inverse_normal(1 - p)`.
///
/// # Errors
///
/// Returns [`EngineError::InvalidParameter`] if `p` is not in (0, 1).
///
/// # Examples
/// ```
/// use abtest_core::numeric::inverse_normal;
///
/// let z = inverse_normal(0.975).unwrap();
/// assert!((z - 1.959964).abs() < 1e-5);
/// assert!(inverse_normal(1.0).is_err());
/// ```
pub fn inverse_normal(p: f64) -> Result<f64> {
    if !(p > 0.0 && p < 1.0) {
        return Err(EngineError::invalid_parameter(format!(
            "probability must be in (0, 1), got {p}"
        )));
    }
    if p > 0.5 {
        return Ok(-lower_quantile(1.0 - p));
    }
    Ok(lower_quantile(p))
}

/// Quantile for 0 < p <= 0.5.
fn lower_quantile(p: f64) -> f64 {
    if p < ICDF_P_LOW {
        let q = (-2.0 * p.ln()).sqrt();
        let (c, d) = (&ICDF_C, &ICDF_D);
        (((((c[0] * q + c[1]) * q + c[2]) * q + c[3]) * q + c[4]) * q + c[5])
            / ((((d[0] * q + d[1]) * q + d[2]) * q + d[3]) * q + 1.0)
    } else {
        let q = p - 0.5;
        let r = q * q;
        let (a, b) = (&ICDF_A, &ICDF_B);
        (((((a[0] * r + a[1]) * r + a[2]) * r + a[3]) * r + a[4]) * r + a[5]) * q
            / (((((b[0] * r + b[1]) * r + b[2]) * r + b[3]) * r + b[4]) * r + 1.0)
    }
}
