//! Random variate generation for Monte Carlo estimation.
//!
//! All generators draw from a [`UniformSource`], so simulations can be made
//! reproducible by injecting a seeded source. Any `rand` RNG is a source:
//!
//! ```
//! use abtest_core::random::{beta_random, seeded_source};
//!
//! let mut rng = seeded_source(42);
//! let x = beta_random(&mut rng, 2.0, 5.0);
//! assert!(x > 0.0 && x < 1.0);
//! ```

use std::f64::consts::PI;

use rand::distributions::Open01;
use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// A source of independent uniform(0, 1) draws.
///
/// Implementations must never return exactly 0 or 1; the Box-Muller and
/// Marsaglia-Tsang steps take logarithms of the draws.
pub trait UniformSource {
    /// Returns the next draw from the open interval (0, 1).
    fn next_uniform(&mut self) -> f64;
}

impl<R: RngCore> UniformSource for R {
    fn next_uniform(&mut self) -> f64 {
        self.sample(Open01)
    }
}

/// Creates a deterministic source for the given seed.
#[must_use]
pub fn seeded_source(seed: u64) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(seed)
}

/// Creates a source seeded from `seed` when present, otherwise from OS entropy.
#[must_use]
pub fn source_from_seed(seed: Option<u64>) -> ChaCha8Rng {
    match seed {
        Some(seed) => ChaCha8Rng::seed_from_u64(seed),
        None => ChaCha8Rng::from_entropy(),
    }
}

/// Draws a standard normal variate using the Box-Muller transform.
pub fn standard_normal<S: UniformSource + ?Sized>(source: &mut S) -> f64 {
    let u1 = source.next_uniform();
    let u2 = source.next_uniform();
    (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
}

/// Draws from Gamma(shape, 1) with Marsaglia and Tsang's squeeze method.
///
/// Shapes below 1 are boosted to `shape + 1` and rescaled by `U^(1/shape)`.
/// `shape` must be positive; callers validate it.
pub fn gamma_random<S: UniformSource + ?Sized>(source: &mut S, shape: f64) -> f64 {
    debug_assert!(shape > 0.0, "gamma shape must be positive, got {shape}");

    if shape < 1.0 {
        let boosted = gamma_random(source, shape + 1.0);
        return boosted * source.next_uniform().powf(1.0 / shape);
    }

    let d = shape - 1.0 / 3.0;
    let c = 1.0 / (9.0 * d).sqrt();

    loop {
        let x = standard_normal(source);
        let v = 1.0 + c * x;
        if v <= 0.0 {
            continue;
        }
        let v = v * v * v;
        let u = source.next_uniform();
        let x2 = x * x;

        // Squeeze
        if u < 1.0 - 0.0331 * x2 * x2 {
            return d * v;
        }
        if u.ln() < 0.5 * x2 + d * (1.0 - v + v.ln()) {
            return d * v;
        }
    }
}

/// Draws from Beta(alpha, beta) as `X / (X + Y)` with independent gamma draws.
pub fn beta_random<S: UniformSource + ?Sized>(source: &mut S, alpha: f64, beta: f64) -> f64 {
    let x = gamma_random(source, alpha);
    let y = gamma_random(source, beta);
    x / (x + y)
}
