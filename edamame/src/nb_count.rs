use crate::common::*;

use rand::Rng;
use rand_distr::{Distribution, Gamma, Poisson};

/// Default NB size (shape). Smaller values mean stronger overdispersion.
pub const DEFAULT_NB_SIZE: f32 = 5.0;

/// Negative binomial count sampler with a fixed size parameter `r`,
/// parameterized by the mean `mu`. Draws go through the Poisson-Gamma
/// mixture:
///
/// ```text
/// lambda ~ Gamma(shape = r, scale = mu / r)
/// y | lambda ~ Poisson(lambda)
/// ```
///
/// so that `E[y] = mu` and `Var[y] = mu + mu^2 / r`.
#[derive(Debug, Clone, Copy)]
pub struct NegBinomSampler {
    size: f64,
}

impl NegBinomSampler {
    pub fn new(size: f32) -> anyhow::Result<Self> {
        if !(size.is_finite() && size > 0.) {
            return Err(ConfigError::InvalidParameter(format!(
                "NB size must be positive and finite, got {}",
                size
            ))
            .into());
        }
        Ok(Self { size: size as f64 })
    }

    pub fn size(&self) -> f32 {
        self.size as f32
    }

    /// Draw `n` independent counts with mean `mu`. `mu = 0` gives all
    /// zeros without touching the random stream.
    pub fn sample_counts<R: Rng + ?Sized>(
        &self,
        mu: f32,
        n: usize,
        rng: &mut R,
    ) -> anyhow::Result<Vec<u32>> {
        if !(mu.is_finite() && mu >= 0.) {
            return Err(ConfigError::InvalidParameter(format!(
                "NB mean must be non-negative and finite, got {}",
                mu
            ))
            .into());
        }

        if mu == 0. {
            return Ok(vec![0; n]);
        }

        let rgamma = Gamma::new(self.size, mu as f64 / self.size)?;

        (0..n)
            .map(|_| -> anyhow::Result<u32> {
                let lambda = rgamma.sample(rng);
                if lambda > 0. {
                    let rpois = Poisson::new(lambda).map_err(|e| {
                        ConfigError::InvalidParameter(format!(
                            "NB mean {} gives Poisson rate {}: {}",
                            mu, lambda, e
                        ))
                    })?;
                    let y: f64 = rpois.sample(rng).round();
                    if y > u32::MAX as f64 {
                        return Err(ConfigError::InvalidParameter(format!(
                            "NB mean {} drew count {} beyond the u32 range",
                            mu, y
                        ))
                        .into());
                    }
                    Ok(y as u32)
                } else {
                    Ok(0)
                }
            })
            .collect()
    }
}

impl Default for NegBinomSampler {
    fn default() -> Self {
        Self {
            size: DEFAULT_NB_SIZE as f64,
        }
    }
}
