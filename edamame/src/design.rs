use crate::common::*;

use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sex {
    Female,
    Male,
}

impl std::fmt::Display for Sex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Sex::Female => write!(f, "female"),
            Sex::Male => write!(f, "male"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Pathology {
    Control,
    Disease,
}

impl std::fmt::Display for Pathology {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Pathology::Control => write!(f, "control"),
            Pathology::Disease => write!(f, "disease"),
        }
    }
}

/// One simulated biological sample
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SampleSpec {
    pub id: Box<str>,
    pub sex: Sex,
    pub pathology: Pathology,
}

impl SampleSpec {
    pub fn new(id: &str, sex: Sex, pathology: Pathology) -> Self {
        Self {
            id: Box::from(id),
            sex,
            pathology,
        }
    }

    /// Prefix of this sample's cell labels
    pub fn tag(&self) -> String {
        format!("{}_", self.id)
    }
}

/// The 2 x 2 design: female control, female disease, male control,
/// male disease
pub fn reference_samples() -> Vec<SampleSpec> {
    vec![
        SampleSpec::new("sample1", Sex::Female, Pathology::Control),
        SampleSpec::new("sample2", Sex::Female, Pathology::Disease),
        SampleSpec::new("sample3", Sex::Male, Pathology::Control),
        SampleSpec::new("sample4", Sex::Male, Pathology::Disease),
    ]
}

/// Index of the male-disease sample in [`reference_samples`]
pub const DEFAULT_SIGNAL_SAMPLE: usize = 3;

/// Parameters of one simulation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimParams {
    pub n_genes: usize,
    pub cells_per_sample: usize,
    pub n_diff_genes: usize,
    pub baseline_mean: f32,
    pub baseline_sd: f32,
    pub noise_sd: f32,
    pub signal_mean: f32,
    pub signal_sd: f32,
    pub nb_size: f32,
    pub n_pseudobulks: usize,
    pub signal_sample: usize,
    pub seed: u64,
}

impl Default for SimParams {
    fn default() -> Self {
        Self {
            n_genes: 2000,
            cells_per_sample: 500,
            n_diff_genes: 100,
            baseline_mean: 2.0,
            baseline_sd: 1.0,
            noise_sd: 0.1,
            signal_mean: 5.0,
            signal_sd: 2.0,
            nb_size: crate::nb_count::DEFAULT_NB_SIZE,
            n_pseudobulks: 5,
            signal_sample: DEFAULT_SIGNAL_SAMPLE,
            seed: 42,
        }
    }
}

fn invalid(msg: String) -> anyhow::Error {
    ConfigError::InvalidParameter(msg).into()
}

impl SimParams {
    /// Check every precondition before anything is drawn
    pub fn validate(&self, n_samples: usize) -> anyhow::Result<()> {
        if self.n_genes == 0 {
            return Err(invalid("need at least one gene".into()));
        }

        if self.cells_per_sample == 0 {
            return Err(invalid("need at least one cell per sample".into()));
        }

        if self.n_pseudobulks == 0 {
            return Err(invalid("need at least one pseudobulk per sample".into()));
        }

        if self.cells_per_sample % self.n_pseudobulks != 0 {
            return Err(ConfigError::IndivisiblePseudobulks {
                cells: self.cells_per_sample,
                pseudobulks: self.n_pseudobulks,
            }
            .into());
        }

        if self.n_diff_genes > self.n_genes {
            return Err(ConfigError::NotEnoughGenes {
                requested: self.n_diff_genes,
                available: self.n_genes,
            }
            .into());
        }

        if self.signal_sample >= n_samples {
            return Err(invalid(format!(
                "signal sample index {} out of {} samples",
                self.signal_sample, n_samples
            )));
        }

        for (name, mean) in [
            ("baseline mean", self.baseline_mean),
            ("signal mean", self.signal_mean),
        ] {
            if !mean.is_finite() {
                return Err(invalid(format!("{} must be finite", name)));
            }
        }

        for (name, sd) in [
            ("baseline sd", self.baseline_sd),
            ("noise sd", self.noise_sd),
            ("signal sd", self.signal_sd),
        ] {
            if !(sd.is_finite() && sd >= 0.) {
                return Err(invalid(format!("{} must be non-negative, got {}", name, sd)));
            }
        }

        if !(self.nb_size.is_finite() && self.nb_size > 0.) {
            return Err(invalid(format!(
                "NB size must be positive, got {}",
                self.nb_size
            )));
        }

        Ok(())
    }

    pub fn cells_per_pseudobulk(&self) -> usize {
        self.cells_per_sample / self.n_pseudobulks
    }
}

/// One draw per gene from `N(mean, sd)`: the gene-to-gene variability
/// shared by all samples
pub fn draw_baseline_means<R: Rng + ?Sized>(
    n_genes: usize,
    mean: f32,
    sd: f32,
    rng: &mut R,
) -> anyhow::Result<Vec<f32>> {
    let rnorm = Normal::new(mean, sd)?;
    Ok((0..n_genes).map(|_| rnorm.sample(rng)).collect())
}

/// `baseline + baseline * eps` with `eps ~ N(0, noise_sd)` per gene
pub fn perturb_means<R: Rng + ?Sized>(
    baseline: &[f32],
    noise_sd: f32,
    rng: &mut R,
) -> anyhow::Result<Vec<f32>> {
    let rnorm = Normal::new(0_f32, noise_sd)?;
    Ok(baseline
        .iter()
        .map(|&mu| mu + mu * rnorm.sample(rng))
        .collect())
}

/// Positions (in gene-pool order) of the genes carrying the injected
/// difference. Unique, fixed for the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalGenes {
    indices: Vec<usize>,
}

impl SignalGenes {
    /// Pick `n_diff_genes` of `n_genes` positions without replacement
    pub fn choose<R: Rng + ?Sized>(
        n_genes: usize,
        n_diff_genes: usize,
        rng: &mut R,
    ) -> anyhow::Result<Self> {
        if n_diff_genes > n_genes {
            return Err(ConfigError::NotEnoughGenes {
                requested: n_diff_genes,
                available: n_genes,
            }
            .into());
        }
        let indices = rand::seq::index::sample(rng, n_genes, n_diff_genes).into_vec();
        Ok(Self { indices })
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Overwrite the signal genes' means with fresh `N(mean, sd)` draws
    pub fn inject<R: Rng + ?Sized>(
        &self,
        means: &mut [f32],
        mean: f32,
        sd: f32,
        rng: &mut R,
    ) -> anyhow::Result<()> {
        let rnorm = Normal::new(mean, sd)?;
        for &g in self.indices.iter() {
            let n = means.len();
            let mu = means
                .get_mut(g)
                .ok_or_else(|| anyhow::anyhow!("signal gene {} outside of {} means", g, n))?;
            *mu = rnorm.sample(rng);
        }
        Ok(())
    }
}

/// Per-sample mean expression vectors of one run
#[derive(Debug, Clone)]
pub struct ExperimentDesign {
    pub samples: Vec<SampleSpec>,
    pub baseline: Vec<f32>,
    pub sample_means: Vec<Vec<f32>>,
    pub signal_genes: SignalGenes,
    pub signal_sample: usize,
}

/// Derive each sample's mean vector.
///
/// Draws, in order: baseline means, noise for every sample (in
/// `samples` order), the signal gene positions, and their elevated means.
/// Only `params.signal_sample` receives the elevated means; the other
/// samples differ from the baseline by noise alone.
pub fn design_experiment<R: Rng + ?Sized>(
    params: &SimParams,
    samples: &[SampleSpec],
    rng: &mut R,
) -> anyhow::Result<ExperimentDesign> {
    params.validate(samples.len())?;
    draw_design(params, samples, rng)
}

/// [`design_experiment`] for parameters already validated against
/// `samples`
pub(crate) fn draw_design<R: Rng + ?Sized>(
    params: &SimParams,
    samples: &[SampleSpec],
    rng: &mut R,
) -> anyhow::Result<ExperimentDesign> {
    let baseline = draw_baseline_means(
        params.n_genes,
        params.baseline_mean,
        params.baseline_sd,
        rng,
    )?;

    let mut sample_means = samples
        .iter()
        .map(|_| perturb_means(&baseline, params.noise_sd, rng))
        .collect::<anyhow::Result<Vec<_>>>()?;

    let signal_genes = SignalGenes::choose(params.n_genes, params.n_diff_genes, rng)?;

    signal_genes.inject(
        &mut sample_means[params.signal_sample],
        params.signal_mean,
        params.signal_sd,
        rng,
    )?;

    info!(
        "designed {} samples; {} signal genes injected into {}",
        samples.len(),
        signal_genes.len(),
        samples[params.signal_sample].id
    );

    Ok(ExperimentDesign {
        samples: samples.to_vec(),
        baseline,
        sample_means,
        signal_genes,
        signal_sample: params.signal_sample,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_params() -> SimParams {
        SimParams {
            n_genes: 50,
            cells_per_sample: 20,
            n_diff_genes: 10,
            n_pseudobulks: 4,
            ..Default::default()
        }
    }

    #[test]
    fn signal_genes_are_unique() -> anyhow::Result<()> {
        let mut rng = seeded_rng(11);
        let signal = SignalGenes::choose(100, 30, &mut rng)?;
        let mut idx = signal.indices().to_vec();
        idx.sort();
        idx.dedup();
        assert_eq!(idx.len(), 30);
        assert!(idx.iter().all(|&g| g < 100));
        Ok(())
    }

    #[test]
    fn only_signal_sample_is_overridden() -> anyhow::Result<()> {
        let params = SimParams {
            noise_sd: 0.,
            signal_mean: 100.,
            signal_sd: 0.,
            ..small_params()
        };
        let mut rng = seeded_rng(5);
        let design = design_experiment(&params, &reference_samples(), &mut rng)?;

        for (s, means) in design.sample_means.iter().enumerate() {
            for (g, &mu) in means.iter().enumerate() {
                if s == DEFAULT_SIGNAL_SAMPLE && design.signal_genes.indices().contains(&g) {
                    assert_eq!(mu, 100.);
                } else {
                    assert_eq!(mu, design.baseline[g]);
                }
            }
        }
        Ok(())
    }

    #[test]
    fn noise_is_multiplicative() -> anyhow::Result<()> {
        let mut rng = seeded_rng(9);
        let baseline = vec![0., 1., 10., -3.];
        let adjusted = perturb_means(&baseline, 0.1, &mut rng)?;
        assert_eq!(adjusted[0], 0.);
        for (&b, &a) in baseline.iter().zip(adjusted.iter()).skip(1) {
            // |eps| < 6 sd with overwhelming probability
            assert!((a - b).abs() <= 0.6 * b.abs());
        }
        Ok(())
    }

    #[test]
    fn invalid_designs() {
        let samples = reference_samples();

        let p = SimParams {
            cells_per_sample: 21,
            ..small_params()
        };
        assert_eq!(
            p.validate(samples.len())
                .unwrap_err()
                .downcast_ref::<ConfigError>(),
            Some(&ConfigError::IndivisiblePseudobulks {
                cells: 21,
                pseudobulks: 4
            })
        );

        let p = SimParams {
            n_diff_genes: 51,
            ..small_params()
        };
        assert!(matches!(
            p.validate(samples.len())
                .unwrap_err()
                .downcast_ref::<ConfigError>(),
            Some(ConfigError::NotEnoughGenes { .. })
        ));

        let p = SimParams {
            signal_sample: 4,
            ..small_params()
        };
        assert!(p.validate(samples.len()).is_err());

        let p = SimParams {
            noise_sd: -0.1,
            ..small_params()
        };
        assert!(p.validate(samples.len()).is_err());
    }
}
