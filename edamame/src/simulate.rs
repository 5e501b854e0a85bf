use crate::assemble::{assemble, Assembled};
use crate::common::*;
use crate::design::{draw_design, reference_samples, ExperimentDesign, SimParams};
use crate::gene_pool::{read_gene_universe, synthetic_gene_universe, GenePool};
use crate::nb_count::NegBinomSampler;
use crate::pseudobulk::aggregate_pseudobulk;
use crate::sample_matrix::{build_sample_matrix, CountMatrix};
use crate::truth::GroundTruth;

use clap::Parser;
use matrix_util::common_io::{mkdir, open_buf_writer};
use rand::Rng;
use std::io::Write;

#[derive(Parser, Debug, Clone)]
pub struct SimArgs {
    /// gene symbol list, one per line (plain or `.gz`); genes are drawn
    /// from it without replacement. Without it, `gene1 .. geneN` are used
    #[arg(short = 'g', long)]
    pub gene_file: Option<Box<str>>,

    /// number of genes (rows)
    #[arg(short = 'r', long, default_value_t = 2000)]
    pub n_genes: usize,

    /// number of cells per sample
    #[arg(short = 'c', long, default_value_t = 500)]
    pub cells_per_sample: usize,

    /// number of differential (signal) genes
    #[arg(short = 'a', long, default_value_t = 100)]
    pub n_diff_genes: usize,

    /// mean of the baseline expression distribution
    #[arg(long, default_value_t = 2.0)]
    pub baseline_mean: f32,

    /// standard deviation of the baseline expression distribution
    #[arg(long, default_value_t = 1.0)]
    pub baseline_sd: f32,

    /// standard deviation of the multiplicative per-sample noise
    #[arg(long, default_value_t = 0.1)]
    pub noise_sd: f32,

    /// mean of the elevated expression of signal genes
    #[arg(long, default_value_t = 5.0)]
    pub signal_mean: f32,

    /// standard deviation of the elevated expression of signal genes
    #[arg(long, default_value_t = 2.0)]
    pub signal_sd: f32,

    /// negative binomial size (shape); smaller is more overdispersed
    #[arg(long, default_value_t = 5.0)]
    pub nb_size: f32,

    /// number of pseudobulk groups per sample
    #[arg(short = 'p', long, default_value_t = 5)]
    pub n_pseudobulks: usize,

    /// 0-based index of the sample carrying the signal
    /// (0: female control, 1: female disease, 2: male control, 3: male disease)
    #[arg(long, default_value_t = 3)]
    pub signal_sample: usize,

    /// random seed
    #[arg(long, default_value_t = 42)]
    pub rseed: u64,

    /// also write the pseudobulk-aggregated matrix
    #[arg(long, default_value_t = false)]
    pub pseudobulk: bool,

    /// output header
    #[arg(long, short, required = true)]
    pub out: Box<str>,

    /// verbosity
    #[arg(long, short)]
    pub verbose: bool,
}

impl SimArgs {
    pub fn to_params(&self) -> SimParams {
        SimParams {
            n_genes: self.n_genes,
            cells_per_sample: self.cells_per_sample,
            n_diff_genes: self.n_diff_genes,
            baseline_mean: self.baseline_mean,
            baseline_sd: self.baseline_sd,
            noise_sd: self.noise_sd,
            signal_mean: self.signal_mean,
            signal_sd: self.signal_sd,
            nb_size: self.nb_size,
            n_pseudobulks: self.n_pseudobulks,
            signal_sample: self.signal_sample,
            seed: self.rseed,
        }
    }
}

#[derive(Debug)]
pub struct SimOut {
    pub genes: GenePool,
    pub design: ExperimentDesign,
    pub data: Assembled,
    pub truth: GroundTruth,
}

/// Simulate the four-sample experiment with a stream seeded from
/// `params.seed`
pub fn simulate_experiment(params: &SimParams, universe: &[Box<str>]) -> anyhow::Result<SimOut> {
    let mut rng = seeded_rng(params.seed);
    simulate_experiment_with_rng(params, universe, &mut rng)
}

/// Simulate the four-sample experiment drawing everything from `rng`:
///
/// 1. gene pool from the universe
/// 2. baseline means, per-sample noise, signal genes and their means
/// 3. NB counts, sample by sample, gene by gene
/// 4. pseudobulk labels, sample by sample
pub fn simulate_experiment_with_rng<R: Rng + ?Sized>(
    params: &SimParams,
    universe: &[Box<str>],
    rng: &mut R,
) -> anyhow::Result<SimOut> {
    let samples = reference_samples();
    params.validate(samples.len())?;

    let genes = GenePool::sample(universe, params.n_genes, rng)?;
    info!("sampled {} genes out of {}", genes.len(), universe.len());

    let design = draw_design(params, &samples, rng)?;

    let sampler = NegBinomSampler::new(params.nb_size)?;

    let mut matrices: Vec<CountMatrix> = Vec::with_capacity(samples.len());
    for (s, means) in design.samples.iter().zip(design.sample_means.iter()) {
        info!("sampling counts of {} ...", s.id);
        matrices.push(build_sample_matrix(
            params.cells_per_sample,
            &s.tag(),
            genes.genes(),
            means,
            &sampler,
            rng,
        )?);
    }

    let data = assemble(&design.samples, &matrices, params.n_pseudobulks, rng)?;
    let truth = GroundTruth::new(genes.genes(), &design.signal_genes)?;

    Ok(SimOut {
        genes,
        design,
        data,
        truth,
    })
}

/// Output file names under one header
pub struct SimOutFiles {
    pub counts: String,
    pub metadata: String,
    pub truth: String,
    pub pseudobulk: String,
    pub pseudobulk_metadata: String,
    pub params: String,
}

impl SimOutFiles {
    pub fn new(out: &str) -> Self {
        Self {
            counts: format!("{}.counts.tsv.gz", out),
            metadata: format!("{}.metadata.tsv.gz", out),
            truth: format!("{}.truth.tsv.gz", out),
            pseudobulk: format!("{}.pseudobulk.tsv.gz", out),
            pseudobulk_metadata: format!("{}.pseudobulk_metadata.tsv.gz", out),
            params: format!("{}.params.json", out),
        }
    }
}

fn write_params(params: &SimParams, file_path: &str) -> anyhow::Result<()> {
    let mut buf = open_buf_writer(file_path)?;
    serde_json::to_writer_pretty(&mut buf, params)?;
    writeln!(buf)?;
    buf.flush()?;
    Ok(())
}

/// Simulate and write everything under `args.out`
pub fn run_simulate(args: &SimArgs) -> anyhow::Result<()> {
    let params = args.to_params();

    let universe = match &args.gene_file {
        Some(gene_file) => read_gene_universe(gene_file)?,
        None => synthetic_gene_universe(params.n_genes),
    };

    info!("Simulating counts...");
    let sim = simulate_experiment(&params, &universe)?;
    info!("Successfully simulated");

    let files = SimOutFiles::new(&args.out);
    mkdir(&files.counts)?;

    sim.data.counts.to_tsv(&files.counts)?;
    sim.data.metadata.to_tsv(&files.metadata)?;
    sim.truth.to_tsv(&files.truth)?;
    write_params(&params, &files.params)?;

    info!(
        "wrote count, metadata, truth, and parameter files:\n{}\n{}\n{}\n{}",
        files.counts, files.metadata, files.truth, files.params
    );

    if args.pseudobulk {
        let pb = aggregate_pseudobulk(&sim.data.counts, &sim.data.metadata)?;
        pb.to_tsv(&files.pseudobulk)?;
        pb.metadata_to_tsv(&files.pseudobulk_metadata)?;
        info!(
            "wrote pseudobulk files:\n{}\n{}",
            files.pseudobulk, files.pseudobulk_metadata
        );
    }

    info!("done");
    Ok(())
}
