use crate::common::*;
use crate::nb_count::NegBinomSampler;

use indicatif::ProgressIterator;
use matrix_util::dmatrix_io::NamedMatIo;
use rand::Rng;

/// Identifier of one cell: a sample tag plus a 1-based index within the
/// sample. The same value labels the matrix column and keys the metadata
/// row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellId {
    pub tag: Box<str>,
    pub index: usize,
}

impl CellId {
    pub fn new(tag: &str, index: usize) -> Self {
        Self {
            tag: Box::from(tag),
            index,
        }
    }

    pub fn name(&self) -> Box<str> {
        self.to_string().into_boxed_str()
    }
}

impl std::fmt::Display for CellId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.tag, self.index)
    }
}

/// Gene-by-cell count matrix with gene row names and cell column ids
#[derive(Debug, Clone, PartialEq)]
pub struct CountMatrix {
    pub genes: Vec<Box<str>>,
    pub cells: Vec<CellId>,
    pub counts: CountMat,
}

impl CountMatrix {
    pub fn num_genes(&self) -> usize {
        self.counts.nrows()
    }

    pub fn num_cells(&self) -> usize {
        self.counts.ncols()
    }

    pub fn cell_names(&self) -> Vec<Box<str>> {
        self.cells.iter().map(|c| c.name()).collect()
    }

    /// Write out as a delimited table with a `gene` corner header
    pub fn to_tsv(&self, file_path: &str) -> anyhow::Result<()> {
        self.counts
            .to_named_tsv(&self.genes, &self.cell_names(), "gene", file_path)
    }
}

/// Simulate one sample's count matrix, one negative binomial row per
/// gene.
///
/// * `n_cells` - number of cells (columns)
/// * `tag` - column label prefix; columns are `{tag}1 .. {tag}n_cells`
/// * `genes` - row names
/// * `mean_expression` - NB mean per gene, aligned with `genes`;
///   negative values are clamped to zero
/// * `sampler` - NB sampler with a fixed size parameter
/// * `rng` - the run's random stream
pub fn build_sample_matrix<R: Rng + ?Sized>(
    n_cells: usize,
    tag: &str,
    genes: &[Box<str>],
    mean_expression: &[f32],
    sampler: &NegBinomSampler,
    rng: &mut R,
) -> anyhow::Result<CountMatrix> {
    if genes.len() != mean_expression.len() {
        return Err(ConfigError::LengthMismatch {
            genes: genes.len(),
            means: mean_expression.len(),
        }
        .into());
    }

    let n_genes = genes.len();
    let mut counts = CountMat::zeros(n_genes, n_cells);

    for (g, &mu) in mean_expression
        .iter()
        .enumerate()
        .progress_count(n_genes as u64)
    {
        let y_g = sampler.sample_counts(mu.max(0.), n_cells, rng)?;
        for (j, y) in y_g.into_iter().enumerate() {
            counts[(g, j)] = y;
        }
    }

    let cells = (1..=n_cells).map(|j| CellId::new(tag, j)).collect();

    Ok(CountMatrix {
        genes: genes.to_vec(),
        cells,
        counts,
    })
}
