use crate::common::*;
use crate::design::{Pathology, SampleSpec, Sex};
use crate::sample_matrix::{CellId, CountMatrix};

use matrix_util::common_io::write_lines;
use rand::seq::SliceRandom;
use rand::Rng;

/// Annotation of one cell
#[derive(Debug, Clone, PartialEq)]
pub struct CellMeta {
    pub cell: CellId,
    pub sample: Box<str>,
    pub sex: Sex,
    pub pathology: Pathology,
    /// 1-based pseudobulk group within the sample
    pub pseudobulk: usize,
}

/// Per-cell annotation table, one row per column of the combined matrix
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Metadata {
    pub rows: Vec<CellMeta>,
}

impl Metadata {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn to_tsv(&self, file_path: &str) -> anyhow::Result<()> {
        let mut lines: Vec<Box<str>> = Vec::with_capacity(self.rows.len() + 1);
        lines.push("cell\tsample\tsex\tpathology\tpseudobulk".into());
        lines.extend(self.rows.iter().map(|m| {
            format!(
                "{}\t{}\t{}\t{}\t{}",
                m.cell, m.sample, m.sex, m.pathology, m.pseudobulk
            )
            .into_boxed_str()
        }));
        write_lines(&lines, file_path)
    }
}

/// Combined matrix and its aligned metadata
#[derive(Debug, Clone)]
pub struct Assembled {
    pub counts: CountMatrix,
    pub metadata: Metadata,
}

/// Concatenate sample matrices column-wise in the given order. Every
/// matrix must carry the same gene rows in the same order.
pub fn concat_sample_matrices(
    samples: &[SampleSpec],
    matrices: &[CountMatrix],
) -> anyhow::Result<CountMatrix> {
    if samples.len() != matrices.len() {
        anyhow::bail!(
            "{} samples but {} sample matrices",
            samples.len(),
            matrices.len()
        );
    }

    let Some(first) = matrices.first() else {
        anyhow::bail!("nothing to concatenate");
    };

    for (s, m) in samples.iter().zip(matrices.iter()) {
        if m.genes != first.genes || m.counts.nrows() != first.genes.len() {
            return Err(ConfigError::RowMismatch {
                sample: s.id.to_string(),
            }
            .into());
        }
    }

    let n_genes = first.genes.len();
    let n_cells: usize = matrices.iter().map(|m| m.num_cells()).sum();

    let mut counts = CountMat::zeros(n_genes, n_cells);
    let mut cells = Vec::with_capacity(n_cells);

    let mut offset = 0;
    for m in matrices {
        let nc = m.num_cells();
        counts.columns_mut(offset, nc).copy_from(&m.counts);
        cells.extend(m.cells.iter().cloned());
        offset += nc;
    }

    Ok(CountMatrix {
        genes: first.genes.clone(),
        cells,
        counts,
    })
}

/// Split `n_cells` into `n_pseudobulks` equal groups and shuffle the
/// labels over the cells. Returns a 1-based label per cell.
pub fn assign_pseudobulks<R: Rng + ?Sized>(
    n_cells: usize,
    n_pseudobulks: usize,
    rng: &mut R,
) -> anyhow::Result<Vec<usize>> {
    if n_pseudobulks == 0 || n_cells % n_pseudobulks != 0 {
        return Err(ConfigError::IndivisiblePseudobulks {
            cells: n_cells,
            pseudobulks: n_pseudobulks,
        }
        .into());
    }

    let per_group = n_cells / n_pseudobulks;
    let mut labels: Vec<usize> = (1..=n_pseudobulks)
        .flat_map(|k| std::iter::repeat_n(k, per_group))
        .collect();
    labels.shuffle(rng);
    Ok(labels)
}

/// Build the per-cell metadata of each sample matrix, keyed by the
/// matrix's own cell ids. Pseudobulk labels are drawn sample by sample.
pub fn build_metadata<R: Rng + ?Sized>(
    samples: &[SampleSpec],
    matrices: &[CountMatrix],
    n_pseudobulks: usize,
    rng: &mut R,
) -> anyhow::Result<Metadata> {
    let mut rows = Vec::with_capacity(matrices.iter().map(|m| m.num_cells()).sum());

    for (s, m) in samples.iter().zip(matrices.iter()) {
        let pb = assign_pseudobulks(m.num_cells(), n_pseudobulks, rng)?;
        rows.extend(m.cells.iter().zip(pb).map(|(cell, k)| CellMeta {
            cell: cell.clone(),
            sample: s.id.clone(),
            sex: s.sex,
            pathology: s.pathology,
            pseudobulk: k,
        }));
    }

    Ok(Metadata { rows })
}

/// Metadata row `i` must be keyed by the id of matrix column `i`
pub fn check_alignment(counts: &CountMatrix, metadata: &Metadata) -> anyhow::Result<()> {
    if counts.num_cells() != metadata.len() || counts.cells.len() != metadata.len() {
        anyhow::bail!(
            "{} matrix columns but {} metadata rows",
            counts.num_cells(),
            metadata.len()
        );
    }

    for (i, (cell, meta)) in counts.cells.iter().zip(metadata.rows.iter()).enumerate() {
        if *cell != meta.cell {
            return Err(ConfigError::CellAlignment {
                index: i,
                meta: meta.cell.to_string(),
                column: cell.to_string(),
            }
            .into());
        }
    }
    Ok(())
}

/// Concatenate the samples and annotate every cell
pub fn assemble<R: Rng + ?Sized>(
    samples: &[SampleSpec],
    matrices: &[CountMatrix],
    n_pseudobulks: usize,
    rng: &mut R,
) -> anyhow::Result<Assembled> {
    let counts = concat_sample_matrices(samples, matrices)?;
    let metadata = build_metadata(samples, matrices, n_pseudobulks, rng)?;
    check_alignment(&counts, &metadata)?;

    info!(
        "assembled {} genes x {} cells from {} samples",
        counts.num_genes(),
        counts.num_cells(),
        samples.len()
    );

    Ok(Assembled { counts, metadata })
}
