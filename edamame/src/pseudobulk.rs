use crate::assemble::{check_alignment, Metadata};
use crate::common::*;
use crate::design::{Pathology, Sex};
use crate::sample_matrix::CountMatrix;

use matrix_util::common_io::write_lines;
use matrix_util::dmatrix_io::NamedMatIo;
use matrix_util::membership::{partition_by_membership, unique_in_order};
use nalgebra::{DMatrix, DVector};
use rayon::prelude::*;

/// One aggregated column
#[derive(Debug, Clone, PartialEq)]
pub struct PseudobulkColumn {
    pub sample: Box<str>,
    pub sex: Sex,
    pub pathology: Pathology,
    pub pseudobulk: usize,
    pub n_cells: usize,
}

impl PseudobulkColumn {
    pub fn name(&self) -> Box<str> {
        format!("{}_pb{}", self.sample, self.pseudobulk).into_boxed_str()
    }
}

/// Gene by (sample, pseudobulk) summed counts
#[derive(Debug, Clone)]
pub struct PseudobulkMatrix {
    pub genes: Vec<Box<str>>,
    pub columns: Vec<PseudobulkColumn>,
    pub counts: DMatrix<u64>,
}

impl PseudobulkMatrix {
    pub fn column_names(&self) -> Vec<Box<str>> {
        self.columns.iter().map(|c| c.name()).collect()
    }

    pub fn to_tsv(&self, file_path: &str) -> anyhow::Result<()> {
        self.counts
            .to_named_tsv(&self.genes, &self.column_names(), "gene", file_path)
    }

    pub fn metadata_to_tsv(&self, file_path: &str) -> anyhow::Result<()> {
        let mut lines: Vec<Box<str>> = vec!["pseudobulk\tsample\tsex\tpathology\tn_cells".into()];
        lines.extend(self.columns.iter().map(|c| {
            format!(
                "{}\t{}\t{}\t{}\t{}",
                c.name(),
                c.sample,
                c.sex,
                c.pathology,
                c.n_cells
            )
            .into_boxed_str()
        }));
        write_lines(&lines, file_path)
    }
}

/// Sum cell counts within each (sample, pseudobulk) group. Columns come
/// in sample order (as first seen in the metadata), then by pseudobulk
/// label.
pub fn aggregate_pseudobulk(
    counts: &CountMatrix,
    metadata: &Metadata,
) -> anyhow::Result<PseudobulkMatrix> {
    check_alignment(counts, metadata)?;

    let samples: Vec<Box<str>> = unique_in_order(
        &metadata
            .rows
            .iter()
            .map(|m| m.sample.clone())
            .collect::<Vec<_>>(),
    );

    let keys: Vec<(Box<str>, usize)> = metadata
        .rows
        .iter()
        .map(|m| (m.sample.clone(), m.pseudobulk))
        .collect();

    let mut groups: Vec<((Box<str>, usize), Vec<usize>)> =
        partition_by_membership(&keys).into_iter().collect();

    groups.sort_by_key(|((s, k), _)| {
        let s_order = samples.iter().position(|x| x == s).unwrap_or(samples.len());
        (s_order, *k)
    });

    let sums: Vec<DVector<u64>> = groups
        .par_iter()
        .map(|(_, cells)| {
            let mut tot = DVector::<u64>::zeros(counts.num_genes());
            for &j in cells {
                for (t, &y) in tot.iter_mut().zip(counts.counts.column(j).iter()) {
                    *t += y as u64;
                }
            }
            tot
        })
        .collect();

    let columns = groups
        .iter()
        .map(|((sample, k), cells)| {
            let first = &metadata.rows[cells[0]];
            PseudobulkColumn {
                sample: sample.clone(),
                sex: first.sex,
                pathology: first.pathology,
                pseudobulk: *k,
                n_cells: cells.len(),
            }
        })
        .collect::<Vec<_>>();

    let agg = if sums.is_empty() {
        DMatrix::<u64>::zeros(counts.num_genes(), 0)
    } else {
        DMatrix::<u64>::from_columns(&sums)
    };

    info!(
        "aggregated {} cells into {} pseudobulk columns",
        counts.num_cells(),
        columns.len()
    );

    Ok(PseudobulkMatrix {
        genes: counts.genes.clone(),
        columns,
        counts: agg,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assemble::assemble;
    use crate::design::reference_samples;
    use crate::sample_matrix::CellId;

    #[test]
    fn sums_match_cell_totals() -> anyhow::Result<()> {
        let samples = reference_samples();
        let matrices: Vec<CountMatrix> = samples
            .iter()
            .enumerate()
            .map(|(s, spec)| CountMatrix {
                genes: vec!["a".into(), "b".into()],
                cells: (1..=6).map(|j| CellId::new(&spec.tag(), j)).collect(),
                counts: CountMat::from_fn(2, 6, |g, j| (s * 100 + g * 10 + j) as u32),
            })
            .collect();

        let mut rng = seeded_rng(4);
        let out = assemble(&samples, &matrices, 2, &mut rng)?;
        let pb = aggregate_pseudobulk(&out.counts, &out.metadata)?;

        assert_eq!(pb.counts.nrows(), 2);
        assert_eq!(pb.counts.ncols(), 8);
        let names: Vec<String> = pb.column_names().iter().map(|x| x.to_string()).collect();
        assert_eq!(names[0], "sample1_pb1");
        assert_eq!(names[1], "sample1_pb2");
        assert_eq!(names[7], "sample4_pb2");
        assert!(pb.columns.iter().all(|c| c.n_cells == 3));

        // both pseudobulks of a sample add up to the sample total
        for (s, m) in matrices.iter().enumerate() {
            for g in 0..2 {
                let tot: u64 = m.counts.row(g).iter().map(|&y| y as u64).sum();
                assert_eq!(pb.counts[(g, 2 * s)] + pb.counts[(g, 2 * s + 1)], tot);
            }
        }
        Ok(())
    }
}
