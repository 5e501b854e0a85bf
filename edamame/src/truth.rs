use crate::common::*;
use crate::design::SignalGenes;

use fnv::FnvHashMap as HashMap;
use matrix_util::common_io::{read_lines_of_words_delim, write_lines};

/// Which genes carry the injected difference. Keyed by gene symbol,
/// kept in gene-pool order.
#[derive(Debug, Clone, PartialEq)]
pub struct GroundTruth {
    genes: Vec<Box<str>>,
    is_diff: Vec<bool>,
    position: HashMap<Box<str>, usize>,
}

impl GroundTruth {
    pub fn new(genes: &[Box<str>], signal: &SignalGenes) -> anyhow::Result<Self> {
        let mut is_diff = vec![false; genes.len()];
        for &g in signal.indices() {
            let flag = is_diff
                .get_mut(g)
                .ok_or_else(|| anyhow::anyhow!("signal gene {} beyond {} genes", g, genes.len()))?;
            *flag = true;
        }
        Self::from_flags(genes.to_vec(), is_diff, "the gene pool")
    }

    /// Build from `(gene, is_diff)` pairs in pool order
    pub fn from_pairs(pairs: impl IntoIterator<Item = (Box<str>, bool)>) -> anyhow::Result<Self> {
        let (genes, is_diff): (Vec<_>, Vec<_>) = pairs.into_iter().unzip();
        Self::from_flags(genes, is_diff, "the ground truth")
    }

    /// `source` names where the genes came from in errors
    fn from_flags(genes: Vec<Box<str>>, is_diff: Vec<bool>, source: &str) -> anyhow::Result<Self> {
        let mut position = HashMap::default();
        for (i, g) in genes.iter().enumerate() {
            if position.insert(g.clone(), i).is_some() {
                return Err(ConfigError::DuplicateGene {
                    gene: g.to_string(),
                    file: source.to_string(),
                }
                .into());
            }
        }
        Ok(Self {
            genes,
            is_diff,
            position,
        })
    }

    /// `false` for genes outside the pool
    pub fn is_diff(&self, gene: &str) -> bool {
        self.position
            .get(gene)
            .map(|&i| self.is_diff[i])
            .unwrap_or(false)
    }

    pub fn contains(&self, gene: &str) -> bool {
        self.position.contains_key(gene)
    }

    pub fn genes(&self) -> &[Box<str>] {
        &self.genes
    }

    pub fn true_genes(&self) -> Vec<Box<str>> {
        self.genes
            .iter()
            .zip(self.is_diff.iter())
            .filter(|(_, &d)| d)
            .map(|(g, _)| g.clone())
            .collect()
    }

    pub fn n_true(&self) -> usize {
        self.is_diff.iter().filter(|&&d| d).count()
    }

    pub fn len(&self) -> usize {
        self.genes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.genes.is_empty()
    }

    /// `gene  is_diff` with 0/1 flags
    pub fn to_tsv(&self, file_path: &str) -> anyhow::Result<()> {
        let mut lines: Vec<Box<str>> = Vec::with_capacity(self.genes.len() + 1);
        lines.push("gene\tis_diff".into());
        lines.extend(
            self.genes
                .iter()
                .zip(self.is_diff.iter())
                .map(|(g, &d)| format!("{}\t{}", g, d as u8).into_boxed_str()),
        );
        write_lines(&lines, file_path)
    }

    /// Read back what [`GroundTruth::to_tsv`] writes; `1`/`true` mark
    /// signal genes
    pub fn from_tsv(file_path: &str) -> anyhow::Result<Self> {
        let out = read_lines_of_words_delim(file_path, "\t", 0)?;

        let mut genes = Vec::with_capacity(out.lines.len());
        let mut is_diff = Vec::with_capacity(out.lines.len());

        for words in out.lines {
            if words.len() < 2 {
                anyhow::bail!("expected `gene<TAB>is_diff` lines in {}", file_path);
            }
            let flag = match words[1].trim().to_ascii_lowercase().as_str() {
                "1" | "true" => true,
                "0" | "false" => false,
                other => anyhow::bail!("invalid is_diff value `{}` in {}", other, file_path),
            };
            genes.push(words[0].clone());
            is_diff.push(flag);
        }

        let truth = Self::from_flags(genes, is_diff, file_path)?;
        info!(
            "read {} genes ({} true) from {}",
            truth.len(),
            truth.n_true(),
            file_path
        );
        Ok(truth)
    }
}
