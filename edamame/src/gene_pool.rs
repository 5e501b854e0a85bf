use crate::common::*;

use fnv::FnvHashSet as HashSet;
use matrix_util::common_io::read_lines;
use rand::Rng;

/// Read a newline-delimited list of gene symbols (plain or `.gz`).
/// Blank lines are skipped and repeated symbols are dropped, keeping the
/// first occurrence.
pub fn read_gene_universe(gene_file: &str) -> anyhow::Result<Vec<Box<str>>> {
    let lines = read_lines(gene_file)?;
    let nlines = lines.len();
    let universe = unique_symbols(lines);

    info!(
        "read {} unique gene symbols from {} lines of {}",
        universe.len(),
        nlines,
        gene_file
    );

    if universe.len() < nlines {
        warn!("dropped blank or repeated gene symbols in {}", gene_file);
    }

    Ok(universe)
}

fn unique_symbols(lines: Vec<Box<str>>) -> Vec<Box<str>> {
    let mut seen: HashSet<Box<str>> = HashSet::default();
    lines
        .into_iter()
        .map(|x| Box::from(x.trim()))
        .filter(|x: &Box<str>| !x.is_empty() && seen.insert(x.clone()))
        .collect()
}

/// `gene1, gene2, ...` for runs without a symbol list
pub fn synthetic_gene_universe(n_genes: usize) -> Vec<Box<str>> {
    (1..=n_genes)
        .map(|g| format!("gene{}", g).into_boxed_str())
        .collect()
}

/// The ordered, unique gene set of one run. Row order of every count
/// matrix follows this order.
#[derive(Debug, Clone, PartialEq)]
pub struct GenePool {
    genes: Vec<Box<str>>,
}

impl GenePool {
    /// Draw `n_genes` symbols from `universe` without replacement,
    /// keeping the draw order.
    pub fn sample<R: Rng + ?Sized>(
        universe: &[Box<str>],
        n_genes: usize,
        rng: &mut R,
    ) -> anyhow::Result<Self> {
        if n_genes > universe.len() {
            return Err(ConfigError::NotEnoughGenes {
                requested: n_genes,
                available: universe.len(),
            }
            .into());
        }

        let genes = rand::seq::index::sample(rng, universe.len(), n_genes)
            .into_iter()
            .map(|i| universe[i].clone())
            .collect();

        Ok(Self { genes })
    }

    pub fn genes(&self) -> &[Box<str>] {
        &self.genes
    }

    pub fn len(&self) -> usize {
        self.genes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.genes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sampled_pool_is_unique_subset() -> anyhow::Result<()> {
        let universe = synthetic_gene_universe(50);
        let mut rng = seeded_rng(7);
        let pool = GenePool::sample(&universe, 20, &mut rng)?;

        assert_eq!(pool.len(), 20);
        let uniq: HashSet<&str> = pool.genes().iter().map(|g| g.as_ref()).collect();
        assert_eq!(uniq.len(), 20);
        assert!(pool.genes().iter().all(|g| universe.contains(g)));
        Ok(())
    }

    #[test]
    fn oversampling_is_a_config_error() {
        let universe = synthetic_gene_universe(5);
        let mut rng = seeded_rng(7);
        let err = GenePool::sample(&universe, 6, &mut rng).unwrap_err();
        assert_eq!(
            err.downcast_ref::<ConfigError>(),
            Some(&ConfigError::NotEnoughGenes {
                requested: 6,
                available: 5
            })
        );
    }

    #[test]
    fn blank_and_repeated_symbols_are_dropped() {
        let lines: Vec<Box<str>> = vec!["A".into(), " B ".into(), "".into(), "A".into(), "C".into()];
        let uniq = unique_symbols(lines);
        assert_eq!(uniq, vec![Box::from("A"), Box::from("B"), Box::from("C")]);
    }
}
