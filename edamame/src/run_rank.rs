use crate::common::*;
use crate::rank::*;
use crate::truth::GroundTruth;

use clap::Parser;
use matrix_util::common_io::mkdir;

#[derive(Parser, Debug, Clone)]
pub struct RankArgs {
    /// differential expression result tables (comma-separated). Each
    /// needs a header line; `.csv` files are comma delimited, others tab
    #[arg(long, short = 'i', value_delimiter(','), required = true)]
    pub results: Vec<Box<str>>,

    /// labels of the result tables (comma-separated), one per table.
    /// Defaults to the file names
    #[arg(long, short = 'l', value_delimiter(','))]
    pub labels: Option<Vec<Box<str>>>,

    /// ground truth file written by `simulate` (`gene  is_diff`)
    #[arg(long, short = 't', required = true)]
    pub truth: Box<str>,

    /// gene column name
    #[arg(long, default_value = "gene")]
    pub gene_column: Box<str>,

    /// significance column name (smaller is more significant)
    #[arg(long, default_value = "pvalue")]
    pub score_column: Box<str>,

    /// effect size column name; `none` to skip
    #[arg(long, default_value = "log2FoldChange")]
    pub effect_column: Box<str>,

    /// recall cutoff; defaults to the number of true genes
    #[arg(long, short = 'k')]
    pub top_k: Option<usize>,

    /// output header
    #[arg(long, short, required = true)]
    pub out: Box<str>,

    /// verbosity
    #[arg(long, short)]
    pub verbose: bool,
}

fn default_label(file_path: &str) -> Box<str> {
    let base = std::path::Path::new(file_path)
        .file_name()
        .and_then(|x| x.to_str())
        .unwrap_or(file_path);
    let base = base.strip_suffix(".gz").unwrap_or(base);
    let base = base
        .rsplit_once('.')
        .map(|(stem, _)| stem)
        .unwrap_or(base);
    Box::from(base)
}

/// Rank the true genes in every result table and summarize
pub fn run_rank(args: &RankArgs) -> anyhow::Result<()> {
    let labels: Vec<Box<str>> = match &args.labels {
        Some(labels) => {
            if labels.len() != args.results.len() {
                return Err(ConfigError::InvalidParameter(format!(
                    "{} labels for {} result files",
                    labels.len(),
                    args.results.len()
                ))
                .into());
            }
            labels.clone()
        }
        None => args.results.iter().map(|f| default_label(f)).collect(),
    };

    let columns = ResultColumns {
        gene: args.gene_column.clone(),
        score: args.score_column.clone(),
        effect: if args.effect_column.eq_ignore_ascii_case("none") {
            None
        } else {
            Some(args.effect_column.clone())
        },
    };

    let truth = GroundTruth::from_tsv(&args.truth)?;

    let tables = args
        .results
        .iter()
        .zip(labels.iter())
        .map(|(file, label)| -> anyhow::Result<Vec<RankRow>> {
            let rows = read_de_results(file, &columns)?;
            let ranks = rank_true_genes(&rows, &truth, label);
            info!("[{}] ranked {} true genes", label, ranks.len());
            Ok(ranks)
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    let table = union_rank_tables(tables);
    let summary = summarize_ranks(&table, &labels, truth.n_true(), args.top_k);

    for s in summary.iter() {
        info!(
            "[{}] found {}/{}, median rank {}, recall@{} {:.3}",
            s.label, s.n_found, s.n_true, s.median_rank, s.top_k, s.recall_at_k
        );
    }

    let rank_file = format!("{}.ranks.tsv", args.out);
    let summary_file = format!("{}.summary.tsv", args.out);
    mkdir(&rank_file)?;

    write_rank_table(&table, &rank_file)?;
    write_rank_summary(&summary, &summary_file)?;

    info!("wrote:\n{}\n{}", rank_file, summary_file);
    Ok(())
}
