use crate::common::*;
use crate::truth::GroundTruth;

use fnv::FnvHashSet as HashSet;
use matrix_util::common_io::{delimiter_for_file, read_lines_of_words_delim, write_lines};
use matrix_util::membership::{partition_by_membership, unique_in_order};
use std::cmp::Ordering;

/// One gene of a differential expression result table
#[derive(Debug, Clone, PartialEq)]
pub struct DeResultRow {
    pub gene: Box<str>,
    /// p-value or adjusted p-value; smaller is more significant
    pub score: f64,
    /// log fold change or another magnitude
    pub effect: f64,
}

/// A result row with its ground-truth flag
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotatedRow {
    pub row: DeResultRow,
    pub is_diff: bool,
}

/// Rank of one true signal gene in one method's gene ordering
#[derive(Debug, Clone, PartialEq)]
pub struct RankRow {
    pub label: Box<str>,
    pub gene: Box<str>,
    /// 1 = most significant
    pub rank: usize,
    pub score: f64,
    pub effect: f64,
}

/// Recovery of the true genes by one method
#[derive(Debug, Clone, PartialEq)]
pub struct RankSummary {
    pub label: Box<str>,
    pub n_true: usize,
    pub n_found: usize,
    pub median_rank: f64,
    pub mean_rank: f64,
    pub top_k: usize,
    pub recall_at_k: f64,
}

/// Ascending, NaN after every number
fn cmp_score(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
    }
}

/// Row indexes sorted by ascending score. The sort is stable, so ties
/// keep their input order.
pub fn score_order(rows: &[DeResultRow]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..rows.len()).collect();
    order.sort_by(|&a, &b| cmp_score(rows[a].score, rows[b].score));
    order
}

/// Rank every gene by ascending score (ties by first appearance) and
/// keep only the true signal genes, most significant first.
///
/// Truth genes missing from `rows` are reported and left out.
pub fn rank_true_genes(rows: &[DeResultRow], truth: &GroundTruth, label: &str) -> Vec<RankRow> {
    let ranked: Vec<RankRow> = score_order(rows)
        .into_iter()
        .enumerate()
        .filter(|&(_, i)| truth.is_diff(&rows[i].gene))
        .map(|(r, i)| RankRow {
            label: Box::from(label),
            gene: rows[i].gene.clone(),
            rank: r + 1,
            score: rows[i].score,
            effect: rows[i].effect,
        })
        .collect();

    let n_true = truth.n_true();
    if ranked.len() < n_true {
        let found: HashSet<&str> = ranked.iter().map(|r| r.gene.as_ref()).collect();
        let missing: Vec<Box<str>> = truth
            .true_genes()
            .into_iter()
            .filter(|g| !found.contains(g.as_ref()))
            .collect();
        warn!(
            "[{}] {} of {} true genes are not in the result table, e.g., {}",
            label,
            missing.len(),
            n_true,
            missing.first().map(|g| g.as_ref()).unwrap_or("")
        );
    }

    ranked
}

/// Attach the `is_diff` flag to every row
pub fn annotate_results(rows: &[DeResultRow], truth: &GroundTruth) -> Vec<AnnotatedRow> {
    rows.iter()
        .map(|row| AnnotatedRow {
            is_diff: truth.is_diff(&row.gene),
            row: row.clone(),
        })
        .collect()
}

/// Stack rank tables of several methods
pub fn union_rank_tables(tables: Vec<Vec<RankRow>>) -> Vec<RankRow> {
    tables.into_iter().flatten().collect()
}

fn median(sorted: &[usize]) -> f64 {
    let n = sorted.len();
    match n {
        0 => f64::NAN,
        _ if n % 2 == 1 => sorted[n / 2] as f64,
        _ => (sorted[n / 2 - 1] + sorted[n / 2]) as f64 / 2.,
    }
}

/// Per-label recovery statistics of a (possibly unioned) rank table,
/// one summary per entry of `labels` in that order. A label without
/// rows in `table` found none of the true genes.
///
/// * `labels` - every method label, including ones with empty tables
/// * `n_true` - number of true genes in the ground truth
/// * `top_k` - cutoff for recall; `None` uses `n_true`
pub fn summarize_ranks(
    table: &[RankRow],
    labels: &[Box<str>],
    n_true: usize,
    top_k: Option<usize>,
) -> Vec<RankSummary> {
    let top_k = top_k.unwrap_or(n_true);
    let row_labels: Vec<Box<str>> = table.iter().map(|r| r.label.clone()).collect();
    let groups = partition_by_membership(&row_labels);

    unique_in_order(labels)
        .into_iter()
        .map(|label| {
            let mut ranks: Vec<usize> = groups
                .get(&label)
                .map(|idx| idx.iter().map(|&i| table[i].rank).collect())
                .unwrap_or_default();
            ranks.sort_unstable();

            let n_found = ranks.len();
            let mean_rank = if n_found > 0 {
                ranks.iter().sum::<usize>() as f64 / n_found as f64
            } else {
                f64::NAN
            };
            let hits = ranks.iter().filter(|&&r| r <= top_k).count();
            let recall_at_k = if n_true > 0 {
                hits as f64 / n_true as f64
            } else {
                f64::NAN
            };

            RankSummary {
                median_rank: median(&ranks),
                label,
                n_true,
                n_found,
                mean_rank,
                top_k,
                recall_at_k,
            }
        })
        .collect()
}

/// Column names to pick out of a result table
#[derive(Debug, Clone)]
pub struct ResultColumns {
    pub gene: Box<str>,
    pub score: Box<str>,
    pub effect: Option<Box<str>>,
}

impl Default for ResultColumns {
    fn default() -> Self {
        Self {
            gene: "gene".into(),
            score: "pvalue".into(),
            effect: Some("log2FoldChange".into()),
        }
    }
}

fn unquote(s: &str) -> &str {
    let s = s.trim();
    s.strip_prefix('"')
        .and_then(|x| x.strip_suffix('"'))
        .unwrap_or(s)
}

fn parse_score(s: &str) -> Option<f64> {
    match unquote(s) {
        "" | "NA" | "NaN" | "nan" => None,
        x => x.parse::<f64>().ok(),
    }
}

/// Read a result table with a header line, in any row order. Tab
/// delimited, or comma delimited for `.csv` files. A header one field
/// short of the data lines (row names written without a header field)
/// shifts the header right by one. The row names become the gene column
/// unless the header already names one. Missing or unparsable scores
/// become NaN.
pub fn read_de_results(file_path: &str, columns: &ResultColumns) -> anyhow::Result<Vec<DeResultRow>> {
    let out = read_lines_of_words_delim(file_path, delimiter_for_file(file_path), 0)?;

    let mut header: Vec<Box<str>> = out.header.iter().map(|h| Box::from(unquote(h))).collect();

    let has_row_names = out
        .lines
        .first()
        .map(|x| x.len() == header.len() + 1)
        .unwrap_or(false);

    if has_row_names {
        let row_name_col: Box<str> = if header.contains(&columns.gene) {
            "".into()
        } else {
            columns.gene.clone()
        };
        header.insert(0, row_name_col);
    }

    let find = |name: &str| -> anyhow::Result<usize> {
        header
            .iter()
            .position(|h| h.as_ref() == name)
            .ok_or_else(|| {
                ConfigError::MissingColumn {
                    column: name.to_string(),
                    file: file_path.to_string(),
                }
                .into()
            })
    };

    let gene_col = find(&columns.gene[..])?;
    let score_col = find(&columns.score[..])?;
    let effect_col = match &columns.effect {
        Some(x) => Some(find(&x[..])?),
        None => None,
    };

    let mut seen: HashSet<Box<str>> = HashSet::default();
    let mut rows = Vec::with_capacity(out.lines.len());
    let mut n_missing = 0;

    for (i, words) in out.lines.iter().enumerate() {
        let get = |c: usize| -> anyhow::Result<&str> {
            words
                .get(c)
                .map(|x| x.as_ref())
                .ok_or_else(|| anyhow::anyhow!("line {} of {} is too short", i + 2, file_path))
        };

        let gene: Box<str> = Box::from(unquote(get(gene_col)?));
        if !seen.insert(gene.clone()) {
            return Err(ConfigError::DuplicateGene {
                gene: gene.to_string(),
                file: file_path.to_string(),
            }
            .into());
        }

        let score = parse_score(get(score_col)?).unwrap_or_else(|| {
            n_missing += 1;
            f64::NAN
        });

        let effect = match effect_col {
            Some(c) => parse_score(get(c)?).unwrap_or(f64::NAN),
            None => f64::NAN,
        };

        rows.push(DeResultRow {
            gene,
            score,
            effect,
        });
    }

    info!("read {} result rows from {}", rows.len(), file_path);
    if n_missing > 0 {
        warn!(
            "{} rows of {} have no usable `{}`; they rank last",
            n_missing, file_path, columns.score
        );
    }

    Ok(rows)
}

pub fn write_rank_table(table: &[RankRow], file_path: &str) -> anyhow::Result<()> {
    let mut lines: Vec<Box<str>> = vec!["label\tgene\trank\tscore\teffect".into()];
    lines.extend(table.iter().map(|r| {
        format!(
            "{}\t{}\t{}\t{}\t{}",
            r.label, r.gene, r.rank, r.score, r.effect
        )
        .into_boxed_str()
    }));
    write_lines(&lines, file_path)
}

pub fn write_rank_summary(summary: &[RankSummary], file_path: &str) -> anyhow::Result<()> {
    let mut lines: Vec<Box<str>> =
        vec!["label\tn_true\tn_found\tmedian_rank\tmean_rank\ttop_k\trecall_at_k".into()];
    lines.extend(summary.iter().map(|s| {
        format!(
            "{}\t{}\t{}\t{}\t{}\t{}\t{}",
            s.label, s.n_true, s.n_found, s.median_rank, s.mean_rank, s.top_k, s.recall_at_k
        )
        .into_boxed_str()
    }));
    write_lines(&lines, file_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toy_rows(scores: &[f64]) -> Vec<DeResultRow> {
        scores
            .iter()
            .enumerate()
            .map(|(i, &s)| DeResultRow {
                gene: format!("g{}", i + 1).into_boxed_str(),
                score: s,
                effect: i as f64,
            })
            .collect()
    }

    fn toy_truth(n: usize, diff: &[usize]) -> GroundTruth {
        GroundTruth::from_pairs(
            (1..=n).map(|i| (format!("g{}", i).into_boxed_str(), diff.contains(&i))),
        )
        .unwrap()
    }

    #[test]
    fn ties_break_by_input_order() {
        let rows = toy_rows(&[0.5, 0.01, 0.2, 0.01]);
        let truth = toy_truth(4, &[2, 4]);
        let ranks = rank_true_genes(&rows, &truth, "m1");

        assert_eq!(ranks.len(), 2);
        assert_eq!((ranks[0].gene.as_ref(), ranks[0].rank), ("g2", 1));
        assert_eq!((ranks[1].gene.as_ref(), ranks[1].rank), ("g4", 2));
        assert!(ranks.iter().all(|r| r.label.as_ref() == "m1"));
    }

    #[test]
    fn input_is_not_reordered() {
        let rows = toy_rows(&[0.3, 0.2, 0.1]);
        let before = rows.clone();
        let truth = toy_truth(3, &[1]);
        let ranks = rank_true_genes(&rows, &truth, "m");
        assert_eq!(rows, before);
        assert_eq!(ranks[0].rank, 3);
    }

    #[test]
    fn nan_scores_rank_last() {
        let rows = toy_rows(&[f64::NAN, 0.9, 0.1]);
        assert_eq!(score_order(&rows), vec![2, 1, 0]);
    }

    #[test]
    fn missing_truth_genes_are_skipped() {
        let rows = toy_rows(&[0.1, 0.2]);
        let truth = toy_truth(4, &[1, 4]);
        let ranks = rank_true_genes(&rows, &truth, "m");
        assert_eq!(ranks.len(), 1);
        assert_eq!(ranks[0].gene.as_ref(), "g1");
    }

    #[test]
    fn annotation_flags() {
        let rows = toy_rows(&[0.1, 0.2, 0.3]);
        let truth = toy_truth(3, &[3]);
        let flags: Vec<bool> = annotate_results(&rows, &truth)
            .iter()
            .map(|a| a.is_diff)
            .collect();
        assert_eq!(flags, vec![false, false, true]);
    }

    #[test]
    fn summary_per_label() {
        let truth = toy_truth(6, &[1, 2, 3]);
        let a = rank_true_genes(&toy_rows(&[0.1, 0.2, 0.3, 0.4, 0.5, 0.6]), &truth, "a");
        let b = rank_true_genes(&toy_rows(&[0.6, 0.5, 0.4, 0.3, 0.2, 0.1]), &truth, "b");
        let table = union_rank_tables(vec![a, b]);
        assert_eq!(table.len(), 6);

        let labels: Vec<Box<str>> = vec!["a".into(), "b".into()];
        let summary = summarize_ranks(&table, &labels, truth.n_true(), None);
        assert_eq!(summary.len(), 2);

        assert_eq!(summary[0].label.as_ref(), "a");
        assert_eq!(summary[0].median_rank, 2.);
        approx::assert_abs_diff_eq!(summary[0].recall_at_k, 1.0);

        assert_eq!(summary[1].label.as_ref(), "b");
        assert_eq!(summary[1].median_rank, 5.);
        approx::assert_abs_diff_eq!(summary[1].recall_at_k, 0.0);
    }

    #[test]
    fn method_without_true_genes_is_summarized() {
        let truth = toy_truth(4, &[2, 4]);
        let a = rank_true_genes(&toy_rows(&[0.3, 0.1]), &truth, "a");
        let b = rank_true_genes(&toy_rows(&[0.2]), &truth, "b");
        assert!(b.is_empty());

        let labels: Vec<Box<str>> = vec!["a".into(), "b".into()];
        let table = union_rank_tables(vec![a, b]);
        let summary = summarize_ranks(&table, &labels, truth.n_true(), None);

        assert_eq!(summary.len(), 2);
        assert_eq!(summary[1].label.as_ref(), "b");
        assert_eq!(summary[1].n_found, 0);
        assert_eq!(summary[1].recall_at_k, 0.);
        assert!(summary[1].median_rank.is_nan());
        assert_eq!(summary[0].n_found, 1);
        approx::assert_abs_diff_eq!(summary[0].recall_at_k, 0.5);
    }
}
