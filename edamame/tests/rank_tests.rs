use edamame::error::ConfigError;
use edamame::rank::*;
use edamame::run_rank::{run_rank, RankArgs};
use edamame::truth::GroundTruth;
use matrix_util::common_io::{read_lines, write_lines};

use clap::Parser;

fn write_file(path: &std::path::Path, lines: &[&str]) -> anyhow::Result<String> {
    let lines: Vec<Box<str>> = lines.iter().map(|&x| Box::from(x)).collect();
    let path = path.to_str().unwrap().to_string();
    write_lines(&lines, &path)?;
    Ok(path)
}

fn toy_truth() -> GroundTruth {
    GroundTruth::from_pairs(
        ["g1", "g2", "g3", "g4"]
            .into_iter()
            .map(|g| (Box::from(g), g == "g2" || g == "g4")),
    )
    .unwrap()
}

#[test]
fn rank_from_tsv() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let file = write_file(
        &dir.path().join("method.tsv"),
        &[
            "gene\tbaseMean\tlog2FoldChange\tpvalue\tpadj",
            "g1\t10\t0.1\t0.5\t0.6",
            "g2\t10\t2.0\t0.01\t0.02",
            "g3\t10\t-0.3\t0.2\t0.3",
            "g4\t10\t1.5\t0.01\t0.02",
        ],
    )?;

    let rows = read_de_results(&file, &ResultColumns::default())?;
    assert_eq!(rows.len(), 4);
    assert_eq!(rows[1].effect, 2.0);

    let ranks = rank_true_genes(&rows, &toy_truth(), "deseq2");
    let pairs: Vec<(&str, usize)> = ranks.iter().map(|r| (r.gene.as_ref(), r.rank)).collect();
    assert_eq!(pairs, vec![("g2", 1), ("g4", 2)]);
    Ok(())
}

#[test]
fn rank_from_csv_with_row_names() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let file = write_file(
        &dir.path().join("edger.csv"),
        &[
            "\"logFC\",\"PValue\",\"FDR\"",
            "\"g3\",0.2,0.001,0.004",
            "\"g4\",1.1,NA,NA",
            "\"g1\",0.0,0.9,0.9",
            "\"g2\",3.0,0.0001,0.0004",
        ],
    )?;

    let columns = ResultColumns {
        gene: "gene".into(),
        score: "PValue".into(),
        effect: Some("logFC".into()),
    };
    let rows = read_de_results(&file, &columns)?;
    assert_eq!(rows[0].gene.as_ref(), "g3");
    assert!(rows[1].score.is_nan());

    let ranks = rank_true_genes(&rows, &toy_truth(), "edger");
    let pairs: Vec<(&str, usize)> = ranks.iter().map(|r| (r.gene.as_ref(), r.rank)).collect();
    assert_eq!(pairs, vec![("g2", 1), ("g4", 4)]);
    Ok(())
}

#[test]
fn row_names_next_to_gene_column() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let file = write_file(
        &dir.path().join("deseq2.tsv"),
        &[
            "gene\tlog2FoldChange\tpvalue",
            "1\tg1\t0.1\t0.9",
            "2\tg2\t2.0\t0.01",
            "3\tg3\t-0.2\t0.5",
            "4\tg4\t1.2\t0.02",
        ],
    )?;

    let rows = read_de_results(&file, &ResultColumns::default())?;
    assert_eq!(rows[0].gene.as_ref(), "g1");
    assert_eq!(rows[0].score, 0.9);
    assert_eq!(rows[0].effect, 0.1);

    let ranks = rank_true_genes(&rows, &toy_truth(), "deseq2");
    let pairs: Vec<(&str, usize)> = ranks.iter().map(|r| (r.gene.as_ref(), r.rank)).collect();
    assert_eq!(pairs, vec![("g2", 1), ("g4", 2)]);
    Ok(())
}

#[test]
fn bad_result_tables() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;

    let no_score = write_file(
        &dir.path().join("a.tsv"),
        &["gene\tlog2FoldChange", "g1\t0.1"],
    )?;
    let err = read_de_results(&no_score, &ResultColumns::default()).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ConfigError>(),
        Some(ConfigError::MissingColumn { column, .. }) if column == "pvalue"
    ));

    let dup = write_file(
        &dir.path().join("b.tsv"),
        &[
            "gene\tlog2FoldChange\tpvalue",
            "g1\t0.1\t0.3",
            "g1\t0.2\t0.4",
        ],
    )?;
    let err = read_de_results(&dup, &ResultColumns::default()).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ConfigError>(),
        Some(ConfigError::DuplicateGene { gene, .. }) if gene == "g1"
    ));
    Ok(())
}

#[test]
fn rank_command_writes_tables() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;

    let truth_file = dir.path().join("sim.truth.tsv.gz");
    let truth_file = truth_file.to_str().unwrap();
    toy_truth().to_tsv(truth_file)?;

    let m1 = write_file(
        &dir.path().join("m1.tsv"),
        &[
            "gene\tlog2FoldChange\tpvalue",
            "g1\t0\t0.9",
            "g2\t1\t0.1",
            "g3\t0\t0.8",
            "g4\t1\t0.2",
        ],
    )?;
    let m2 = write_file(
        &dir.path().join("m2.tsv"),
        &[
            "gene\tlog2FoldChange\tpvalue",
            "g1\t0\t0.01",
            "g2\t1\t0.5",
            "g3\t0\t0.02",
            "g4\t1\t0.9",
        ],
    )?;

    let out = dir.path().join("eval/cmp");
    let out = out.to_str().unwrap();
    let results = format!("{},{}", m1, m2);

    let args = RankArgs::try_parse_from([
        "rank",
        "--results",
        &results,
        "--labels",
        "good,bad",
        "--truth",
        truth_file,
        "--out",
        out,
    ])?;
    run_rank(&args)?;

    let ranks = read_lines(&format!("{}.ranks.tsv", out))?;
    assert_eq!(ranks.len(), 5);
    assert_eq!(ranks[0].as_ref(), "label\tgene\trank\tscore\teffect");
    assert_eq!(ranks[1].as_ref(), "good\tg2\t1\t0.1\t1");
    assert_eq!(ranks[2].as_ref(), "good\tg4\t2\t0.2\t1");
    assert_eq!(ranks[3].as_ref(), "bad\tg2\t3\t0.5\t1");
    assert_eq!(ranks[4].as_ref(), "bad\tg4\t4\t0.9\t1");

    let summary = read_lines(&format!("{}.summary.tsv", out))?;
    assert_eq!(summary.len(), 3);
    assert!(summary[1].starts_with("good\t2\t2\t1.5\t1.5\t2\t1"));
    assert!(summary[2].starts_with("bad\t2\t2\t3.5\t3.5\t2\t0"));
    Ok(())
}

#[test]
fn mismatched_labels() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let truth_file = dir.path().join("t.tsv");
    let truth_file = truth_file.to_str().unwrap();
    toy_truth().to_tsv(truth_file)?;

    let args = RankArgs::try_parse_from([
        "rank",
        "-i",
        "a.tsv,b.tsv",
        "-l",
        "only_one",
        "-t",
        truth_file,
        "-o",
        "unused",
    ])?;
    let err = run_rank(&args).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ConfigError>(),
        Some(ConfigError::InvalidParameter(_))
    ));
    Ok(())
}
