use thiserror::Error;

/// Precondition violations. Any of these aborts the whole run; nothing
/// partial is written.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("gene list has {genes} entries but the mean vector has {means}")]
    LengthMismatch { genes: usize, means: usize },

    #[error("{cells} cells per sample can't be split evenly into {pseudobulks} pseudobulks")]
    IndivisiblePseudobulks { cells: usize, pseudobulks: usize },

    #[error("sample matrix `{sample}` doesn't share the gene rows of the first sample")]
    RowMismatch { sample: String },

    #[error("metadata row {index} ({meta}) doesn't match matrix column ({column})")]
    CellAlignment {
        index: usize,
        meta: String,
        column: String,
    },

    #[error("asked for {requested} genes but only {available} are available")]
    NotEnoughGenes { requested: usize, available: usize },

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("missing column `{column}` in {file}")]
    MissingColumn { column: String, file: String },

    #[error("gene `{gene}` appears more than once in {file}")]
    DuplicateGene { gene: String, file: String },
}
