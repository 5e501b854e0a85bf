//! Simulated single-cell counts for a sex x pathology design with a
//! known set of differential genes, and rank-based scoring of
//! differential expression results against that ground truth.

pub mod assemble;
pub mod common;
pub mod design;
pub mod error;
pub mod gene_pool;
pub mod nb_count;
pub mod pseudobulk;
pub mod rank;
pub mod run_rank;
pub mod sample_matrix;
pub mod simulate;
pub mod truth;
