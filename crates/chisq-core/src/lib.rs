//! Statistical engine for chisq.
//!
//! This crate ties together the analysis manifest from `chisq-schema` with the
//! statistics: contingency tables (`ContingencyTable`), the omnibus
//! chi-square test of independence and goodness-of-fit test, post-hoc
//! batteries (pairwise, one-vs-rest, cell residuals), and the family of
//! multiple-comparison corrections. The `Analyzer` runs the omnibus test,
//! decides whether a post-hoc battery is warranted, and corrects its p-values.

pub mod correction;
pub mod distribution;
pub mod engine;
pub mod independence;
pub mod input;
pub mod posthoc;
pub mod table;

pub use chisq_schema::{Axis, CorrectionMethod, PostHocMethod, Statistic};
pub use correction::{adjust, multipletests, CorrectionResult};
pub use engine::{
    analyze, analyze_manifest, AnalysisOptions, AnalysisReport, Analyzer, TableSummary,
};
pub use independence::{
    chi2_contingency, goodness_of_fit, ChiSquareResult, Expected, GoodnessOfFitResult,
};
pub use input::{load_table, read_observations_csv, read_table_csv, InputError};
pub use posthoc::{
    category_residuals, one_vs_rest, pairwise, residuals, run_post_hoc, CategoryResidual,
    CellResidual, Comparison, Findings, PostHocReport,
};
pub use table::{ContingencyTable, TableError};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("manifest error: {0}")]
    Manifest(#[from] chisq_schema::ManifestError),
    #[error("data error: {0}")]
    Table(#[from] TableError),
    #[error("data error: {0}")]
    Input(#[from] InputError),
    #[error("data error: goodness-of-fit: {0}")]
    GoodnessOfFit(String),
    #[error("invalid p-value at position {index}: {value}")]
    InvalidPValue { index: usize, value: f64 },
    #[error("alpha must lie strictly between 0 and 1, got {0}")]
    InvalidAlpha(f64),
    #[error("distribution error: {0}")]
    Distribution(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
