use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::types::UnknownVariant;

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to read manifest file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse manifest: {0}")]
    ParseToml(#[from] toml::de::Error),
    #[error("failed to serialize manifest: {0}")]
    SerializeToml(#[from] toml::ser::Error),
    #[error("failed to serialize normalized analysis: {0}")]
    CanonicalJson(#[from] serde_json::Error),
    #[error("unsupported manifest_version: {0}, expected 1")]
    UnsupportedVersion(u32),
    #[error("analysis.alpha must lie strictly between 0 and 1, got {0}")]
    InvalidAlpha(f64),
    #[error(transparent)]
    UnknownVariant(#[from] UnknownVariant),
    #[error("manifest declares no data: add a [table] or a [data] section")]
    MissingSource,
    #[error("manifest declares both [table] and [data]; keep exactly one")]
    ConflictingSources,
    #[error("table must have at least 2 {axis}, found {found}")]
    TooFewCategories { axis: &'static str, found: usize },
    #[error("table row {row} has {found} counts, expected {expected}")]
    RaggedTable {
        row: usize,
        found: usize,
        expected: usize,
    },
    #[error("table has {found} count rows but {expected} row labels")]
    RowCountMismatch { found: usize, expected: usize },
    #[error("{axis} label must not be empty")]
    EmptyLabel { axis: &'static str },
    #[error("duplicate {axis} label '{label}'")]
    DuplicateLabel { axis: &'static str, label: String },
    #[error("data.path must not be empty")]
    EmptyDataPath,
    #[error("data.{0} is required for the observations format")]
    MissingDataField(&'static str),
    #[error("data.{0} is only valid for the observations format")]
    UnexpectedDataField(&'static str),
    #[error("data.delimiter must be a single ASCII character, got '{0}'")]
    InvalidDelimiter(String),
}

/// Version 1 analysis manifest as written on disk.
///
/// Method names are kept as strings here and resolved during
/// [`ManifestV1::normalize`], so that a misspelled name is reported with the
/// list of accepted choices rather than as a generic TOML error.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ManifestV1 {
    pub manifest_version: u32,
    #[serde(default)]
    pub analysis: AnalysisSection,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<TableSection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<DataSection>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct AnalysisSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default = "default_alpha")]
    pub alpha: f64,
    #[serde(default = "default_correction")]
    pub correction: String,
    #[serde(default = "default_post_hoc")]
    pub post_hoc: String,
    #[serde(default = "default_axis")]
    pub axis: String,
    #[serde(default = "default_statistic")]
    pub statistic: String,
    #[serde(default = "default_true")]
    pub yates: bool,
    #[serde(default)]
    pub always_post_hoc: bool,
}

impl Default for AnalysisSection {
    fn default() -> Self {
        Self {
            name: None,
            alpha: default_alpha(),
            correction: default_correction(),
            post_hoc: default_post_hoc(),
            axis: default_axis(),
            statistic: default_statistic(),
            yates: true,
            always_post_hoc: false,
        }
    }
}

/// Inline contingency table: `counts[i][j]` is the frequency of row `i`, column `j`.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct TableSection {
    pub rows: Vec<String>,
    pub columns: Vec<String>,
    pub counts: Vec<Vec<u64>>,
}

/// CSV data source, resolved relative to the manifest's directory.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct DataSection {
    pub path: String,
    #[serde(default = "default_format")]
    pub format: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delimiter: Option<String>,
}

fn default_alpha() -> f64 {
    0.05
}

fn default_correction() -> String {
    "fdr_bh".to_owned()
}

fn default_post_hoc() -> String {
    "pairwise".to_owned()
}

fn default_axis() -> String {
    "rows".to_owned()
}

fn default_statistic() -> String {
    "pearson".to_owned()
}

fn default_format() -> String {
    "observations".to_owned()
}

fn default_true() -> bool {
    true
}

impl ManifestV1 {
    /// Render the manifest as pretty TOML.
    pub fn to_toml_string(&self) -> Result<String, ManifestError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

pub fn parse_manifest_str(input: &str) -> Result<ManifestV1, ManifestError> {
    Ok(toml::from_str(input)?)
}

pub fn parse_manifest_file(path: impl AsRef<Path>) -> Result<ManifestV1, ManifestError> {
    let content = fs::read_to_string(path)?;
    parse_manifest_str(&content)
}
