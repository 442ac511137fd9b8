//! Newtype identifiers and the method enums shared by manifests, the engine, and the CLI.
//!
//! Identifier newtypes serialize as plain strings. Method enums serialize as
//! `snake_case` names and parse case-insensitively, accepting common aliases.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Deref;
use std::str::FromStr;

macro_rules! string_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new instance from a string.
            pub fn new(s: impl Into<String>) -> Self {
                Self(s.into())
            }

            /// Return the inner string as a slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume self and return the inner `String`.
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl Deref for $name {
            type Target = str;
            fn deref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl PartialEq<str> for $name {
            fn eq(&self, other: &str) -> bool {
                self.0 == other
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_owned())
            }
        }
    };
}

string_newtype!(
    /// Full 64-character hex analysis identifier, derived from normalized manifest content.
    AnalysisId
);

string_newtype!(
    /// Truncated 12-character prefix of an [`AnalysisId`], used for display.
    ShortId
);

/// Error returned when a method name does not match any known variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
    pub expected: &'static str,
}

impl fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown {} '{}' (expected: {})",
            self.kind, self.value, self.expected
        )
    }
}

impl std::error::Error for UnknownVariant {}

fn canonical_key(s: &str) -> String {
    s.trim().to_lowercase().replace(&['-', ' '][..], "_")
}

/// Family-wise error or false discovery rate control applied to post-hoc p-values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CorrectionMethod {
    Bonferroni,
    Sidak,
    Holm,
    HolmSidak,
    Hochberg,
    Hommel,
    #[default]
    FdrBh,
    FdrBy,
    None,
}

impl CorrectionMethod {
    pub const ALL: [CorrectionMethod; 9] = [
        Self::Bonferroni,
        Self::Sidak,
        Self::Holm,
        Self::HolmSidak,
        Self::Hochberg,
        Self::Hommel,
        Self::FdrBh,
        Self::FdrBy,
        Self::None,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bonferroni => "bonferroni",
            Self::Sidak => "sidak",
            Self::Holm => "holm",
            Self::HolmSidak => "holm_sidak",
            Self::Hochberg => "hochberg",
            Self::Hommel => "hommel",
            Self::FdrBh => "fdr_bh",
            Self::FdrBy => "fdr_by",
            Self::None => "none",
        }
    }

    /// Human-readable name used in reports.
    pub fn describe(self) -> &'static str {
        match self {
            Self::Bonferroni => "Bonferroni",
            Self::Sidak => "Sidak",
            Self::Holm => "Holm step-down",
            Self::HolmSidak => "Holm-Sidak step-down",
            Self::Hochberg => "Hochberg step-up",
            Self::Hommel => "Hommel",
            Self::FdrBh => "Benjamini-Hochberg FDR",
            Self::FdrBy => "Benjamini-Yekutieli FDR",
            Self::None => "uncorrected",
        }
    }

    /// Whether the method controls the false discovery rate rather than the family-wise error rate.
    pub fn controls_fdr(self) -> bool {
        matches!(self, Self::FdrBh | Self::FdrBy)
    }
}

impl fmt::Display for CorrectionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CorrectionMethod {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match canonical_key(s).as_str() {
            "bonferroni" | "b" => Ok(Self::Bonferroni),
            "sidak" | "s" => Ok(Self::Sidak),
            "holm" | "h" => Ok(Self::Holm),
            "holm_sidak" | "hs" => Ok(Self::HolmSidak),
            "hochberg" | "simes_hochberg" | "sh" => Ok(Self::Hochberg),
            "hommel" | "ho" => Ok(Self::Hommel),
            "fdr_bh" | "bh" | "benjamini_hochberg" | "fdr_i" => Ok(Self::FdrBh),
            "fdr_by" | "by" | "benjamini_yekutieli" | "fdr_n" => Ok(Self::FdrBy),
            "none" | "uncorrected" => Ok(Self::None),
            _ => Err(UnknownVariant {
                kind: "correction method",
                value: s.to_owned(),
                expected: "bonferroni, sidak, holm, holm_sidak, hochberg, hommel, fdr_bh, fdr_by, none",
            }),
        }
    }
}

/// Follow-up battery run after a significant omnibus test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PostHocMethod {
    /// Every pair of categories on the chosen axis, tested on its 2xC sub-table.
    #[default]
    Pairwise,
    /// Each category against the pooled remainder.
    OneVsRest,
    /// Adjusted standardized residual for every cell.
    Residuals,
    None,
}

impl PostHocMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pairwise => "pairwise",
            Self::OneVsRest => "one_vs_rest",
            Self::Residuals => "residuals",
            Self::None => "none",
        }
    }
}

impl fmt::Display for PostHocMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PostHocMethod {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match canonical_key(s).as_str() {
            "pairwise" | "pairs" => Ok(Self::Pairwise),
            "one_vs_rest" | "ovr" => Ok(Self::OneVsRest),
            "residuals" | "residual" | "cells" => Ok(Self::Residuals),
            "none" | "off" => Ok(Self::None),
            _ => Err(UnknownVariant {
                kind: "post-hoc method",
                value: s.to_owned(),
                expected: "pairwise, one_vs_rest, residuals, none",
            }),
        }
    }
}

/// Which margin's categories a post-hoc battery compares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Axis {
    #[default]
    Rows,
    Columns,
}

impl Axis {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Rows => "rows",
            Self::Columns => "columns",
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Axis {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match canonical_key(s).as_str() {
            "rows" | "row" | "index" => Ok(Self::Rows),
            "columns" | "column" | "cols" => Ok(Self::Columns),
            _ => Err(UnknownVariant {
                kind: "axis",
                value: s.to_owned(),
                expected: "rows, columns",
            }),
        }
    }
}

/// Test statistic used for the omnibus and pairwise tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Statistic {
    /// Pearson's X².
    #[default]
    Pearson,
    /// Likelihood-ratio G statistic.
    LogLikelihood,
}

impl Statistic {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pearson => "pearson",
            Self::LogLikelihood => "log_likelihood",
        }
    }
}

impl fmt::Display for Statistic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Statistic {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match canonical_key(s).as_str() {
            "pearson" | "chi2" | "x2" => Ok(Self::Pearson),
            "log_likelihood" | "g" | "g_test" | "likelihood_ratio" => Ok(Self::LogLikelihood),
            _ => Err(UnknownVariant {
                kind: "statistic",
                value: s.to_owned(),
                expected: "pearson, log_likelihood",
            }),
        }
    }
}

/// Layout of a CSV data source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DataFormat {
    /// One record per observation, categories in two named fields.
    #[default]
    Observations,
    /// Wide contingency table: header of column labels, one labelled row per category.
    Table,
}

impl DataFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Observations => "observations",
            Self::Table => "table",
        }
    }
}

impl fmt::Display for DataFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataFormat {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match canonical_key(s).as_str() {
            "observations" | "long" | "records" => Ok(Self::Observations),
            "table" | "wide" | "crosstab" => Ok(Self::Table),
            _ => Err(UnknownVariant {
                kind: "data format",
                value: s.to_owned(),
                expected: "observations, table",
            }),
        }
    }
}
