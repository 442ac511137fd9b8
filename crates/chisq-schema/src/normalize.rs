use crate::manifest::{AnalysisSection, DataSection, ManifestError, ManifestV1, TableSection};
use crate::types::{Axis, CorrectionMethod, DataFormat, PostHocMethod, Statistic};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Validated, fully-defaulted representation of an analysis manifest.
///
/// Labels and the analysis name are trimmed, method names are resolved to
/// their enums, and the table source is checked for shape. This is the input
/// to identity hashing and to the analysis engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NormalizedAnalysis {
    pub manifest_version: u32,
    pub name: Option<String>,
    pub alpha: f64,
    pub correction: CorrectionMethod,
    pub post_hoc: PostHocMethod,
    pub axis: Axis,
    pub statistic: Statistic,
    pub yates: bool,
    pub always_post_hoc: bool,
    pub source: TableSource,
}

/// Where the contingency table comes from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TableSource {
    Inline {
        rows: Vec<String>,
        columns: Vec<String>,
        counts: Vec<Vec<u64>>,
    },
    Csv {
        path: String,
        format: DataFormat,
        row_field: Option<String>,
        column_field: Option<String>,
        delimiter: u8,
    },
}

impl ManifestV1 {
    /// Normalize the manifest: validate fields, resolve method names, trim labels.
    pub fn normalize(&self) -> Result<NormalizedAnalysis, ManifestError> {
        if self.manifest_version != 1 {
            return Err(ManifestError::UnsupportedVersion(self.manifest_version));
        }

        let analysis = &self.analysis;
        if !(analysis.alpha > 0.0 && analysis.alpha < 1.0) {
            return Err(ManifestError::InvalidAlpha(analysis.alpha));
        }

        let source = match (&self.table, &self.data) {
            (Some(table), None) => normalize_table(table)?,
            (None, Some(data)) => normalize_data(data)?,
            (None, None) => return Err(ManifestError::MissingSource),
            (Some(_), Some(_)) => return Err(ManifestError::ConflictingSources),
        };

        let name = analysis
            .name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_owned);

        Ok(NormalizedAnalysis {
            manifest_version: self.manifest_version,
            name,
            alpha: analysis.alpha,
            correction: analysis.correction.parse()?,
            post_hoc: analysis.post_hoc.parse()?,
            axis: analysis.axis.parse()?,
            statistic: analysis.statistic.parse()?,
            yates: analysis.yates,
            always_post_hoc: analysis.always_post_hoc,
            source,
        })
    }
}

impl NormalizedAnalysis {
    pub fn canonical_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Rebuild an on-disk manifest with every default spelled out.
    pub fn to_manifest(&self) -> ManifestV1 {
        let analysis = AnalysisSection {
            name: self.name.clone(),
            alpha: self.alpha,
            correction: self.correction.to_string(),
            post_hoc: self.post_hoc.to_string(),
            axis: self.axis.to_string(),
            statistic: self.statistic.to_string(),
            yates: self.yates,
            always_post_hoc: self.always_post_hoc,
        };

        let (table, data) = match &self.source {
            TableSource::Inline {
                rows,
                columns,
                counts,
            } => (
                Some(TableSection {
                    rows: rows.clone(),
                    columns: columns.clone(),
                    counts: counts.clone(),
                }),
                None,
            ),
            TableSource::Csv {
                path,
                format,
                row_field,
                column_field,
                delimiter,
            } => (
                None,
                Some(DataSection {
                    path: path.clone(),
                    format: format.to_string(),
                    row_field: row_field.clone(),
                    column_field: column_field.clone(),
                    delimiter: Some(char::from(*delimiter).to_string()),
                }),
            ),
        };

        ManifestV1 {
            manifest_version: self.manifest_version,
            analysis,
            table,
            data,
        }
    }
}

fn normalize_table(table: &TableSection) -> Result<TableSource, ManifestError> {
    let rows = normalize_labels(&table.rows, "row")?;
    let columns = normalize_labels(&table.columns, "column")?;

    if table.counts.len() != rows.len() {
        return Err(ManifestError::RowCountMismatch {
            found: table.counts.len(),
            expected: rows.len(),
        });
    }
    for (i, row) in table.counts.iter().enumerate() {
        if row.len() != columns.len() {
            return Err(ManifestError::RaggedTable {
                row: i,
                found: row.len(),
                expected: columns.len(),
            });
        }
    }

    Ok(TableSource::Inline {
        rows,
        columns,
        counts: table.counts.clone(),
    })
}

fn normalize_labels(labels: &[String], axis: &'static str) -> Result<Vec<String>, ManifestError> {
    if labels.len() < 2 {
        return Err(ManifestError::TooFewCategories {
            axis: if axis == "row" { "rows" } else { "columns" },
            found: labels.len(),
        });
    }

    let mut seen = BTreeSet::new();
    let mut out = Vec::with_capacity(labels.len());
    for label in labels {
        let trimmed = label.trim().to_owned();
        if trimmed.is_empty() {
            return Err(ManifestError::EmptyLabel { axis });
        }
        if !seen.insert(trimmed.clone()) {
            return Err(ManifestError::DuplicateLabel {
                axis,
                label: trimmed,
            });
        }
        out.push(trimmed);
    }
    Ok(out)
}

fn normalize_data(data: &DataSection) -> Result<TableSource, ManifestError> {
    let path = data.path.trim().to_owned();
    if path.is_empty() {
        return Err(ManifestError::EmptyDataPath);
    }

    let format: DataFormat = data.format.parse()?;
    let row_field = normalize_field(data.row_field.as_deref());
    let column_field = normalize_field(data.column_field.as_deref());

    match format {
        DataFormat::Observations => {
            if row_field.is_none() {
                return Err(ManifestError::MissingDataField("row_field"));
            }
            if column_field.is_none() {
                return Err(ManifestError::MissingDataField("column_field"));
            }
        }
        DataFormat::Table => {
            if row_field.is_some() {
                return Err(ManifestError::UnexpectedDataField("row_field"));
            }
            if column_field.is_some() {
                return Err(ManifestError::UnexpectedDataField("column_field"));
            }
        }
    }

    Ok(TableSource::Csv {
        path,
        format,
        row_field,
        column_field,
        delimiter: parse_delimiter(data.delimiter.as_deref())?,
    })
}

fn normalize_field(field: Option<&str>) -> Option<String> {
    field
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .map(str::to_owned)
}

/// Field delimiter byte. `None` means a comma; the two-character escape `\t` means a tab.
pub fn parse_delimiter(raw: Option<&str>) -> Result<u8, ManifestError> {
    let Some(raw) = raw else {
        return Ok(b',');
    };
    let resolved = if raw == "\\t" { "\t" } else { raw };
    match resolved.as_bytes() {
        [b] if b.is_ascii() => Ok(*b),
        _ => Err(ManifestError::InvalidDelimiter(raw.to_owned())),
    }
}
