//! Loading contingency tables from manifests and delimited files.

use crate::table::ContingencyTable;
use crate::CoreError;
use chisq_schema::{DataFormat, ManifestError, TableSource};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum InputError {
    #[error("failed to read {path}: {source}")]
    Csv {
        path: String,
        #[source]
        source: csv::Error,
    },
    #[error("{path}: header has no column named '{field}'")]
    MissingField { path: String, field: String },
    #[error("{path}: line {line}: invalid count '{value}' (expected a non-negative integer)")]
    InvalidCount {
        path: String,
        line: u64,
        value: String,
    },
    #[error("{path}: no observations")]
    Empty { path: String },
}

fn csv_error(path: &Path) -> impl Fn(csv::Error) -> InputError + '_ {
    move |source| InputError::Csv {
        path: path.display().to_string(),
        source,
    }
}

fn reader(path: &Path, delimiter: u8) -> Result<csv::Reader<std::fs::File>, InputError> {
    csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(csv_error(path))
}

/// Cross-tabulate a long-format file with one observation per record.
///
/// Records where either field is blank are skipped.
pub fn read_observations_csv(
    path: &Path,
    row_field: &str,
    column_field: &str,
    delimiter: u8,
) -> Result<ContingencyTable, CoreError> {
    let mut rdr = reader(path, delimiter)?;
    let headers = rdr.headers().map_err(csv_error(path))?.clone();
    let position = |field: &str| {
        headers
            .iter()
            .position(|h| h == field)
            .ok_or_else(|| InputError::MissingField {
                path: path.display().to_string(),
                field: field.to_owned(),
            })
    };
    let row_idx = position(row_field)?;
    let column_idx = position(column_field)?;

    let mut pairs = Vec::new();
    let mut skipped = 0usize;
    for record in rdr.records() {
        let record = record.map_err(csv_error(path))?;
        let row = record.get(row_idx).unwrap_or("");
        let column = record.get(column_idx).unwrap_or("");
        if row.is_empty() || column.is_empty() {
            skipped += 1;
            debug!(
                "skipping record at line {} of {}: blank {}",
                record.position().map_or(0, csv::Position::line),
                path.display(),
                if row.is_empty() { row_field } else { column_field }
            );
            continue;
        }
        pairs.push((row.to_owned(), column.to_owned()));
    }

    if pairs.is_empty() {
        return Err(InputError::Empty {
            path: path.display().to_string(),
        }
        .into());
    }
    debug!(
        "read {} observations from {} ({skipped} skipped)",
        pairs.len(),
        path.display()
    );
    Ok(ContingencyTable::from_observations(pairs)?)
}

/// Read a wide-format table: a header of a corner cell followed by column
/// labels, then one record per row with its label and counts.
pub fn read_table_csv(path: &Path, delimiter: u8) -> Result<ContingencyTable, CoreError> {
    let mut rdr = reader(path, delimiter)?;
    let headers = rdr.headers().map_err(csv_error(path))?.clone();
    let columns: Vec<String> = headers.iter().skip(1).map(str::to_owned).collect();

    let mut rows = Vec::new();
    let mut counts = Vec::new();
    for record in rdr.records() {
        let record = record.map_err(csv_error(path))?;
        let line = record.position().map_or(0, csv::Position::line);
        let mut fields = record.iter();
        rows.push(fields.next().unwrap_or("").to_owned());
        let row = fields
            .map(|value| {
                value.parse::<u64>().map_err(|_| InputError::InvalidCount {
                    path: path.display().to_string(),
                    line,
                    value: value.to_owned(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        counts.push(row);
    }

    if rows.is_empty() {
        return Err(InputError::Empty {
            path: path.display().to_string(),
        }
        .into());
    }
    Ok(ContingencyTable::new(rows, columns, counts)?)
}

/// Resolve a manifest's table source; relative paths are taken from `base_dir`.
pub fn load_table(source: &TableSource, base_dir: &Path) -> Result<ContingencyTable, CoreError> {
    match source {
        TableSource::Inline {
            rows,
            columns,
            counts,
        } => Ok(ContingencyTable::new(
            rows.clone(),
            columns.clone(),
            counts.clone(),
        )?),
        TableSource::Csv {
            path,
            format,
            row_field,
            column_field,
            delimiter,
        } => {
            let resolved = resolve(base_dir, path);
            debug!("loading {format} data from {}", resolved.display());
            match format {
                DataFormat::Observations => {
                    let row_field = row_field
                        .as_deref()
                        .ok_or(ManifestError::MissingDataField("row_field"))?;
                    let column_field = column_field
                        .as_deref()
                        .ok_or(ManifestError::MissingDataField("column_field"))?;
                    read_observations_csv(&resolved, row_field, column_field, *delimiter)
                }
                DataFormat::Table => read_table_csv(&resolved, *delimiter),
            }
        }
    }
}

fn resolve(base_dir: &Path, path: &str) -> PathBuf {
    let path = Path::new(path);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}
