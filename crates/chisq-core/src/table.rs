use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

/// Label given to the pooled remainder in one-vs-rest sub-tables.
pub const REST_LABEL: &str = "(rest)";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TableError {
    #[error("table must have at least 2 {axis}, found {found}")]
    TooFewCategories { axis: &'static str, found: usize },
    #[error("table has {found} count rows but {expected} row labels")]
    RowCountMismatch { found: usize, expected: usize },
    #[error("table row '{row}' has {found} counts, expected {expected}")]
    Ragged {
        row: String,
        found: usize,
        expected: usize,
    },
    #[error("{axis} label must not be empty")]
    EmptyLabel { axis: &'static str },
    #[error("duplicate {axis} label '{label}'")]
    DuplicateLabel { axis: &'static str, label: String },
    #[error("{axis} '{label}' has no observations; every row and column needs a non-zero total")]
    ZeroMargin { axis: &'static str, label: String },
}

/// Two-way table of observed frequencies with labelled rows and columns.
///
/// Invariants, checked on construction: at least two rows and two columns,
/// rectangular counts, unique non-empty labels, and a positive total for
/// every row and every column. The last one guarantees every expected
/// frequency is strictly positive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContingencyTable {
    rows: Vec<String>,
    columns: Vec<String>,
    counts: Vec<Vec<u64>>,
}

impl ContingencyTable {
    pub fn new(
        rows: Vec<String>,
        columns: Vec<String>,
        counts: Vec<Vec<u64>>,
    ) -> Result<Self, TableError> {
        check_labels(&rows, "row", "rows")?;
        check_labels(&columns, "column", "columns")?;

        if counts.len() != rows.len() {
            return Err(TableError::RowCountMismatch {
                found: counts.len(),
                expected: rows.len(),
            });
        }
        for (label, row) in rows.iter().zip(&counts) {
            if row.len() != columns.len() {
                return Err(TableError::Ragged {
                    row: label.clone(),
                    found: row.len(),
                    expected: columns.len(),
                });
            }
        }

        let table = Self {
            rows,
            columns,
            counts,
        };

        for (label, total) in table.rows.iter().zip(table.row_totals()) {
            if total == 0 {
                return Err(TableError::ZeroMargin {
                    axis: "row",
                    label: label.clone(),
                });
            }
        }
        for (label, total) in table.columns.iter().zip(table.column_totals()) {
            if total == 0 {
                return Err(TableError::ZeroMargin {
                    axis: "column",
                    label: label.clone(),
                });
            }
        }

        Ok(table)
    }

    /// Cross-tabulate paired categorical observations.
    ///
    /// Row and column categories are ordered lexicographically.
    pub fn from_observations<I, R, C>(observations: I) -> Result<Self, TableError>
    where
        I: IntoIterator<Item = (R, C)>,
        R: Into<String>,
        C: Into<String>,
    {
        let mut cells: BTreeMap<(String, String), u64> = BTreeMap::new();
        let mut row_set = BTreeSet::new();
        let mut column_set = BTreeSet::new();

        for (row, column) in observations {
            let row = row.into();
            let column = column.into();
            row_set.insert(row.clone());
            column_set.insert(column.clone());
            *cells.entry((row, column)).or_insert(0) += 1;
        }

        let rows: Vec<String> = row_set.into_iter().collect();
        let columns: Vec<String> = column_set.into_iter().collect();
        let counts = rows
            .iter()
            .map(|r| {
                columns
                    .iter()
                    .map(|c| {
                        cells
                            .get(&(r.clone(), c.clone()))
                            .copied()
                            .unwrap_or(0)
                    })
                    .collect()
            })
            .collect();

        Self::new(rows, columns, counts)
    }

    pub fn rows(&self) -> &[String] {
        &self.rows
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn counts(&self) -> &[Vec<u64>] {
        &self.counts
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn get(&self, row: usize, column: usize) -> Option<u64> {
        self.counts.get(row).and_then(|r| r.get(column)).copied()
    }

    pub fn row_totals(&self) -> Vec<u64> {
        self.counts.iter().map(|r| r.iter().sum()).collect()
    }

    pub fn column_totals(&self) -> Vec<u64> {
        (0..self.columns.len())
            .map(|j| self.counts.iter().map(|r| r[j]).sum())
            .collect()
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().flatten().sum()
    }

    /// Expected frequencies under independence: `row_total * column_total / n`.
    pub fn expected(&self) -> Vec<Vec<f64>> {
        let n = self.total() as f64;
        let column_totals = self.column_totals();
        self.row_totals()
            .into_iter()
            .map(|r| {
                column_totals
                    .iter()
                    .map(|&c| r as f64 * c as f64 / n)
                    .collect()
            })
            .collect()
    }

    /// Swap rows and columns.
    pub fn transpose(&self) -> Self {
        let counts = (0..self.columns.len())
            .map(|j| self.counts.iter().map(|r| r[j]).collect())
            .collect();
        Self {
            rows: self.columns.clone(),
            columns: self.rows.clone(),
            counts,
        }
    }

    /// Sub-table of the given rows, with columns that are empty in the
    /// selection dropped.
    ///
    /// Returns `None` when fewer than two distinct rows are selected or fewer
    /// than two columns remain; such a comparison has no degrees of freedom.
    pub fn select_rows(&self, indices: &[usize]) -> Option<Self> {
        let distinct: BTreeSet<usize> = indices.iter().copied().collect();
        if distinct.len() < 2
            || distinct.len() != indices.len()
            || indices.iter().any(|&i| i >= self.rows.len())
        {
            return None;
        }
        let rows = indices.iter().map(|&i| self.rows[i].clone()).collect();
        let counts: Vec<Vec<u64>> = indices.iter().map(|&i| self.counts[i].clone()).collect();
        Self::compact(rows, self.columns.clone(), counts)
    }

    /// Two-row sub-table of `index` against the pooled remainder of all other rows.
    pub fn one_vs_rest(&self, index: usize) -> Option<Self> {
        if index >= self.rows.len() {
            return None;
        }
        let rest: Vec<u64> = (0..self.columns.len())
            .map(|j| {
                self.counts
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| *i != index)
                    .map(|(_, r)| r[j])
                    .sum()
            })
            .collect();
        let rows = vec![self.rows[index].clone(), self.rest_label()];
        let counts = vec![self.counts[index].clone(), rest];
        Self::compact(rows, self.columns.clone(), counts)
    }

    /// `REST_LABEL`, suffixed with a number when a row already carries it.
    fn rest_label(&self) -> String {
        let mut label = REST_LABEL.to_owned();
        let mut n = 2;
        while self.rows.contains(&label) {
            label = format!("(rest {n})");
            n += 1;
        }
        label
    }

    /// Drop columns that are empty across `counts`.
    ///
    /// Callers pass rows taken from (or pooled out of) a validated table, so
    /// labels are unique and every row total stays positive; only the column
    /// count can fall below two.
    fn compact(rows: Vec<String>, columns: Vec<String>, counts: Vec<Vec<u64>>) -> Option<Self> {
        let keep: Vec<usize> = (0..columns.len())
            .filter(|&j| counts.iter().any(|r| r[j] > 0))
            .collect();
        if keep.len() < 2 {
            return None;
        }
        let columns = keep.iter().map(|&j| columns[j].clone()).collect();
        let counts = counts
            .into_iter()
            .map(|r| keep.iter().map(|&j| r[j]).collect())
            .collect();
        Some(Self {
            rows,
            columns,
            counts,
        })
    }
}

fn check_labels(
    labels: &[String],
    axis: &'static str,
    plural: &'static str,
) -> Result<(), TableError> {
    if labels.len() < 2 {
        return Err(TableError::TooFewCategories {
            axis: plural,
            found: labels.len(),
        });
    }
    let mut seen = BTreeSet::new();
    for label in labels {
        if label.trim().is_empty() {
            return Err(TableError::EmptyLabel { axis });
        }
        if !seen.insert(label.as_str()) {
            return Err(TableError::DuplicateLabel {
                axis,
                label: label.clone(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(xs: &[&str]) -> Vec<String> {
        xs.iter().map(|s| (*s).to_owned()).collect()
    }

    fn sample() -> ContingencyTable {
        ContingencyTable::new(
            labels(&["control", "drug_a", "drug_b"]),
            labels(&["improved", "unchanged", "worse"]),
            vec![vec![18, 22, 20], vec![35, 15, 10], vec![28, 20, 12]],
        )
        .unwrap()
    }

    #[test]
    fn margins_and_total() {
        let t = sample();
        assert_eq!(t.row_totals(), vec![60, 60, 60]);
        assert_eq!(t.column_totals(), vec![81, 57, 42]);
        assert_eq!(t.total(), 180);
        assert_eq!(t.get(1, 0), Some(35));
        assert_eq!(t.get(3, 0), None);
    }

    #[test]
    fn expected_frequencies() {
        let t = ContingencyTable::new(
            labels(&["a", "b"]),
            labels(&["x", "y", "z"]),
            vec![vec![10, 10, 20], vec![20, 20, 20]],
        )
        .unwrap();
        let e = t.expected();
        assert_eq!(e[0], vec![12.0, 12.0, 16.0]);
        assert_eq!(e[1], vec![18.0, 18.0, 24.0]);
    }

    #[test]
    fn rejects_zero_margin() {
        let err = ContingencyTable::new(
            labels(&["a", "b"]),
            labels(&["x", "y"]),
            vec![vec![0, 5], vec![0, 3]],
        )
        .unwrap_err();
        assert_eq!(
            err,
            TableError::ZeroMargin {
                axis: "column",
                label: "x".to_owned()
            }
        );
    }

    #[test]
    fn rejects_bad_shapes() {
        assert!(matches!(
            ContingencyTable::new(labels(&["a"]), labels(&["x", "y"]), vec![vec![1, 2]]),
            Err(TableError::TooFewCategories { axis: "rows", .. })
        ));
        assert!(matches!(
            ContingencyTable::new(
                labels(&["a", "b"]),
                labels(&["x", "y"]),
                vec![vec![1, 2], vec![3]]
            ),
            Err(TableError::Ragged { .. })
        ));
        assert!(matches!(
            ContingencyTable::new(labels(&["a", "a"]), labels(&["x", "y"]), vec![vec![1, 2]; 2]),
            Err(TableError::DuplicateLabel { axis: "row", .. })
        ));
    }

    #[test]
    fn cross_tabulates_observations_in_sorted_order() {
        let obs = vec![
            ("b", "yes"),
            ("a", "no"),
            ("a", "yes"),
            ("b", "yes"),
            ("a", "no"),
        ];
        let t = ContingencyTable::from_observations(obs).unwrap();
        assert_eq!(t.rows(), ["a", "b"]);
        assert_eq!(t.columns(), ["no", "yes"]);
        assert_eq!(t.counts(), [vec![2, 1], vec![0, 2]]);
    }

    #[test]
    fn transpose_swaps_axes() {
        let t = sample().transpose();
        assert_eq!(t.rows(), ["improved", "unchanged", "worse"]);
        assert_eq!(t.counts()[0], vec![18, 35, 28]);
        assert_eq!(t.transpose(), sample());
    }

    #[test]
    fn select_rows_drops_empty_columns() {
        let t = ContingencyTable::new(
            labels(&["a", "b", "c"]),
            labels(&["x", "y", "z"]),
            vec![vec![5, 0, 3], vec![4, 0, 1], vec![0, 6, 2]],
        )
        .unwrap();
        let sub = t.select_rows(&[0, 1]).unwrap();
        assert_eq!(sub.columns(), ["x", "z"]);
        assert_eq!(sub.counts(), [vec![5, 3], vec![4, 1]]);
    }

    #[test]
    fn select_rows_is_none_when_degenerate() {
        let t = ContingencyTable::new(
            labels(&["a", "b", "c"]),
            labels(&["x", "y"]),
            vec![vec![5, 0], vec![4, 0], vec![0, 6]],
        )
        .unwrap();
        assert!(t.select_rows(&[0, 1]).is_none());
        assert!(t.select_rows(&[0]).is_none());
        assert!(t.select_rows(&[0, 7]).is_none());
        assert!(t.select_rows(&[2, 2]).is_none());
    }

    #[test]
    fn one_vs_rest_pools_remaining_rows() {
        let sub = sample().one_vs_rest(1).unwrap();
        assert_eq!(sub.rows(), ["drug_a", REST_LABEL]);
        assert_eq!(sub.counts(), [vec![35, 15, 10], vec![46, 42, 32]]);
    }

    #[test]
    fn one_vs_rest_label_does_not_collide_with_rows() {
        let t = ContingencyTable::new(
            labels(&["a", REST_LABEL, "(rest 2)"]),
            labels(&["x", "y"]),
            vec![vec![50, 5], vec![5, 50], vec![20, 20]],
        )
        .unwrap();
        let sub = t.one_vs_rest(1).unwrap();
        assert_eq!(sub.rows(), [REST_LABEL, "(rest 3)"]);
        assert_eq!(sub.counts(), [vec![5, 50], vec![70, 25]]);
    }

    #[test]
    fn one_vs_rest_keeps_columns_the_focal_row_lacks() {
        let t = ContingencyTable::new(
            labels(&["a", "b", "c"]),
            labels(&["x", "y", "z"]),
            vec![vec![5, 0, 0], vec![1, 2, 3], vec![0, 4, 1]],
        )
        .unwrap();
        let sub = t.one_vs_rest(0).unwrap();
        assert_eq!(sub.columns(), ["x", "y", "z"]);
        assert_eq!(sub.counts(), [vec![5, 0, 0], vec![1, 6, 4]]);
    }
}
