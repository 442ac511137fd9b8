//! Post-hoc batteries run after a significant omnibus test.
//!
//! Each battery produces one family of p-values that is corrected as a whole
//! with the configured multiple-comparison method.

use crate::correction::{multipletests, CorrectionResult};
use crate::distribution::normal_two_sided_p;
use crate::engine::AnalysisOptions;
use crate::independence::{chi2_contingency, GoodnessOfFitResult};
use crate::table::ContingencyTable;
use crate::CoreError;
use chisq_schema::{Axis, CorrectionMethod, PostHocMethod};
use serde::Serialize;
use std::borrow::Cow;
use tracing::{debug, info};

/// A chi-square test between two categories, or one category and the rest.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Comparison {
    pub first: String,
    /// `None` when `first` is compared against the pooled remainder.
    pub second: Option<String>,
    pub statistic: f64,
    pub dof: usize,
    pub p_value: f64,
    pub adjusted_p_value: f64,
    pub reject: bool,
    /// The sub-table kept fewer than two non-empty columns; nothing was tested.
    pub degenerate: bool,
    pub yates_applied: bool,
}

impl Comparison {
    pub fn label(&self) -> String {
        match &self.second {
            Some(second) => format!("{} vs {}", self.first, second),
            None => format!("{} vs rest", self.first),
        }
    }
}

/// Adjusted standardized residual of one table cell.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CellResidual {
    pub row: String,
    pub column: String,
    pub observed: u64,
    pub expected: f64,
    pub residual: f64,
    pub p_value: f64,
    pub adjusted_p_value: f64,
    pub reject: bool,
}

/// Standardized residual of one goodness-of-fit category.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CategoryResidual {
    pub category: String,
    pub observed: u64,
    pub expected: f64,
    pub residual: f64,
    pub p_value: f64,
    pub adjusted_p_value: f64,
    pub reject: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "kind", content = "items", rename_all = "snake_case")]
pub enum Findings {
    Pairwise(Vec<Comparison>),
    OneVsRest(Vec<Comparison>),
    Residuals(Vec<CellResidual>),
}

impl Findings {
    pub fn len(&self) -> usize {
        match self {
            Findings::Pairwise(items) | Findings::OneVsRest(items) => items.len(),
            Findings::Residuals(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn rejected(&self) -> usize {
        match self {
            Findings::Pairwise(items) | Findings::OneVsRest(items) => {
                items.iter().filter(|c| c.reject).count()
            }
            Findings::Residuals(items) => items.iter().filter(|c| c.reject).count(),
        }
    }

    pub fn degenerate(&self) -> impl Iterator<Item = &Comparison> {
        let items: &[Comparison] = match self {
            Findings::Pairwise(items) | Findings::OneVsRest(items) => items,
            Findings::Residuals(_) => &[],
        };
        items.iter().filter(|c| c.degenerate)
    }
}

/// A corrected post-hoc family.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PostHocReport {
    pub method: PostHocMethod,
    /// Axis whose categories were compared; `None` for cell residuals.
    pub axis: Option<Axis>,
    pub correction: CorrectionMethod,
    pub alpha: f64,
    pub family_size: usize,
    pub rejected: usize,
    pub alpha_bonferroni: f64,
    pub alpha_sidak: f64,
    pub findings: Findings,
}

impl PostHocReport {
    fn new(
        method: PostHocMethod,
        axis: Option<Axis>,
        corrected: &CorrectionResult,
        findings: Findings,
    ) -> Self {
        Self {
            method,
            axis,
            correction: corrected.method,
            alpha: corrected.alpha,
            family_size: findings.len(),
            rejected: findings.rejected(),
            alpha_bonferroni: corrected.alpha_bonferroni,
            alpha_sidak: corrected.alpha_sidak,
            findings,
        }
    }
}

/// Run the battery selected by `options.post_hoc`; `None` when it is `none`.
pub fn run_post_hoc(
    table: &ContingencyTable,
    options: &AnalysisOptions,
) -> Result<Option<PostHocReport>, CoreError> {
    let report = match options.post_hoc {
        PostHocMethod::Pairwise => pairwise(table, options)?,
        PostHocMethod::OneVsRest => one_vs_rest(table, options)?,
        PostHocMethod::Residuals => residuals(table, options)?,
        PostHocMethod::None => return Ok(None),
    };
    info!(
        "post-hoc {}: {} of {} rejected after {} correction",
        report.method, report.rejected, report.family_size, report.correction
    );
    Ok(Some(report))
}

fn oriented(table: &ContingencyTable, axis: Axis) -> Cow<'_, ContingencyTable> {
    match axis {
        Axis::Rows => Cow::Borrowed(table),
        Axis::Columns => Cow::Owned(table.transpose()),
    }
}

/// Every unordered pair of categories on `options.axis`, tested on its 2×C sub-table.
pub fn pairwise(
    table: &ContingencyTable,
    options: &AnalysisOptions,
) -> Result<PostHocReport, CoreError> {
    let table = oriented(table, options.axis);
    let labels = table.rows();

    let mut comparisons = Vec::new();
    for i in 0..labels.len() {
        for j in (i + 1)..labels.len() {
            let sub = table.select_rows(&[i, j]);
            let comparison = compare(
                sub.as_ref(),
                labels[i].clone(),
                Some(labels[j].clone()),
                options,
            )?;
            comparisons.push(comparison);
        }
    }

    let corrected = correct(&mut comparisons, options)?;
    Ok(PostHocReport::new(
        PostHocMethod::Pairwise,
        Some(options.axis),
        &corrected,
        Findings::Pairwise(comparisons),
    ))
}

/// Each category on `options.axis` against the pooled remainder.
pub fn one_vs_rest(
    table: &ContingencyTable,
    options: &AnalysisOptions,
) -> Result<PostHocReport, CoreError> {
    let table = oriented(table, options.axis);

    let mut comparisons = Vec::new();
    for (i, label) in table.rows().iter().enumerate() {
        let sub = table.one_vs_rest(i);
        comparisons.push(compare(sub.as_ref(), label.clone(), None, options)?);
    }

    let corrected = correct(&mut comparisons, options)?;
    Ok(PostHocReport::new(
        PostHocMethod::OneVsRest,
        Some(options.axis),
        &corrected,
        Findings::OneVsRest(comparisons),
    ))
}

/// Adjusted standardized residuals of every cell, in row-major order.
///
/// `(o − e) / sqrt(e · (1 − rᵢ/n) · (1 − cⱼ/n))`, tested against the standard normal.
pub fn residuals(
    table: &ContingencyTable,
    options: &AnalysisOptions,
) -> Result<PostHocReport, CoreError> {
    let n = table.total() as f64;
    let row_totals = table.row_totals();
    let column_totals = table.column_totals();
    let expected = table.expected();

    let mut cells = Vec::with_capacity(table.n_rows() * table.n_columns());
    for (i, row) in table.rows().iter().enumerate() {
        let row_share = 1.0 - row_totals[i] as f64 / n;
        for (j, column) in table.columns().iter().enumerate() {
            let column_share = 1.0 - column_totals[j] as f64 / n;
            let observed = table.counts()[i][j];
            let e = expected[i][j];
            let residual = (observed as f64 - e) / (e * row_share * column_share).sqrt();
            cells.push(CellResidual {
                row: row.clone(),
                column: column.clone(),
                observed,
                expected: e,
                residual,
                p_value: normal_two_sided_p(residual)?,
                adjusted_p_value: f64::NAN,
                reject: false,
            });
        }
    }

    let p_values: Vec<f64> = cells.iter().map(|c| c.p_value).collect();
    let corrected = multipletests(&p_values, options.alpha, options.correction)?;
    for (cell, (adjusted, reject)) in cells
        .iter_mut()
        .zip(corrected.adjusted.iter().zip(&corrected.reject))
    {
        cell.adjusted_p_value = *adjusted;
        cell.reject = *reject;
    }

    Ok(PostHocReport::new(
        PostHocMethod::Residuals,
        None,
        &corrected,
        Findings::Residuals(cells),
    ))
}

/// Corrected per-category residuals of a goodness-of-fit test.
pub fn category_residuals(
    result: &GoodnessOfFitResult,
    labels: &[String],
    correction: CorrectionMethod,
    alpha: f64,
) -> Result<Vec<CategoryResidual>, CoreError> {
    if labels.len() != result.observed.len() {
        return Err(CoreError::GoodnessOfFit(format!(
            "{} labels given for {} categories",
            labels.len(),
            result.observed.len()
        )));
    }
    let corrected = multipletests(&result.residual_p_values, alpha, correction)?;

    Ok(labels
        .iter()
        .enumerate()
        .map(|(k, label)| CategoryResidual {
            category: label.clone(),
            observed: result.observed[k],
            expected: result.expected[k],
            residual: result.residuals[k],
            p_value: result.residual_p_values[k],
            adjusted_p_value: corrected.adjusted[k],
            reject: corrected.reject[k],
        })
        .collect())
}

fn compare(
    sub: Option<&ContingencyTable>,
    first: String,
    second: Option<String>,
    options: &AnalysisOptions,
) -> Result<Comparison, CoreError> {
    let Some(sub) = sub else {
        debug!("degenerate comparison {first} vs {second:?}: fewer than 2 non-empty columns");
        return Ok(Comparison {
            first,
            second,
            statistic: 0.0,
            dof: 0,
            p_value: 1.0,
            adjusted_p_value: 1.0,
            reject: false,
            degenerate: true,
            yates_applied: false,
        });
    };

    let result = chi2_contingency(sub, options.statistic, options.yates)?;
    debug!(
        "compared {first} vs {second:?}: statistic {:.4}, dof {}, p {:.4e}",
        result.statistic, result.dof, result.p_value
    );
    Ok(Comparison {
        first,
        second,
        statistic: result.statistic,
        dof: result.dof,
        p_value: result.p_value,
        adjusted_p_value: f64::NAN,
        reject: false,
        degenerate: false,
        yates_applied: result.yates_applied,
    })
}

fn correct(
    comparisons: &mut [Comparison],
    options: &AnalysisOptions,
) -> Result<CorrectionResult, CoreError> {
    let p_values: Vec<f64> = comparisons.iter().map(|c| c.p_value).collect();
    let corrected = multipletests(&p_values, options.alpha, options.correction)?;
    for ((comparison, adjusted), reject) in comparisons
        .iter_mut()
        .zip(&corrected.adjusted)
        .zip(&corrected.reject)
    {
        comparison.adjusted_p_value = *adjusted;
        comparison.reject = *reject;
    }
    Ok(corrected)
}
