//! Omnibus chi-square tests: independence on a contingency table and goodness of fit.

use crate::distribution::{chi2_sf, normal_two_sided_p};
use crate::table::ContingencyTable;
use crate::CoreError;
use chisq_schema::Statistic;
use serde::Serialize;

/// Cells with an expected frequency below this are counted as sparse.
pub const LOW_EXPECTED: f64 = 5.0;

const SUM_RTOL: f64 = 1e-8;

/// Outcome of a chi-square test of independence.
#[derive(Debug, Clone, Serialize)]
pub struct ChiSquareResult {
    pub statistic_kind: Statistic,
    pub statistic: f64,
    pub dof: usize,
    pub p_value: f64,
    pub yates_applied: bool,
    /// Cramér's V, from the uncorrected Pearson statistic.
    pub cramers_v: f64,
    pub min_expected: f64,
    pub low_expected_cells: usize,
    pub expected: Vec<Vec<f64>>,
}

impl ChiSquareResult {
    pub fn cells(&self) -> usize {
        self.expected.iter().map(Vec::len).sum()
    }

    /// Fraction of cells whose expected frequency is below [`LOW_EXPECTED`].
    pub fn low_expected_fraction(&self) -> f64 {
        let cells = self.cells();
        if cells == 0 {
            0.0
        } else {
            self.low_expected_cells as f64 / cells as f64
        }
    }
}

/// Chi-square test of independence on a two-way table.
///
/// With `yates` set, the continuity correction is applied only when the
/// table has one degree of freedom: every observed count moves 0.5 toward
/// its expected value, never past it.
pub fn chi2_contingency(
    table: &ContingencyTable,
    statistic: Statistic,
    yates: bool,
) -> Result<ChiSquareResult, CoreError> {
    let expected = table.expected();
    let dof = (table.n_rows() - 1) * (table.n_columns() - 1);
    let yates_applied = yates && dof == 1;

    let observed: Vec<Vec<f64>> = table
        .counts()
        .iter()
        .zip(&expected)
        .map(|(obs_row, exp_row)| {
            obs_row
                .iter()
                .zip(exp_row)
                .map(|(&o, &e)| {
                    let o = o as f64;
                    if yates_applied {
                        continuity_corrected(o, e)
                    } else {
                        o
                    }
                })
                .collect()
        })
        .collect();

    let value = divergence(
        statistic,
        observed.iter().flatten().copied(),
        expected.iter().flatten().copied(),
    );
    let p_value = chi2_sf(value, dof)?;

    let pearson_raw = divergence(
        Statistic::Pearson,
        table.counts().iter().flatten().map(|&o| o as f64),
        expected.iter().flatten().copied(),
    );
    let k = table.n_rows().min(table.n_columns()) as f64;
    let n = table.total() as f64;
    let cramers_v = (pearson_raw / (n * (k - 1.0))).sqrt();

    let min_expected = expected
        .iter()
        .flatten()
        .copied()
        .fold(f64::INFINITY, f64::min);
    let low_expected_cells = expected
        .iter()
        .flatten()
        .filter(|&&e| e < LOW_EXPECTED)
        .count();

    Ok(ChiSquareResult {
        statistic_kind: statistic,
        statistic: value,
        dof,
        p_value,
        yates_applied,
        cramers_v,
        min_expected,
        low_expected_cells,
        expected,
    })
}

fn continuity_corrected(observed: f64, expected: f64) -> f64 {
    let diff = expected - observed;
    observed + diff.signum() * diff.abs().min(0.5)
}

/// Power-divergence statistic for paired observed/expected frequencies.
///
/// Pearson: Σ (o − e)² / e. Log-likelihood: 2 Σ o·ln(o / e), zero cells contribute nothing.
fn divergence(
    statistic: Statistic,
    observed: impl Iterator<Item = f64>,
    expected: impl Iterator<Item = f64>,
) -> f64 {
    observed
        .zip(expected)
        .map(|(o, e)| match statistic {
            Statistic::Pearson => (o - e) * (o - e) / e,
            Statistic::LogLikelihood => {
                if o > 0.0 {
                    2.0 * o * (o / e).ln()
                } else {
                    0.0
                }
            }
        })
        .sum()
}

/// Expected frequencies for a goodness-of-fit test.
#[derive(Debug, Clone, PartialEq)]
pub enum Expected {
    /// Every category equally likely.
    Uniform,
    /// Expected counts; must sum to the observed total.
    Counts(Vec<f64>),
    /// Expected proportions; must sum to 1.
    Proportions(Vec<f64>),
}

/// Outcome of a goodness-of-fit test.
#[derive(Debug, Clone, Serialize)]
pub struct GoodnessOfFitResult {
    pub statistic_kind: Statistic,
    pub statistic: f64,
    pub dof: usize,
    pub p_value: f64,
    pub observed: Vec<u64>,
    pub expected: Vec<f64>,
    /// Standardized residuals `(o − e) / sqrt(e·(1 − e/n))`.
    pub residuals: Vec<f64>,
    /// Two-sided normal p-values of `residuals`, uncorrected.
    pub residual_p_values: Vec<f64>,
}

/// One-way chi-square test of observed counts against expected frequencies.
///
/// `ddof` reduces the degrees of freedom (`k - 1 - ddof`) for parameters
/// estimated from the data.
pub fn goodness_of_fit(
    observed: &[u64],
    expected: &Expected,
    ddof: usize,
    statistic: Statistic,
) -> Result<GoodnessOfFitResult, CoreError> {
    let k = observed.len();
    if k < 2 {
        return Err(CoreError::GoodnessOfFit(format!(
            "need at least 2 categories, found {k}"
        )));
    }
    let n: u64 = observed.iter().sum();
    if n == 0 {
        return Err(CoreError::GoodnessOfFit("observed counts sum to zero".to_owned()));
    }
    let total = n as f64;

    let expected_counts: Vec<f64> = match expected {
        Expected::Uniform => vec![total / k as f64; k],
        Expected::Counts(values) => {
            check_expected_len(values, k)?;
            let sum: f64 = values.iter().sum();
            if (sum - total).abs() > SUM_RTOL * sum.min(total) {
                return Err(CoreError::GoodnessOfFit(format!(
                    "expected counts sum to {sum}, but observed counts sum to {n}"
                )));
            }
            values.clone()
        }
        Expected::Proportions(values) => {
            check_expected_len(values, k)?;
            let sum: f64 = values.iter().sum();
            if (sum - 1.0).abs() > SUM_RTOL {
                return Err(CoreError::GoodnessOfFit(format!(
                    "expected proportions sum to {sum}, not 1"
                )));
            }
            values.iter().map(|p| p * total).collect()
        }
    };

    if let Some((i, e)) = expected_counts
        .iter()
        .enumerate()
        .find(|(_, e)| !(e.is_finite() && **e > 0.0))
    {
        return Err(CoreError::GoodnessOfFit(format!(
            "expected frequency of category {i} must be positive, got {e}"
        )));
    }

    let dof = (k - 1).checked_sub(ddof).filter(|d| *d > 0).ok_or_else(|| {
        CoreError::GoodnessOfFit(format!(
            "ddof {ddof} leaves no degrees of freedom for {k} categories"
        ))
    })?;

    let value = divergence(
        statistic,
        observed.iter().map(|&o| o as f64),
        expected_counts.iter().copied(),
    );
    let p_value = chi2_sf(value, dof)?;

    let residuals: Vec<f64> = observed
        .iter()
        .zip(&expected_counts)
        .map(|(&o, &e)| (o as f64 - e) / (e * (1.0 - e / total)).sqrt())
        .collect();
    let residual_p_values = residuals
        .iter()
        .map(|&z| normal_two_sided_p(z))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(GoodnessOfFitResult {
        statistic_kind: statistic,
        statistic: value,
        dof,
        p_value,
        observed: observed.to_vec(),
        expected: expected_counts,
        residuals,
        residual_p_values,
    })
}

fn check_expected_len(values: &[f64], k: usize) -> Result<(), CoreError> {
    if values.len() == k {
        Ok(())
    } else {
        Err(CoreError::GoodnessOfFit(format!(
            "{} expected values for {k} observed categories",
            values.len()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn table(counts: Vec<Vec<u64>>) -> ContingencyTable {
        let rows = (0..counts.len()).map(|i| format!("r{i}")).collect();
        let columns = (0..counts[0].len()).map(|j| format!("c{j}")).collect();
        ContingencyTable::new(rows, columns, counts).unwrap()
    }

    #[test]
    fn two_by_three_pearson() {
        let t = table(vec![vec![10, 10, 20], vec![20, 20, 20]]);
        let r = chi2_contingency(&t, Statistic::Pearson, true).unwrap();
        assert_eq!(r.dof, 2);
        assert!(!r.yates_applied);
        assert_relative_eq!(r.statistic, 2.777_777_777_777_777_7, max_relative = 1e-12);
        assert_relative_eq!(r.p_value, 0.249_352_208_777_296_2, max_relative = 1e-9);
        assert_eq!(r.expected[0], vec![12.0, 12.0, 16.0]);
    }

    #[test]
    fn two_by_two_yates_correction() {
        let t = table(vec![vec![20, 30], vec![35, 15]]);
        let corrected = chi2_contingency(&t, Statistic::Pearson, true).unwrap();
        assert!(corrected.yates_applied);
        assert_relative_eq!(corrected.statistic, 7.919_191_919_191_919, max_relative = 1e-12);
        assert_relative_eq!(corrected.p_value, 0.004_891_311_452_359_34, max_relative = 1e-8);

        let raw = chi2_contingency(&t, Statistic::Pearson, false).unwrap();
        assert!(!raw.yates_applied);
        assert_relative_eq!(raw.statistic, 9.090_909_090_909_09, max_relative = 1e-12);
        assert_relative_eq!(raw.p_value, 0.002_568_831_527_022_717, max_relative = 1e-8);

        // Cramér's V ignores the continuity correction.
        assert_relative_eq!(corrected.cramers_v, raw.cramers_v);
        assert_relative_eq!(raw.cramers_v, 0.301_511_344_577_763_6, max_relative = 1e-12);
    }

    #[test]
    fn log_likelihood_statistic() {
        let t = table(vec![vec![18, 22, 20], vec![35, 15, 10], vec![28, 20, 12]]);
        let g = chi2_contingency(&t, Statistic::LogLikelihood, true).unwrap();
        assert_eq!(g.dof, 4);
        assert_relative_eq!(g.statistic, 10.854_185_872_919_459, max_relative = 1e-10);
        assert_relative_eq!(g.p_value, 0.028_252_576_843_294_04, max_relative = 1e-8);

        let x2 = chi2_contingency(&t, Statistic::Pearson, true).unwrap();
        assert_relative_eq!(x2.statistic, 10.775_828_460_038_985, max_relative = 1e-10);
        assert_relative_eq!(x2.p_value, 0.029_202_340_275_697_8, max_relative = 1e-8);
        assert_relative_eq!(x2.cramers_v, 0.173_011_146_558_369_55, max_relative = 1e-10);
    }

    #[test]
    fn log_likelihood_with_yates_on_two_by_two() {
        let t = table(vec![vec![20, 30], vec![35, 15]]);
        let g = chi2_contingency(&t, Statistic::LogLikelihood, true).unwrap();
        assert_relative_eq!(g.statistic, 8.031_841_626_663_926, max_relative = 1e-10);
        assert_relative_eq!(g.p_value, 0.004_596_208_356_853_601, max_relative = 1e-8);
    }

    #[test]
    fn yates_moves_each_cell_half_a_unit() {
        // every cell sits one unit away from its expected count
        let t = table(vec![vec![5, 3], vec![4, 0]]);
        let r = chi2_contingency(&t, Statistic::Pearson, true).unwrap();
        assert_relative_eq!(r.statistic, 0.5, max_relative = 1e-12);
        assert_relative_eq!(r.p_value, 0.479_500_122_186_953_5, max_relative = 1e-8);
    }

    #[test]
    fn yates_never_crosses_expected() {
        // every |o - e| is below 0.5, so the corrected table equals the expected one
        let t = table(vec![vec![3, 3], vec![3, 4]]);
        let r = chi2_contingency(&t, Statistic::Pearson, true).unwrap();
        assert!(r.statistic < 1e-20);
        assert_relative_eq!(r.p_value, 1.0, max_relative = 1e-9);
    }

    #[test]
    fn counts_sparse_cells() {
        let t = table(vec![vec![5, 3], vec![4, 0]]);
        let r = chi2_contingency(&t, Statistic::Pearson, false).unwrap();
        assert_relative_eq!(r.min_expected, 1.0);
        assert_eq!(r.low_expected_cells, 3);
        assert_relative_eq!(r.low_expected_fraction(), 0.75);
    }

    #[test]
    fn goodness_of_fit_uniform() {
        let r = goodness_of_fit(
            &[16, 18, 16, 14, 12, 12],
            &Expected::Uniform,
            0,
            Statistic::Pearson,
        )
        .unwrap();
        assert_eq!(r.dof, 5);
        assert_relative_eq!(r.statistic, 2.0, max_relative = 1e-12);
        assert_relative_eq!(r.p_value, 0.849_145_036_084_609_6, max_relative = 1e-9);
        assert_relative_eq!(r.residuals[1], 0.953_462_589_245_592_6, max_relative = 1e-10);
    }

    #[test]
    fn goodness_of_fit_with_expected_counts_and_ddof() {
        let obs = [16, 18, 16, 14, 12, 12];
        let r = goodness_of_fit(
            &obs,
            &Expected::Counts(vec![16.0, 16.0, 16.0, 16.0, 16.0, 8.0]),
            0,
            Statistic::Pearson,
        )
        .unwrap();
        assert_relative_eq!(r.statistic, 3.5, max_relative = 1e-12);
        assert_relative_eq!(r.p_value, 0.623_387_627_749_582, max_relative = 1e-9);

        let r = goodness_of_fit(&obs, &Expected::Uniform, 1, Statistic::Pearson).unwrap();
        assert_eq!(r.dof, 4);
        assert_relative_eq!(r.p_value, 0.735_758_882_342_884_7, max_relative = 1e-9);
    }

    #[test]
    fn goodness_of_fit_proportions() {
        let r = goodness_of_fit(
            &[30, 10, 20],
            &Expected::Proportions(vec![0.25, 0.25, 0.5]),
            0,
            Statistic::Pearson,
        )
        .unwrap();
        assert_eq!(r.expected, vec![15.0, 15.0, 30.0]);

        let g = goodness_of_fit(&[30, 10, 20], &Expected::Uniform, 0, Statistic::LogLikelihood)
            .unwrap();
        assert_relative_eq!(g.statistic, 10.464_962_875_290_956, max_relative = 1e-10);
    }

    #[test]
    fn goodness_of_fit_rejects_bad_input() {
        assert!(goodness_of_fit(&[5], &Expected::Uniform, 0, Statistic::Pearson).is_err());
        assert!(goodness_of_fit(&[0, 0], &Expected::Uniform, 0, Statistic::Pearson).is_err());
        assert!(goodness_of_fit(
            &[5, 5],
            &Expected::Counts(vec![4.0, 4.0]),
            0,
            Statistic::Pearson
        )
        .is_err());
        assert!(goodness_of_fit(
            &[5, 5],
            &Expected::Proportions(vec![0.5, 0.6]),
            0,
            Statistic::Pearson
        )
        .is_err());
        assert!(goodness_of_fit(
            &[5, 5, 0],
            &Expected::Counts(vec![5.0, 5.0, 0.0]),
            0,
            Statistic::Pearson
        )
        .is_err());
        assert!(goodness_of_fit(&[5, 5], &Expected::Uniform, 1, Statistic::Pearson).is_err());
    }

    #[test]
    fn goodness_of_fit_error_is_data_error() {
        let err = goodness_of_fit(&[5], &Expected::Uniform, 0, Statistic::Pearson).unwrap_err();
        assert!(err.to_string().starts_with("data error:"));
    }
}
