//! Multiple-comparison corrections for a family of p-values.
//!
//! Every method returns adjusted p-values in the caller's order, clipped to
//! `[0, 1]`; a hypothesis is rejected when its adjusted p-value is at most
//! `alpha`. Step-wise methods work on the ascending order of the raw p-values.

use crate::CoreError;
use chisq_schema::CorrectionMethod;
use serde::Serialize;
use std::cmp::Ordering;

/// Adjusted p-values and rejection decisions for one family of tests.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CorrectionResult {
    pub method: CorrectionMethod,
    pub alpha: f64,
    pub adjusted: Vec<f64>,
    pub reject: Vec<bool>,
    /// Per-test significance level under Sidak: `1 - (1 - alpha)^(1/m)`.
    pub alpha_sidak: f64,
    /// Per-test significance level under Bonferroni: `alpha / m`.
    pub alpha_bonferroni: f64,
}

impl CorrectionResult {
    pub fn rejected(&self) -> usize {
        self.reject.iter().filter(|r| **r).count()
    }
}

/// Adjust `p_values` and decide rejections at level `alpha`.
pub fn multipletests(
    p_values: &[f64],
    alpha: f64,
    method: CorrectionMethod,
) -> Result<CorrectionResult, CoreError> {
    if !(alpha > 0.0 && alpha < 1.0) {
        return Err(CoreError::InvalidAlpha(alpha));
    }
    let adjusted = adjust(p_values, method)?;
    let reject = adjusted.iter().map(|&p| p <= alpha).collect();

    let m = p_values.len().max(1) as f64;
    Ok(CorrectionResult {
        method,
        alpha,
        adjusted,
        reject,
        alpha_sidak: -(m.recip() * (-alpha).ln_1p()).exp_m1(),
        alpha_bonferroni: alpha / m,
    })
}

/// Adjusted p-values for `p_values` under `method`, in input order.
pub fn adjust(p_values: &[f64], method: CorrectionMethod) -> Result<Vec<f64>, CoreError> {
    for (index, &value) in p_values.iter().enumerate() {
        if !(0.0..=1.0).contains(&value) {
            return Err(CoreError::InvalidPValue { index, value });
        }
    }
    if p_values.is_empty() {
        return Ok(Vec::new());
    }

    let m = p_values.len();
    let mf = m as f64;

    let adjusted = match method {
        CorrectionMethod::None => p_values.to_vec(),
        CorrectionMethod::Bonferroni => p_values.iter().map(|p| p * mf).collect(),
        CorrectionMethod::Sidak => p_values.iter().map(|&p| sidak(p, mf)).collect(),
        CorrectionMethod::Holm => step_down(p_values, |p, rank| p * (m - rank) as f64),
        CorrectionMethod::HolmSidak => step_down(p_values, |p, rank| sidak(p, (m - rank) as f64)),
        CorrectionMethod::Hochberg => step_up(p_values, |p, rank| p * (m - rank) as f64),
        CorrectionMethod::FdrBh => step_up(p_values, |p, rank| p * mf / (rank + 1) as f64),
        CorrectionMethod::FdrBy => {
            let cm: f64 = (1..=m).map(|k| 1.0 / k as f64).sum();
            step_up(p_values, |p, rank| p * mf * cm / (rank + 1) as f64)
        }
        CorrectionMethod::Hommel => hommel(p_values),
    };

    Ok(adjusted.into_iter().map(|p| p.clamp(0.0, 1.0)).collect())
}

fn sidak(p: f64, m: f64) -> f64 {
    -(m * (-p).ln_1p()).exp_m1()
}

fn ascending_order(p_values: &[f64]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..p_values.len()).collect();
    order.sort_by(|&a, &b| {
        p_values[a]
            .partial_cmp(&p_values[b])
            .unwrap_or(Ordering::Equal)
    });
    order
}

fn scatter(order: &[usize], sorted_values: Vec<f64>) -> Vec<f64> {
    let mut out = vec![0.0; order.len()];
    for (value, &index) in sorted_values.into_iter().zip(order) {
        out[index] = value;
    }
    out
}

/// Running maximum over the ascending ranks of `raw(p, rank)`.
fn step_down(p_values: &[f64], raw: impl Fn(f64, usize) -> f64) -> Vec<f64> {
    let order = ascending_order(p_values);
    let mut running = f64::NEG_INFINITY;
    let sorted: Vec<f64> = order
        .iter()
        .enumerate()
        .map(|(rank, &i)| {
            running = running.max(raw(p_values[i], rank));
            running
        })
        .collect();
    scatter(&order, sorted)
}

/// Running minimum from the largest rank down of `raw(p, rank)`.
fn step_up(p_values: &[f64], raw: impl Fn(f64, usize) -> f64) -> Vec<f64> {
    let order = ascending_order(p_values);
    let mut sorted: Vec<f64> = order
        .iter()
        .enumerate()
        .map(|(rank, &i)| raw(p_values[i], rank))
        .collect();
    for rank in (0..sorted.len().saturating_sub(1)).rev() {
        sorted[rank] = sorted[rank].min(sorted[rank + 1]);
    }
    scatter(&order, sorted)
}

/// Hommel's closed-testing adjustment.
fn hommel(p_values: &[f64]) -> Vec<f64> {
    let order = ascending_order(p_values);
    let p: Vec<f64> = order.iter().map(|&i| p_values[i]).collect();
    let n = p.len();
    let mut a = p.clone();

    for m in (2..=n).rev() {
        let start = n - m;
        let mf = m as f64;
        let cim = (0..m)
            .map(|k| mf * p[start + k] / (k + 1) as f64)
            .fold(f64::INFINITY, f64::min);
        for value in &mut a[start..] {
            *value = value.max(cim);
        }
        for idx in 0..start {
            a[idx] = a[idx].max((mf * p[idx]).min(cim));
        }
    }

    let sorted = a.iter().zip(&p).map(|(x, y)| x.max(*y)).collect();
    scatter(&order, sorted)
}
