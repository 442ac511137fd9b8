use super::{colorize_verdict, describe, format_p, json_pretty, EXIT_SUCCESS};
use chisq_core::{
    category_residuals, goodness_of_fit, CategoryResidual, CorrectionMethod, Expected,
    GoodnessOfFitResult, Statistic,
};
use console::Style;
use serde::Serialize;

#[derive(Debug, Clone)]
pub struct GofRequest {
    pub observed: Vec<u64>,
    pub expected: Option<Vec<f64>>,
    pub proportions: bool,
    pub labels: Option<Vec<String>>,
    pub ddof: usize,
    pub statistic: Statistic,
    pub correction: CorrectionMethod,
    pub alpha: f64,
}

#[derive(Debug, Serialize)]
struct GofReport {
    test: GoodnessOfFitResult,
    significant: bool,
    correction: CorrectionMethod,
    alpha: f64,
    residuals: Vec<CategoryResidual>,
}

fn evaluate(request: &GofRequest) -> Result<GofReport, String> {
    let expected = match (&request.expected, request.proportions) {
        (None, _) => Expected::Uniform,
        (Some(values), false) => Expected::Counts(values.clone()),
        (Some(values), true) => Expected::Proportions(values.clone()),
    };
    let labels = request.labels.clone().unwrap_or_else(|| {
        (1..=request.observed.len())
            .map(|i| format!("#{i}"))
            .collect()
    });

    let test = goodness_of_fit(&request.observed, &expected, request.ddof, request.statistic)
        .map_err(describe)?;
    let residuals = category_residuals(&test, &labels, request.correction, request.alpha)
        .map_err(describe)?;
    Ok(GofReport {
        significant: test.p_value <= request.alpha,
        test,
        correction: request.correction,
        alpha: request.alpha,
        residuals,
    })
}

pub fn run(request: &GofRequest, json: bool) -> Result<u8, String> {
    let report = evaluate(request)?;
    if json {
        println!("{}", json_pretty(&report)?);
        return Ok(EXIT_SUCCESS);
    }

    let bold = Style::new().bold();
    let verdict = if report.significant {
        Style::new().green().bold().apply_to("significant").to_string()
    } else {
        Style::new().dim().apply_to("not significant").to_string()
    };
    println!(
        "{} {} = {:.4}, dof = {}, p = {}  {verdict}",
        bold.apply_to("goodness of fit:"),
        report.test.statistic_kind,
        report.test.statistic,
        report.test.dof,
        format_p(report.test.p_value)
    );
    println!(
        "{} {} at alpha {}",
        bold.apply_to("residuals:"),
        report.correction,
        report.alpha
    );
    let width = report
        .residuals
        .iter()
        .map(|r| r.category.len())
        .max()
        .unwrap_or(0);
    for r in &report.residuals {
        println!(
            "  {:<width$}  obs {:>6}  exp {:>9.2}  z {:>8.3}  p {:>10}  adj {:>10}  {}",
            r.category,
            r.observed,
            r.expected,
            r.residual,
            format_p(r.p_value),
            format_p(r.adjusted_p_value),
            colorize_verdict(r.reject)
        );
    }
    Ok(EXIT_SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(observed: &[u64]) -> GofRequest {
        GofRequest {
            observed: observed.to_vec(),
            expected: None,
            proportions: false,
            labels: None,
            ddof: 0,
            statistic: Statistic::Pearson,
            correction: CorrectionMethod::Bonferroni,
            alpha: 0.05,
        }
    }

    #[test]
    fn uniform_with_default_labels() {
        let report = evaluate(&request(&[30, 10, 20])).unwrap();
        assert!(report.significant);
        assert_eq!(report.residuals[0].category, "#1");
        assert!(report.residuals[0].reject);
        assert!(!report.residuals[2].reject);
    }

    #[test]
    fn proportions_are_scaled_to_counts() {
        let report = evaluate(&GofRequest {
            expected: Some(vec![0.5, 0.25, 0.25]),
            proportions: true,
            ..request(&[50, 25, 25])
        })
        .unwrap();
        assert_eq!(report.test.expected, vec![50.0, 25.0, 25.0]);
        assert!(!report.significant);
    }

    #[test]
    fn mismatched_expected_sum_is_a_data_error() {
        let err = evaluate(&GofRequest {
            expected: Some(vec![10.0, 10.0, 10.0]),
            ..request(&[30, 10, 20])
        })
        .unwrap_err();
        assert!(err.starts_with("data error:"), "{err}");
    }
}
