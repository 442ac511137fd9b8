use super::{colorize_verdict, describe, format_p, json_pretty, EXIT_SUCCESS};
use chisq_core::{multipletests, CorrectionMethod, CorrectionResult};
use serde::Serialize;

#[derive(Serialize)]
struct Corrected<'a> {
    p_values: &'a [f64],
    #[serde(flatten)]
    result: &'a CorrectionResult,
}

pub fn run(
    p_values: &[f64],
    method: CorrectionMethod,
    alpha: f64,
    json: bool,
) -> Result<u8, String> {
    let result = multipletests(p_values, alpha, method).map_err(describe)?;

    if json {
        let payload = Corrected {
            p_values,
            result: &result,
        };
        println!("{}", json_pretty(&payload)?);
        return Ok(EXIT_SUCCESS);
    }

    println!("{} ({}), alpha = {alpha}", method, method.describe());
    println!("  {:>3}  {:>10}  {:>10}", "#", "p", "adjusted");
    for (i, ((p, adjusted), reject)) in p_values
        .iter()
        .zip(&result.adjusted)
        .zip(&result.reject)
        .enumerate()
    {
        println!(
            "  {:>3}  {:>10}  {:>10}  {}",
            i + 1,
            format_p(*p),
            format_p(*adjusted),
            colorize_verdict(*reject)
        );
    }
    println!(
        "{} of {} rejected; per-test alpha: bonferroni {}, sidak {}",
        result.rejected(),
        p_values.len(),
        format_p(result.alpha_bonferroni),
        format_p(result.alpha_sidak)
    );
    Ok(EXIT_SUCCESS)
}
