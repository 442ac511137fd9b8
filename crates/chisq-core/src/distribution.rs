//! Tail probabilities used by the tests, on top of `statrs`.

use crate::CoreError;
use statrs::distribution::{ChiSquared, ContinuousCDF, Normal};

/// Upper-tail probability `P(X >= x)` of a chi-square distribution with `dof` degrees of freedom.
pub fn chi2_sf(x: f64, dof: usize) -> Result<f64, CoreError> {
    if dof == 0 {
        return Err(CoreError::Distribution(
            "chi-square distribution needs at least 1 degree of freedom".to_owned(),
        ));
    }
    if x.is_nan() {
        return Err(CoreError::Distribution("chi-square statistic is NaN".to_owned()));
    }
    if x <= 0.0 {
        return Ok(1.0);
    }
    let dist = ChiSquared::new(dof as f64).map_err(|e| CoreError::Distribution(e.to_string()))?;
    Ok(dist.sf(x).clamp(0.0, 1.0))
}

/// Two-sided p-value of a standard normal deviate.
pub fn normal_two_sided_p(z: f64) -> Result<f64, CoreError> {
    if z.is_nan() {
        return Err(CoreError::Distribution("normal deviate is NaN".to_owned()));
    }
    let dist = Normal::new(0.0, 1.0).map_err(|e| CoreError::Distribution(e.to_string()))?;
    Ok((2.0 * dist.sf(z.abs())).clamp(0.0, 1.0))
}
