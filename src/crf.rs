use crate::error::{Error, Result};

/// Capital recovery factor: the share of a present-value investment paid back
/// every year so that `lifetime` equal payments repay it at `discount_rate`.
///
/// A zero rate degenerates to straight-line repayment, `1 / lifetime`.
pub fn capital_recovery_factor(discount_rate: f64, lifetime: u32) -> Result<f64> {
    if lifetime == 0 {
        return Err(Error::InvalidParameter {
            name: "asset lifetime",
            reason: "must be at least one year".to_string(),
        });
    }
    if !discount_rate.is_finite() || discount_rate < 0.0 {
        return Err(Error::InvalidParameter {
            name: "discount rate",
            reason: format!("must be a non-negative fraction, got {discount_rate}"),
        });
    }

    if discount_rate == 0.0 {
        return Ok(1.0 / f64::from(lifetime));
    }

    // (1 + r)^n - 1 without cancellation for rates close to zero
    let excess = (f64::from(lifetime) * discount_rate.ln_1p()).exp_m1();
    if excess == 0.0 {
        return Ok(1.0 / f64::from(lifetime));
    }
    Ok(discount_rate * (excess + 1.0) / excess)
}

#[cfg(test)]
mod tests {
    use float_cmp::assert_approx_eq;

    use super::*;

    #[test]
    fn zero_rate_is_straight_line() {
        for n in [1, 4, 15, 40] {
            assert_eq!(capital_recovery_factor(0.0, n).unwrap(), 1.0 / f64::from(n));
        }
    }

    #[test]
    fn five_percent_over_ten_years() {
        let crf = capital_recovery_factor(0.05, 10).unwrap();
        assert_approx_eq!(f64, crf, 0.129_504_574_965_46, epsilon = 1e-12);
    }

    #[test]
    fn single_year_repays_principal_plus_interest() {
        let crf = capital_recovery_factor(0.0639, 1).unwrap();
        assert_approx_eq!(f64, crf, 1.0639, epsilon = 1e-12);
    }

    #[test]
    fn tiny_rate_approaches_straight_line() {
        for rate in [1e-17, 1e-12, f64::MIN_POSITIVE] {
            let crf = capital_recovery_factor(rate, 10).unwrap();
            assert!(crf.is_finite(), "rate {rate}");
            assert_approx_eq!(f64, crf, 0.1, epsilon = 1e-9);
        }
    }

    #[test]
    fn is_deterministic() {
        let first = capital_recovery_factor(0.0639, 15).unwrap();
        assert_eq!(first, capital_recovery_factor(0.0639, 15).unwrap());
    }

    #[test]
    fn rejects_zero_lifetime() {
        assert!(matches!(
            capital_recovery_factor(0.05, 0),
            Err(Error::InvalidParameter { name: "asset lifetime", .. })
        ));
    }

    #[test]
    fn rejects_negative_or_nan_rate() {
        for rate in [-0.01, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                capital_recovery_factor(rate, 10),
                Err(Error::InvalidParameter { name: "discount rate", .. })
            ));
        }
    }
}
