//! Miscellaneous helper utilities.

use crate::models::Precision;
use bigdecimal::BigDecimal;
use std::str::FromStr;
use tracing_subscriber::{EnvFilter, fmt};

/// Initialize `tracing` subscriber with env-based filter.
///
/// If `RUST_LOG` is not set, defaults to `info` level.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Canonical "BASE/QUOTE" market symbol.
pub fn format_symbol(base: &str, quote: &str) -> String {
    format!("{}/{}", base, quote)
}

/// How a value is brought onto the exchange's precision grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundingMode {
    /// Toward zero.
    Truncate,
    /// Half away from zero.
    Round,
}

impl RoundingMode {
    fn as_bigdecimal(self) -> bigdecimal::RoundingMode {
        match self {
            RoundingMode::Truncate => bigdecimal::RoundingMode::Down,
            RoundingMode::Round => bigdecimal::RoundingMode::HalfUp,
        }
    }
}

/// Rounds `value` to the given precision using decimal arithmetic, so that
/// e.g. 0.1 + 0.2 style float noise does not leak into order sizes.
///
/// Non-finite inputs and non-positive steps collapse to 0.0, which callers
/// treat as an unusable value.
pub fn round_to_precision(value: f64, precision: Precision, mode: RoundingMode) -> f64 {
    if !value.is_finite() {
        return 0.0;
    }
    let Ok(v) = BigDecimal::from_str(&value.to_string()) else {
        return 0.0;
    };
    let rounded = match precision {
        Precision::Decimals(places) => v.with_scale_round(places as i64, mode.as_bigdecimal()),
        Precision::Step(step) => {
            if !(step.is_finite() && step > 0.0) {
                return 0.0;
            }
            let Ok(step) = BigDecimal::from_str(&step.to_string()) else {
                return 0.0;
            };
            let lots = (&v / &step).with_scale_round(0, mode.as_bigdecimal());
            lots * step
        }
    };
    rounded.to_string().parse().unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_symbol_with_slash() {
        assert_eq!(format_symbol("ETH", "USDT"), "ETH/USDT");
    }

    #[test]
    fn truncates_to_decimal_places() {
        let v = round_to_precision(0.123_456_789, Precision::Decimals(4), RoundingMode::Truncate);
        assert_eq!(v, 0.1234);
        let r = round_to_precision(0.123_46, Precision::Decimals(4), RoundingMode::Round);
        assert_eq!(r, 0.1235);
    }

    #[test]
    fn snaps_to_step_size() {
        let v = round_to_precision(1.2345, Precision::Step(0.01), RoundingMode::Truncate);
        assert_eq!(v, 1.23);
        let p = round_to_precision(400.07, Precision::Step(0.5), RoundingMode::Round);
        assert_eq!(p, 400.0);
        let q = round_to_precision(400.3, Precision::Step(0.5), RoundingMode::Round);
        assert_eq!(q, 400.5);
    }

    #[test]
    fn below_one_step_truncates_to_zero() {
        let v = round_to_precision(0.0004, Precision::Step(0.001), RoundingMode::Truncate);
        assert_eq!(v, 0.0);
    }

    #[test]
    fn degenerate_inputs_collapse_to_zero() {
        assert_eq!(
            round_to_precision(f64::NAN, Precision::Decimals(2), RoundingMode::Round),
            0.0
        );
        assert_eq!(
            round_to_precision(1.0, Precision::Step(0.0), RoundingMode::Round),
            0.0
        );
    }
}
