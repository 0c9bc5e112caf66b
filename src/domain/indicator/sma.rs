//! Simple Moving Average.
//!
//! SMA(n)[i] = mean(C[i-n+1..=i]). Warmup: first (n-1) bars are invalid.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType};
use crate::domain::ohlcv::Bar;

pub fn calculate_sma(bars: &[Bar], period: usize) -> IndicatorSeries {
    if period == 0 {
        return IndicatorSeries {
            indicator_type: IndicatorType::Sma(period),
            values: Vec::new(),
        };
    }

    let mut values = Vec::with_capacity(bars.len());
    let mut sum = 0.0;

    for (i, bar) in bars.iter().enumerate() {
        sum += bar.close;
        if i >= period {
            sum -= bars[i - period].close;
        }
        let valid = i + 1 >= period;
        values.push(IndicatorPoint {
            timestamp: bar.timestamp,
            valid,
            value: if valid { sum / period as f64 } else { 0.0 },
        });
    }

    IndicatorSeries {
        indicator_type: IndicatorType::Sma(period),
        values,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::test_bars::from_closes;

    #[test]
    fn sma_warmup() {
        let series = calculate_sma(&from_closes(&[1.0, 2.0, 3.0, 4.0]), 3);
        assert!(!series.values[0].valid);
        assert!(!series.values[1].valid);
        assert!(series.values[2].valid);
        assert!(series.values[3].valid);
    }

    #[test]
    fn sma_rolling_values() {
        let series = calculate_sma(&from_closes(&[1.0, 2.0, 3.0, 4.0, 5.0]), 3);
        assert!((series.values[2].value - 2.0).abs() < 1e-12);
        assert!((series.values[3].value - 3.0).abs() < 1e-12);
        assert!((series.values[4].value - 4.0).abs() < 1e-12);
    }

    #[test]
    fn sma_period_0() {
        let series = calculate_sma(&from_closes(&[1.0, 2.0]), 0);
        assert!(series.values.is_empty());
    }

    #[test]
    fn sma_indicator_type() {
        let series = calculate_sma(&from_closes(&[1.0]), 20);
        assert_eq!(series.indicator_type, IndicatorType::Sma(20));
        assert!(!series.values[0].valid);
    }
}
