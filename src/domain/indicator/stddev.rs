//! Standard Deviation indicator.
//!
//! Population standard deviation over n closing prices.
//! STDDEV(n)[i] = sqrt(sum((C[i-j] - SMA(n)[i])^2 for j in 0..n-1) / n)
//! Warmup: first (n-1) bars are invalid.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType};
use crate::domain::ohlcv::Bar;

/// Population standard deviation of `values`; 0 for an empty slice.
pub fn population_stddev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    variance.sqrt()
}

pub fn calculate_stddev(bars: &[Bar], period: usize) -> IndicatorSeries {
    if period == 0 {
        return IndicatorSeries {
            indicator_type: IndicatorType::Stddev(period),
            values: Vec::new(),
        };
    }

    let warmup = period - 1;
    let values = bars
        .iter()
        .enumerate()
        .map(|(i, bar)| {
            let valid = i >= warmup;
            let value = if valid {
                let closes: Vec<f64> = bars[i + 1 - period..=i].iter().map(|b| b.close).collect();
                population_stddev(&closes)
            } else {
                0.0
            };
            IndicatorPoint {
                timestamp: bar.timestamp,
                valid,
                value,
            }
        })
        .collect();

    IndicatorSeries {
        indicator_type: IndicatorType::Stddev(period),
        values,
    }
}
