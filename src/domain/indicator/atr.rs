//! Average True Range with Wilder smoothing.
//!
//! Seed: mean of the first n true ranges (the first bar uses high - low).
//! Then ATR[i] = (ATR[i-1] * (n-1) + TR[i]) / n.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType};
use crate::domain::ohlcv::Bar;

pub fn calculate_atr(bars: &[Bar], period: usize) -> IndicatorSeries {
    if bars.len() < period || period == 0 {
        return IndicatorSeries {
            indicator_type: IndicatorType::Atr(period),
            values: vec![],
        };
    }

    let tr_values: Vec<f64> = bars
        .iter()
        .enumerate()
        .map(|(i, bar)| {
            if i == 0 {
                bar.high - bar.low
            } else {
                bar.true_range(bars[i - 1].close)
            }
        })
        .collect();

    let mut results: Vec<IndicatorPoint> = Vec::with_capacity(bars.len());
    let mut atr = 0.0;

    for (i, bar) in bars.iter().enumerate() {
        if i < period - 1 {
            results.push(IndicatorPoint {
                timestamp: bar.timestamp,
                valid: false,
                value: 0.0,
            });
            continue;
        }

        atr = if i == period - 1 {
            tr_values[0..=i].iter().sum::<f64>() / period as f64
        } else {
            (atr * (period - 1) as f64 + tr_values[i]) / period as f64
        };
        results.push(IndicatorPoint {
            timestamp: bar.timestamp,
            valid: true,
            value: atr,
        });
    }

    IndicatorSeries {
        indicator_type: IndicatorType::Atr(period),
        values: results,
    }
}
