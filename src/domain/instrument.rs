//! Instrument contract specification: pip size, pip value and lot limits.

use serde::Serialize;

pub const DEFAULT_PIP_SIZE: f64 = 0.0001;
pub const JPY_PIP_SIZE: f64 = 0.01;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstrumentSpec {
    pub symbol: String,
    /// Price delta of one pip.
    pub pip_size: f64,
    /// Account-currency value of one pip for one standard lot.
    pub pip_value: f64,
    pub min_lot: f64,
    pub max_lot: f64,
    pub lot_step: f64,
}

impl InstrumentSpec {
    /// Spec with the conventional pip size for `symbol` (0.01 for JPY-quoted
    /// pairs, 0.0001 otherwise) and standard-lot defaults.
    pub fn for_symbol(symbol: &str) -> Self {
        InstrumentSpec {
            symbol: symbol.to_string(),
            pip_size: pip_size_for(symbol),
            pip_value: 10.0,
            min_lot: 0.01,
            max_lot: 1.0,
            lot_step: 0.01,
        }
    }

    pub fn to_pips(&self, price_delta: f64) -> f64 {
        price_delta / self.pip_size
    }

    /// Round `raw` down to the lot step, then clamp to `[min_lot, max_lot]`.
    pub fn normalize_lots(&self, raw: f64) -> f64 {
        let stepped = if self.lot_step > 0.0 {
            ((raw / self.lot_step) + 1e-9).floor() * self.lot_step
        } else {
            raw
        };
        stepped.clamp(self.min_lot, self.max_lot)
    }
}

impl Default for InstrumentSpec {
    fn default() -> Self {
        InstrumentSpec::for_symbol("EURUSD")
    }
}

/// Quote currency JPY means two-decimal pricing.
pub fn pip_size_for(symbol: &str) -> f64 {
    let upper = symbol.to_ascii_uppercase();
    if upper.get(3..6) == Some("JPY") {
        JPY_PIP_SIZE
    } else {
        DEFAULT_PIP_SIZE
    }
}
