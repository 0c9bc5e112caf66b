//! Pluggable strategy capability.
//!
//! A strategy sees the bar history up to and including `index` and returns
//! a [`Signal`]. The driver only ever passes `&bars[..=index]`, so a strategy
//! cannot look ahead.

use super::ohlcv::Bar;
use super::signal::Signal;

/// Failure raised by a strategy while evaluating one bar.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{reason}")]
pub struct StrategyError {
    pub reason: String,
}

impl StrategyError {
    pub fn new(reason: impl Into<String>) -> Self {
        StrategyError {
            reason: reason.into(),
        }
    }
}

pub trait Strategy {
    /// Identifier recorded on every position this strategy opens.
    fn id(&self) -> &str;

    /// `history.len() == index + 1`.
    fn evaluate(&self, history: &[Bar], index: usize) -> Result<Signal, StrategyError>;
}

impl<S: Strategy + ?Sized> Strategy for Box<S> {
    fn id(&self) -> &str {
        (**self).id()
    }

    fn evaluate(&self, history: &[Bar], index: usize) -> Result<Signal, StrategyError> {
        (**self).evaluate(history, index)
    }
}

/// Adapts a plain function or closure into a [`Strategy`].
pub struct FnStrategy<F> {
    id: String,
    func: F,
}

impl<F> FnStrategy<F>
where
    F: Fn(&[Bar], usize) -> Result<Signal, StrategyError>,
{
    pub fn new(id: impl Into<String>, func: F) -> Self {
        FnStrategy {
            id: id.into(),
            func,
        }
    }
}

impl<F> Strategy for FnStrategy<F>
where
    F: Fn(&[Bar], usize) -> Result<Signal, StrategyError>,
{
    fn id(&self) -> &str {
        &self.id
    }

    fn evaluate(&self, history: &[Bar], index: usize) -> Result<Signal, StrategyError> {
        (self.func)(history, index)
    }
}
