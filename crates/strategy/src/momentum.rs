use common::TradeSignal;

use crate::SignalStrategy;

/// Follows the last price move: up is Buy, down is Sell, flat or first
/// observation is Hold.
#[derive(Debug, Default, Clone, Copy)]
pub struct MomentumStrategy;

impl SignalStrategy for MomentumStrategy {
    fn name(&self) -> &str {
        "momentum"
    }

    fn signal(&self, previous: Option<f64>, current: f64) -> TradeSignal {
        match previous {
            None => TradeSignal::Hold,
            Some(prev) if current > prev => TradeSignal::Buy,
            Some(prev) if current < prev => TradeSignal::Sell,
            Some(_) => TradeSignal::Hold,
        }
    }
}
