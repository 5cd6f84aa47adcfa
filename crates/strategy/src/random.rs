use std::sync::Mutex;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use common::TradeSignal;

use crate::SignalStrategy;

const BUY_BELOW: f64 = 0.2;
const SELL_BELOW: f64 = 0.4;

/// Emits Buy about 20% of the time, Sell about 20%, Hold otherwise.
/// Prices are ignored.
pub struct RandomStrategy {
    rng: Mutex<StdRng>,
}

impl RandomStrategy {
    /// Deterministic generator, for tests and reproducible runs.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    pub fn from_entropy() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    fn classify(draw: f64) -> TradeSignal {
        if draw < BUY_BELOW {
            TradeSignal::Buy
        } else if draw < SELL_BELOW {
            TradeSignal::Sell
        } else {
            TradeSignal::Hold
        }
    }
}

impl SignalStrategy for RandomStrategy {
    fn name(&self) -> &str {
        "random"
    }

    fn signal(&self, _previous: Option<f64>, _current: f64) -> TradeSignal {
        // A poisoned lock still holds a usable generator.
        let mut rng = self.rng.lock().unwrap_or_else(|p| p.into_inner());
        Self::classify(rng.gen::<f64>())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thresholds_partition_the_unit_interval() {
        assert_eq!(RandomStrategy::classify(0.0), TradeSignal::Buy);
        assert_eq!(RandomStrategy::classify(0.19), TradeSignal::Buy);
        assert_eq!(RandomStrategy::classify(0.2), TradeSignal::Sell);
        assert_eq!(RandomStrategy::classify(0.39), TradeSignal::Sell);
        assert_eq!(RandomStrategy::classify(0.4), TradeSignal::Hold);
        assert_eq!(RandomStrategy::classify(0.99), TradeSignal::Hold);
    }

    #[test]
    fn same_seed_gives_same_sequence() {
        let a = RandomStrategy::seeded(7);
        let b = RandomStrategy::seeded(7);
        for _ in 0..64 {
            assert_eq!(a.signal(None, 1.0), b.signal(Some(1.0), 2.0));
        }
    }
}
