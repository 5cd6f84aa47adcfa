pub mod momentum;
pub mod random;

pub use momentum::MomentumStrategy;
pub use random::RandomStrategy;

use std::sync::Arc;

use tracing::info;

use common::{Error, Result, TradeSignal};

/// All signal strategies must satisfy this trait.
pub trait SignalStrategy: Send + Sync {
    /// Human-readable name shown in logs.
    fn name(&self) -> &str;

    /// Derive a signal from the previously observed price (if any) and the
    /// price just fetched. Must not block.
    fn signal(&self, previous: Option<f64>, current: f64) -> TradeSignal;
}

/// Resolve a strategy by its configured name.
pub fn build_strategy(name: &str) -> Result<Arc<dyn SignalStrategy>> {
    let strategy: Arc<dyn SignalStrategy> = match name.trim().to_lowercase().as_str() {
        "momentum" => Arc::new(MomentumStrategy),
        "random" => Arc::new(RandomStrategy::from_entropy()),
        other => {
            return Err(Error::Config(format!(
                "unknown strategy '{other}', expected 'momentum' or 'random'"
            )))
        }
    };
    info!(strategy = %strategy.name(), "Strategy selected");
    Ok(strategy)
}
