use async_trait::async_trait;

use crate::FetchError;

/// Source of the current price for a market.
///
/// `UpbitClient` implements this against the public ticker API. Tests plug in
/// scripted sources. Implementations must bound every call with a timeout.
#[async_trait]
pub trait PriceSource: Send + Sync {
    async fn fetch(&self, market: &str) -> Result<f64, FetchError>;
}
