pub mod config;
pub mod error;
pub mod price;
pub mod sink;
pub mod types;

pub use config::{Config, EngineConfig, DEFAULT_UPBIT_BASE_URL};
pub use error::{Error, FetchError, Result};
pub use price::PriceSource;
pub use sink::{EventSink, NullSink};
pub use types::*;
