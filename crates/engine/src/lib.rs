pub mod controller;
pub mod event_log;
pub mod upbit;
mod worker;

pub use controller::EngineController;
pub use event_log::EventLog;
pub use upbit::UpbitClient;
