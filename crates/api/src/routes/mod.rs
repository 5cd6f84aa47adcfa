mod engine;
mod health;
mod logs;

pub use engine::engine_router;
pub use health::health_router;
pub use logs::logs_router;
