//! Blue/Green Failover Watcher Library

pub mod admin;
pub mod alert;
pub mod config;
pub mod engine;
pub mod failover;
pub mod health;
pub mod lifecycle;
pub mod observability;
pub mod resilience;
pub mod source;
pub mod window;

pub use config::WatcherConfig;
pub use engine::Engine;
pub use lifecycle::Shutdown;
