//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize, env overrides)
//!     → validation.rs (semantic checks)
//!     → WatcherConfig (validated, immutable)
//!     → shared via Arc to all subsystems
//!
//! On file change:
//!     reload.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → atomic swap of Arc<WatcherConfig>
//!     → next evaluation tick observes new tunables
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - Pool topology is fixed for the process lifetime; a reload that
//!   changes pool names or addresses is rejected, only tunables apply

pub mod loader;
pub mod reload;
pub mod schema;
pub mod validation;

pub use schema::WatcherConfig;
pub use schema::{
    AccessLogConfig, AdminConfig, AlertConfig, ControlConfig, FailoverConfig, HealthCheckConfig,
    ObservabilityConfig, PoolConfig, PoolsConfig, WindowConfig,
};
