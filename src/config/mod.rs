//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, path from CLI or AGRIDATUM_CONFIG)
//!     → loader.rs (parse & deserialize, environment overrides)
//!     → validation.rs (semantic checks)
//!     → AgriConfig (validated, immutable)
//!     → shared via Arc to all subsystems
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - The wallet mnemonic is never part of the file; it is read from the
//!   environment by the wallet itself

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, load_or_default, ConfigError};
pub use schema::{
    AgriConfig, AnchoringConfig, ChainConfig, ListenerConfig, LogFormat, ObservabilityConfig,
    StorageConfig, TimeoutConfig,
};
