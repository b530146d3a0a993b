//! Configuration module for the Switchboard runtime.
//!
//! This module provides layered (defaults, files, environment, overrides)
//! configuration loading and validation for the engine and its logging.

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::ConfigLoader;
pub use schema::{EngineConfig, LogFormat, LogLevel, LogOutput, LoggingConfig, SpanEventConfig};
pub use validation::validate_config;
