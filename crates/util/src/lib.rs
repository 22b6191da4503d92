//! Shared utilities for the intake pipeline.

pub mod config;

pub use config::{CONFIG_PATH_ENV, CheckoutSettings, ConfigError, IntakeConfig, default_config_path, expand_tilde};
