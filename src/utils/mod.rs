//! Shared utilities: configuration loading.

pub mod toml_config;
