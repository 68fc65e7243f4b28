//! Configuration loading and application.
mod apply;
mod loader;
pub mod types;

#[cfg(test)]
mod tests;

pub use apply::apply_config;
pub use loader::{LoadedConfig, load_config};

#[cfg(test)]
pub(crate) use loader::{find_default_config, load_config_file};
