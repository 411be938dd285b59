//! Configuration loading and env substitution.
//!
//! Config files: `medscout.toml`, `medscout.yaml`, or `medscout.json`
//! Searched in `./` then `~/.config/medscout/`.
//!
//! Supports `${ENV_VAR}` substitution in all string values.

pub mod env_subst;
pub mod loader;
pub mod schema;

pub use {
    loader::{
        apply_env_overrides, config_dir, discover_and_load, load_config, resolve_config,
        to_toml_string,
    },
    schema::{BrowserConfig, DiscoveryConfig, MedscoutConfig, SelectorsConfig, ServerConfig},
};
