use anyhow::Result;

use medscout_config::MedscoutConfig;

/// Print the effective configuration, after file loading and env overrides.
pub fn handle_config(config: &MedscoutConfig) -> Result<()> {
    print!("{}", medscout_config::to_toml_string(config)?);
    Ok(())
}
