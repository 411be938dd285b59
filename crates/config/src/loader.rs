use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::{env_subst::substitute_env, schema::MedscoutConfig};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &[
    "medscout.toml",
    "medscout.yaml",
    "medscout.yml",
    "medscout.json",
];

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> anyhow::Result<MedscoutConfig> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
    let raw = substitute_env(&raw);
    parse_config(&raw, path)
}

/// Load the config file, then apply environment overrides.
///
/// An explicit `path` must load; otherwise the standard locations are searched:
/// 1. `./medscout.{toml,yaml,yml,json}`
/// 2. `~/.config/medscout/medscout.{toml,yaml,yml,json}`
///
/// Falls back to `MedscoutConfig::default()` when nothing is found or the
/// discovered file is unreadable.
pub fn resolve_config(path: Option<&Path>) -> anyhow::Result<MedscoutConfig> {
    let mut config = match path {
        Some(path) => load_config(path)?,
        None => discover_and_load(),
    };
    apply_env_overrides(&mut config);
    Ok(config)
}

/// Discover and load config from standard locations, without env overrides.
pub fn discover_and_load() -> MedscoutConfig {
    if let Some(path) = find_config_file() {
        debug!(path = %path.display(), "loading config");
        match load_config(&path) {
            Ok(cfg) => return cfg,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
            },
        }
    } else {
        debug!("no config file found, using defaults");
    }
    MedscoutConfig::default()
}

/// Returns the user-global config directory (`~/.config/medscout/`).
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "medscout").map(|d| d.config_dir().to_path_buf())
}

fn find_config_file() -> Option<PathBuf> {
    let local = CONFIG_FILENAMES.iter().map(PathBuf::from);
    let global = config_dir()
        .into_iter()
        .flat_map(|dir| CONFIG_FILENAMES.iter().map(move |name| dir.join(name)));
    local.chain(global).find(|p| p.exists())
}

/// Override config values from `MEDSCOUT_*` environment variables.
///
/// - `MEDSCOUT_BROWSER_HOST` / `MEDSCOUT_BROWSER_PORT`: remote DevTools endpoint
/// - `MEDSCOUT_BIND` / `MEDSCOUT_PORT`: HTTP responder address
pub fn apply_env_overrides(config: &mut MedscoutConfig) {
    apply_overrides_with(config, |name| std::env::var(name).ok());
}

fn apply_overrides_with(config: &mut MedscoutConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(host) = lookup("MEDSCOUT_BROWSER_HOST").filter(|h| !h.is_empty()) {
        config.browser.host = host;
    }
    if let Some(port) = parse_port(&lookup, "MEDSCOUT_BROWSER_PORT") {
        config.browser.port = port;
    }
    if let Some(bind) = lookup("MEDSCOUT_BIND").filter(|b| !b.is_empty()) {
        config.server.bind = bind;
    }
    if let Some(port) = parse_port(&lookup, "MEDSCOUT_PORT") {
        config.server.port = port;
    }
}

fn parse_port(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<u16> {
    let raw = lookup(name)?;
    match raw.trim().parse() {
        Ok(port) => Some(port),
        Err(e) => {
            warn!(var = name, value = %raw, error = %e, "ignoring invalid port override");
            None
        },
    }
}

/// Render the config as pretty TOML.
pub fn to_toml_string(config: &MedscoutConfig) -> anyhow::Result<String> {
    toml::to_string_pretty(config).map_err(|e| anyhow::anyhow!("serialize config: {e}"))
}

fn parse_config(raw: &str, path: &Path) -> anyhow::Result<MedscoutConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => Ok(toml::from_str(raw)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(raw)?),
        "json" => Ok(serde_json::from_str(raw)?),
        _ => anyhow::bail!("unsupported config format: .{ext}"),
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_each_supported_format() {
        let dir = tempfile::tempdir().unwrap();

        let toml_path = dir.path().join("medscout.toml");
        std::fs::write(&toml_path, "[discovery]\nscroll_budget = 9\n").unwrap();
        assert_eq!(load_config(&toml_path).unwrap().discovery.scroll_budget, 9);

        let yaml_path = dir.path().join("medscout.yaml");
        std::fs::write(&yaml_path, "discovery:\n  wait_seconds: 1.5\n").unwrap();
        assert_eq!(load_config(&yaml_path).unwrap().discovery.wait_seconds, 1.5);

        let json_path = dir.path().join("medscout.json");
        std::fs::write(&json_path, r#"{"server": {"port": 8080}}"#).unwrap();
        assert_eq!(load_config(&json_path).unwrap().server.port, 8080);
    }

    #[test]
    fn rejects_unknown_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("medscout.ini");
        std::fs::write(&path, "x=1").unwrap();
        assert!(load_config(&path).is_err());
    }

    #[test]
    fn explicit_missing_path_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(resolve_config(Some(&dir.path().join("absent.toml"))).is_err());
    }

    #[test]
    fn env_overrides_win_over_file_values() {
        let mut cfg: MedscoutConfig =
            toml::from_str("[browser]\nhost = \"from-file\"\nport = 1111\n").unwrap();
        apply_overrides_with(&mut cfg, |name| match name {
            "MEDSCOUT_BROWSER_HOST" => Some("selenium".into()),
            "MEDSCOUT_BROWSER_PORT" => Some("4444".into()),
            "MEDSCOUT_PORT" => Some("not-a-port".into()),
            _ => None,
        });
        assert_eq!(cfg.browser.host, "selenium");
        assert_eq!(cfg.browser.port, 4444);
        assert_eq!(cfg.server.port, 5000);
    }

    #[test]
    fn renders_toml() {
        let rendered = to_toml_string(&MedscoutConfig::default()).unwrap();
        assert!(rendered.contains("[browser]"));
        assert!(rendered.contains("scroll_budget = 5"));
    }
}
