//! CLI configuration -- thin wrapper around `wolflink_config`.
//!
//! Adds the `--config` path override and the flag overrides from
//! `GlobalOpts` (--username, --portal-url, --insecure, --timeout).

use std::path::PathBuf;

use wolflink_api::ClientConfig;

use crate::cli::GlobalOpts;
use crate::error::CliError;

pub use wolflink_config::{Config, Defaults, Profile, password_key, KEYRING_SERVICE};

/// Config file in effect: `--config` / `WOLFLINK_CONFIG`, else the platform default.
pub fn config_path(global: &GlobalOpts) -> PathBuf {
    global
        .config
        .clone()
        .unwrap_or_else(wolflink_config::config_path)
}

/// Load the config, falling back to defaults when it is absent or unreadable.
pub fn load_config_or_default(global: &GlobalOpts) -> Config {
    wolflink_config::load_config_from(&config_path(global)).unwrap_or_default()
}

pub fn save_config(cfg: &Config, global: &GlobalOpts) -> Result<(), CliError> {
    wolflink_config::save_config_to(cfg, &config_path(global))?;
    Ok(())
}

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    global
        .profile
        .clone()
        .or_else(|| config.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

/// Apply flag overrides on top of a profile. Flags win.
pub fn apply_overrides(profile: &Profile, global: &GlobalOpts) -> Profile {
    let mut merged = profile.clone();
    if let Some(ref username) = global.username {
        merged.username = Some(username.clone());
    }
    if let Some(ref url) = global.portal_url {
        merged.portal_url = Some(url.clone());
    }
    if global.insecure {
        merged.insecure = Some(true);
    }
    if let Some(timeout) = global.timeout {
        merged.timeout = Some(timeout);
    }
    merged
}

/// Build the `ClientConfig` for portal commands.
///
/// A missing profile is not an error on its own: flags and the
/// `WOLFLINK_USERNAME` / `WOLFLINK_PASSWORD` environment can supply
/// everything.
pub fn build_client_config(global: &GlobalOpts) -> Result<ClientConfig, CliError> {
    let cfg = load_config_or_default(global);
    let profile_name = active_profile_name(global, &cfg);

    if global.profile.is_some() && !cfg.profiles.contains_key(&profile_name) {
        return Err(profile_not_found(&cfg, profile_name));
    }

    let base = cfg.profiles.get(&profile_name).cloned().unwrap_or_default();
    let profile = apply_overrides(&base, global);
    Ok(wolflink_config::profile_to_client_config(
        &profile,
        &profile_name,
        &cfg.defaults,
    )?)
}

pub fn profile_not_found(cfg: &Config, name: String) -> CliError {
    let mut available: Vec<_> = cfg.profiles.keys().cloned().collect();
    available.sort();
    CliError::ProfileNotFound {
        name,
        available: if available.is_empty() {
            "(none)".into()
        } else {
            available.join(", ")
        },
    }
}
