//! CLI configuration: thin wrapper around `bmsdash_config` shared types.
//!
//! Adds resolution that respects `GlobalOpts` flag overrides
//! (--api-url, --insecure, --timeout).

use bmsdash_core::DashboardConfig;

use crate::cli::GlobalOpts;
use crate::error::CliError;

pub use bmsdash_config::{Config, Profile, config_path, load_config, save_config};

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    config.profile_name(global.profile.as_deref()).to_owned()
}

/// Build a `DashboardConfig` from the config file, profile, and CLI overrides.
///
/// `--api-url` alone is enough; without it the named profile must exist.
pub fn resolve_dashboard_config(
    global: &GlobalOpts,
    config: &Config,
    profile_name: &str,
) -> Result<DashboardConfig, CliError> {
    let mut profile = match config.profiles.get(profile_name) {
        Some(profile) => profile.clone(),
        None if global.api_url.is_some() => Profile::default(),
        None if global.profile.is_some() => {
            let mut names: Vec<_> = config.profiles.keys().cloned().collect();
            names.sort();
            return Err(CliError::ProfileNotFound {
                name: profile_name.into(),
                available: if names.is_empty() {
                    "(none)".into()
                } else {
                    names.join(", ")
                },
            });
        }
        None => {
            return Err(CliError::NoConfig {
                path: config_path().display().to_string(),
            });
        }
    };

    // Flag > env > profile
    if let Some(ref url) = global.api_url {
        profile.api_url.clone_from(url);
    }
    if global.insecure {
        profile.insecure = Some(true);
    }
    if global.timeout.is_some() {
        profile.timeout = global.timeout;
    }

    Ok(bmsdash_config::profile_to_dashboard_config(
        &profile,
        &config.defaults,
    )?)
}
