pub mod config;
pub mod session;
pub mod stats;

use standcue_core::{AppConfig, Profile};

/// `--profile` if given, otherwise the configured default.
pub(crate) fn resolve_profile(
    flag: Option<&str>,
    app: &AppConfig,
) -> Result<Profile, Box<dyn std::error::Error>> {
    match flag {
        Some(name) => Ok(name.parse()?),
        None => Ok(app.default_profile),
    }
}
