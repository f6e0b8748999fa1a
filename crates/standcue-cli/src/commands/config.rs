use clap::Subcommand;
use standcue_core::storage::profiles::{builtin_profiles, profile_spec};
use standcue_core::storage::FIELD_KEYS;
use standcue_core::{AppConfig, SettingsProvider, SettingsStore};

use super::resolve_profile;

/// Keys with this prefix address `config.toml` instead of a profile.
const APP_PREFIX: &str = "app.";

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Get a value (e.g. "interval", "pause1_secs", "app.sound.backend")
    Get {
        key: String,
        #[arg(long)]
        profile: Option<String>,
    },
    /// Set a value
    Set {
        key: String,
        value: String,
        #[arg(long)]
        profile: Option<String>,
    },
    /// List a profile's settings, or the app config with --app
    List {
        #[arg(long)]
        profile: Option<String>,
        #[arg(long)]
        app: bool,
    },
    /// Reset a profile (or the app config with --app) to defaults
    Reset {
        #[arg(long)]
        profile: Option<String>,
        #[arg(long)]
        app: bool,
    },
    /// Show the allowed range of each profile setting
    Bounds {
        #[arg(long)]
        profile: Option<String>,
    },
    /// List built-in profiles
    Profiles,
}

pub fn run(action: ConfigAction) -> Result<(), Box<dyn std::error::Error>> {
    let mut app = AppConfig::load()?;

    match action {
        ConfigAction::Get { key, profile } => {
            let value = match key.strip_prefix(APP_PREFIX) {
                Some(app_key) => app.get(app_key),
                None => {
                    let profile = resolve_profile(profile.as_deref(), &app)?;
                    SettingsStore::open()?.get_field(profile, &key)
                }
            };
            match value {
                Some(value) => println!("{value}"),
                None => return Err(format!("unknown key: {key}").into()),
            }
        }
        ConfigAction::Set {
            key,
            value,
            profile,
        } => match key.strip_prefix(APP_PREFIX) {
            Some(app_key) => {
                app.set(app_key, &value)?;
                app.save()?;
                println!("ok");
            }
            None => {
                if !FIELD_KEYS.contains(&key.as_str()) {
                    return Err(format!(
                        "unknown key: {key} (expected one of {})",
                        FIELD_KEYS.join(", ")
                    )
                    .into());
                }
                let profile = resolve_profile(profile.as_deref(), &app)?;
                SettingsStore::open()?.set_field(profile, &key, &value)?;
                println!("ok");
            }
        },
        ConfigAction::List { profile, app: true } => {
            if profile.is_some() {
                return Err("--profile and --app are exclusive".into());
            }
            println!("{}", serde_json::to_string_pretty(&app)?);
        }
        ConfigAction::List { profile, .. } => {
            let profile = resolve_profile(profile.as_deref(), &app)?;
            let settings = SettingsStore::open()?.get(profile);
            println!("{}", serde_json::to_string_pretty(&settings)?);
        }
        ConfigAction::Reset { app: true, .. } => {
            AppConfig::default().save()?;
            println!("app config reset to defaults");
        }
        ConfigAction::Reset { profile, .. } => {
            let profile = resolve_profile(profile.as_deref(), &app)?;
            SettingsStore::open()?.reset(profile)?;
            println!("{profile} reset to defaults");
        }
        ConfigAction::Bounds { profile } => {
            let profile = resolve_profile(profile.as_deref(), &app)?;
            let bounds = profile_spec(profile).bounds;
            println!("{}", serde_json::to_string_pretty(&bounds)?);
        }
        ConfigAction::Profiles => {
            for spec in builtin_profiles() {
                let marker = if spec.profile == app.default_profile {
                    "*"
                } else {
                    " "
                };
                println!("{marker} {:<10} {}", spec.profile.name(), spec.description);
            }
        }
    }
    Ok(())
}
