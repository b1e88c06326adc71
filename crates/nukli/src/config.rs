//! CLI-owned configuration: TOML profiles and translation to `BridgeConfig`.
//!
//! The library crates never see these types -- they receive a pre-built
//! `BridgeConfig`. Precedence: CLI flags (and their env fallbacks) over the
//! selected profile over built-in defaults.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use nukli_api::{BridgeConfig, Encryption};

use crate::cli::GlobalOpts;
use crate::error::CliError;

// ── TOML config structs ──────────────────────────────────────────────

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    /// Profile used when --profile is not specified.
    pub default_profile: Option<String>,

    /// Named bridge profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Profile {
    /// Bridge hostname or IP, with an optional `:port`.
    pub host: Option<String>,

    /// Bridge API token (plaintext -- prefer NB_TOKEN if that worries you).
    pub token: Option<String>,

    /// Token protection scheme: "none", "hashedToken" or "encryptedToken".
    pub encryption: Option<String>,

    /// Request timeout in seconds.
    pub timeout: Option<u64>,
}

pub fn config_path() -> PathBuf {
    ProjectDirs::from("", "", "nukli")
        .map(|dirs| dirs.config_dir().join("config.toml"))
        .unwrap_or_else(|| PathBuf::from("nukli.toml"))
}

pub fn load_config_or_default() -> Config {
    Figment::from(Serialized::defaults(Config::default()))
        .merge(Toml::file(config_path()))
        .extract()
        .unwrap_or_default()
}

// ── Resolution ───────────────────────────────────────────────────────

/// Build a validated `BridgeConfig` from flags, env, and the active profile.
///
/// The `/auth` flow waits on a physical button press, so `for_auth` forces
/// the recommended 60s timeout and tolerates a missing token.
pub fn resolve(global: &GlobalOpts, for_auth: bool) -> Result<BridgeConfig, CliError> {
    let config = load_config_or_default();
    let profile_name = global
        .profile
        .clone()
        .or_else(|| config.default_profile.clone())
        .unwrap_or_else(|| "default".into());
    let profile = config.profiles.get(&profile_name);

    let host_spec = global
        .host
        .clone()
        .or_else(|| profile.and_then(|p| p.host.clone()))
        .ok_or_else(|| CliError::MissingHost {
            path: config_path().display().to_string(),
        })?;
    let (host, port) = split_host_port(&host_spec)?;

    let token = global
        .token
        .clone()
        .or_else(|| profile.and_then(|p| p.token.clone()));
    if token.is_none() && !for_auth {
        return Err(CliError::MissingToken);
    }

    let encryption = match (global.encryption, profile.and_then(|p| p.encryption.as_deref())) {
        (Some(flag), _) => flag.into(),
        (None, Some(name)) => name.parse::<Encryption>().map_err(|_| CliError::Validation {
            field: "encryption".into(),
            reason: format!("{name}: expected none, hashedToken or encryptedToken"),
        })?,
        (None, None) => Encryption::default(),
    };

    let timeout = if for_auth {
        60
    } else {
        global
            .timeout
            .or_else(|| profile.and_then(|p| p.timeout))
            .unwrap_or(5)
    };

    let mut bridge = BridgeConfig::new(host);
    bridge.port = port;
    bridge.token = token.map(SecretString::from);
    bridge.encryption = encryption;
    bridge.timeout = Duration::from_secs(timeout);
    Ok(bridge)
}

/// Split an optional trailing `:port` off a host spec. Defaults to the
/// bridge's usual port 8080.
fn split_host_port(spec: &str) -> Result<(String, u16), CliError> {
    match spec.rsplit_once(':') {
        Some((host, port)) if !host.is_empty() => {
            let port = port.parse().map_err(|_| CliError::Validation {
                field: "host".into(),
                reason: format!("{port}: not a port number"),
            })?;
            Ok((host.to_owned(), port))
        }
        _ => Ok((spec.to_owned(), 8080)),
    }
}
