// SPDX-FileCopyrightText: 2026 Lumi Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./lumi.toml` > `~/.config/lumi/lumi.toml` > `/etc/lumi/lumi.toml`
//! with environment variable overrides via `LUMI_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::LumiConfig;

/// System-wide config file location.
pub const SYSTEM_CONFIG_PATH: &str = "/etc/lumi/lumi.toml";

/// Config file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "lumi.toml";

/// Config sections addressable through `LUMI_<SECTION>_<KEY>` variables.
const ENV_SECTIONS: &[&str] = &[
    "rate_limit",
    "anthropic",
    "storage",
    "gateway",
    "agent",
    "tasks",
    "waha",
];

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/lumi/lumi.toml` (system-wide)
/// 3. `~/.config/lumi/lumi.toml` (user XDG config)
/// 4. `./lumi.toml` (local directory)
/// 5. `LUMI_*` environment variables
pub fn load_config() -> Result<LumiConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no file lookup, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<LumiConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(LumiConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<LumiConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(LumiConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// The layered Figment before extraction.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(LumiConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG_PATH))
        .merge(Toml::file(user_config_path().unwrap_or_default()))
        .merge(Toml::file(LOCAL_CONFIG_FILE))
        .merge(env_provider())
}

/// `~/.config/lumi/lumi.toml`, when the platform has a config dir.
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("lumi").join("lumi.toml"))
}

/// Environment provider mapping `LUMI_WAHA_API_KEY` to `waha.api_key`.
///
/// Only the section prefix is turned into a dot. Key names keep their
/// underscores, so `Env::split("_")` cannot be used here.
pub fn env_provider() -> Env {
    Env::prefixed("LUMI_").map(|key| map_env_key(key.as_str()).into())
}

/// Map a lowercased, prefix-stripped variable name onto a config path.
fn map_env_key(key: &str) -> String {
    for section in ENV_SECTIONS {
        if let Some(rest) = key
            .strip_prefix(section)
            .and_then(|r| r.strip_prefix('_'))
            && !rest.is_empty()
        {
            return format!("{section}.{rest}");
        }
    }
    key.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_section_prefix_only() {
        assert_eq!(map_env_key("waha_api_key"), "waha.api_key");
        assert_eq!(map_env_key("rate_limit_window_secs"), "rate_limit.window_secs");
        assert_eq!(map_env_key("agent_history_limit"), "agent.history_limit");
        assert_eq!(map_env_key("gateway_bearer_token"), "gateway.bearer_token");
    }

    #[test]
    fn unknown_prefix_is_left_alone() {
        assert_eq!(map_env_key("something_else"), "something_else");
        assert_eq!(map_env_key("waha"), "waha");
    }
}
