// SPDX-FileCopyrightText: 2026 Lumi Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `lumi check-config` command implementation.
//!
//! Loading and validation already happened in `main`; reaching this point
//! means the configuration is usable. Secrets are never printed.

use lumi_config::model::LumiConfig;

/// Prints a summary of the effective configuration.
pub fn run_check_config(config: &LumiConfig) {
    for line in summary(config) {
        println!("{line}");
    }
}

fn summary(config: &LumiConfig) -> Vec<String> {
    let set = |value: &Option<String>| if value.is_some() { "set" } else { "not set" };

    vec![
        "lumi: configuration OK".to_string(),
        format!("  agent      name={} trigger={}", config.agent.name, config.agent.trigger),
        format!(
            "  waha       url={} session={}",
            config.waha.base_url, config.waha.session_name
        ),
        format!("  waha       api_key={}", set(&config.waha.api_key)),
        format!(
            "  anthropic  model={} api_key={}",
            config.anthropic.model,
            set(&config.anthropic.api_key)
        ),
        format!("  storage    path={}", config.storage.database_path),
        format!(
            "  gateway    listen={}:{} bearer_token={}",
            config.gateway.host,
            config.gateway.port,
            set(&config.gateway.bearer_token)
        ),
        format!(
            "  rate_limit api={}/{}s session={}/{}s",
            config.rate_limit.api_limit,
            config.rate_limit.window_secs,
            config.rate_limit.session_limit,
            config.rate_limit.window_secs
        ),
    ]
}
