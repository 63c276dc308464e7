use std::path::PathBuf;

use crate::app_config::AppConfig;
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env
/// vars.
///
/// # Errors
///
/// Returns [`ConfigError`] if required env vars are missing or values are
/// invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the
/// process, without touching `.env` files.
///
/// # Errors
///
/// Returns [`ConfigError`] if required env vars are missing or values are
/// invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup
/// function.
///
/// This is the core parsing/validation logic, decoupled from the actual
/// environment so it can be tested with a pure `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var).map_err(|_| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default =
        |var: &str, default: &str| -> String { lookup(var).unwrap_or_else(|_| default.to_string()) };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        or_default(var, default)
            .parse::<usize>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let remote_base_url = require("REMOTE_BASE_URL")?
        .trim_end_matches('/')
        .to_string();
    let consumer_key = require("REMOTE_CONSUMER_KEY")?;
    let consumer_secret = require("REMOTE_CONSUMER_SECRET")?;

    let ledger_path = PathBuf::from(or_default("DONORSYNC_LEDGER_PATH", "./donorsync.db"));
    let log_level = or_default("DONORSYNC_LOG_LEVEL", "info");
    let request_timeout_secs = parse_u64("DONORSYNC_REQUEST_TIMEOUT_SECS", "30")?;
    let user_agent = or_default("DONORSYNC_USER_AGENT", "donorsync/0.1 (catalog-sync)");
    let max_retries = parse_u32("DONORSYNC_MAX_RETRIES", "3")?;
    let retry_backoff_base_secs = parse_u64("DONORSYNC_RETRY_BACKOFF_BASE_SECS", "1")?;
    let max_concurrent_products = parse_usize("DONORSYNC_MAX_CONCURRENT_PRODUCTS", "1")?;
    let default_status = or_default("DONORSYNC_DEFAULT_STATUS", "draft");

    if default_status != "draft" && default_status != "publish" {
        return Err(ConfigError::InvalidEnvVar {
            var: "DONORSYNC_DEFAULT_STATUS".to_string(),
            reason: format!("must be 'draft' or 'publish', got '{default_status}'"),
        });
    }

    Ok(AppConfig {
        remote_base_url,
        consumer_key,
        consumer_secret,
        ledger_path,
        log_level,
        request_timeout_secs,
        user_agent,
        max_retries,
        retry_backoff_base_secs,
        max_concurrent_products,
        default_status,
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::env::VarError;

    use super::*;

    fn lookup_from_map<'a>(
        map: &'a HashMap<&'a str, &'a str>,
    ) -> impl Fn(&str) -> Result<String, VarError> + 'a {
        move |key| {
            map.get(key)
                .map(|v| (*v).to_string())
                .ok_or(VarError::NotPresent)
        }
    }

    fn full_env<'a>() -> HashMap<&'a str, &'a str> {
        let mut m = HashMap::new();
        m.insert("REMOTE_BASE_URL", "https://shop.example/");
        m.insert("REMOTE_CONSUMER_KEY", "ck_test");
        m.insert("REMOTE_CONSUMER_SECRET", "cs_test");
        m
    }

    #[test]
    fn fails_without_remote_base_url() {
        let map: HashMap<&str, &str> = HashMap::new();
        let result = build_app_config(lookup_from_map(&map));
        assert!(
            matches!(result, Err(ConfigError::MissingEnvVar(ref v)) if v == "REMOTE_BASE_URL"),
            "expected MissingEnvVar(REMOTE_BASE_URL), got: {result:?}"
        );
    }

    #[test]
    fn fails_without_credentials() {
        let mut map: HashMap<&str, &str> = HashMap::new();
        map.insert("REMOTE_BASE_URL", "https://shop.example");
        let result = build_app_config(lookup_from_map(&map));
        assert!(
            matches!(result, Err(ConfigError::MissingEnvVar(ref v)) if v == "REMOTE_CONSUMER_KEY"),
            "expected MissingEnvVar(REMOTE_CONSUMER_KEY), got: {result:?}"
        );
    }

    #[test]
    fn succeeds_with_defaults() {
        let cfg = build_app_config(lookup_from_map(&full_env())).expect("config should build");
        assert_eq!(cfg.remote_base_url, "https://shop.example");
        assert_eq!(cfg.request_timeout_secs, 30);
        assert_eq!(cfg.max_retries, 3);
        assert_eq!(cfg.max_concurrent_products, 1);
        assert_eq!(cfg.default_status, "draft");
        assert_eq!(cfg.ledger_path, PathBuf::from("./donorsync.db"));
    }

    #[test]
    fn strips_trailing_slash_from_base_url() {
        let cfg = build_app_config(lookup_from_map(&full_env())).expect("config should build");
        assert!(!cfg.remote_base_url.ends_with('/'));
    }

    #[test]
    fn rejects_invalid_default_status() {
        let mut map = full_env();
        map.insert("DONORSYNC_DEFAULT_STATUS", "archived");
        let result = build_app_config(lookup_from_map(&map));
        assert!(
            matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "DONORSYNC_DEFAULT_STATUS"),
            "expected InvalidEnvVar(DONORSYNC_DEFAULT_STATUS), got: {result:?}"
        );
    }

    #[test]
    fn rejects_non_numeric_concurrency() {
        let mut map = full_env();
        map.insert("DONORSYNC_MAX_CONCURRENT_PRODUCTS", "many");
        let result = build_app_config(lookup_from_map(&map));
        assert!(
            matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "DONORSYNC_MAX_CONCURRENT_PRODUCTS"),
            "expected InvalidEnvVar(DONORSYNC_MAX_CONCURRENT_PRODUCTS), got: {result:?}"
        );
    }

    #[test]
    fn overrides_are_respected() {
        let mut map = full_env();
        map.insert("DONORSYNC_MAX_CONCURRENT_PRODUCTS", "4");
        map.insert("DONORSYNC_DEFAULT_STATUS", "publish");
        let cfg = build_app_config(lookup_from_map(&map)).expect("config should build");
        assert_eq!(cfg.max_concurrent_products, 4);
        assert_eq!(cfg.default_status, "publish");
    }
}
