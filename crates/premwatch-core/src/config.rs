use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the process environment so it can be tested with a plain
/// `HashMap` lookup.
#[allow(clippy::too_many_lines)]
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::path::PathBuf;

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let optional = |var: &str| -> Option<String> {
        lookup(var).ok().filter(|v| !v.trim().is_empty())
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u32>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<usize>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let parse_bool = |var: &str, default: &str| -> Result<bool, ConfigError> {
        let raw = or_default(var, default);
        match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            other => Err(ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: format!("expected a boolean, got '{other}'"),
            }),
        }
    };

    let env = parse_environment(&or_default("PREMWATCH_ENV", "development"))?;
    let log_level = or_default("PREMWATCH_LOG_LEVEL", "info");
    let targets_path = PathBuf::from(or_default(
        "PREMWATCH_TARGETS_PATH",
        "./config/targets.yaml",
    ));
    let data_dir = PathBuf::from(or_default("PREMWATCH_DATA_DIR", "./data"));

    let ai_enabled = parse_bool("PREMWATCH_AI_ENABLED", "true")?;
    let openai_api_key = optional("OPENAI_API_KEY");
    if ai_enabled && openai_api_key.is_none() {
        return Err(ConfigError::MissingEnvVar("OPENAI_API_KEY".to_string()));
    }
    let ai_base_url = or_default("PREMWATCH_AI_BASE_URL", "https://api.openai.com/v1");
    if let Err(e) = url::Url::parse(&ai_base_url) {
        return Err(ConfigError::InvalidEnvVar {
            var: "PREMWATCH_AI_BASE_URL".to_string(),
            reason: e.to_string(),
        });
    }
    let ai_model = or_default("PREMWATCH_AI_MODEL", "gpt-4o-mini");
    let ai_snippet_max_chars = parse_usize("PREMWATCH_AI_SNIPPET_MAX_CHARS", "8000")?;

    let request_timeout_secs = parse_u64("PREMWATCH_REQUEST_TIMEOUT_SECS", "30")?;
    let browser_timeout_secs = parse_u64("PREMWATCH_BROWSER_TIMEOUT_SECS", "30")?;
    let user_agent = or_default(
        "PREMWATCH_USER_AGENT",
        "premwatch/0.1 (licensing-register-monitor)",
    );
    let max_concurrent_targets = parse_usize("PREMWATCH_MAX_CONCURRENT_TARGETS", "5")?;
    let inter_request_delay_ms = parse_u64("PREMWATCH_INTER_REQUEST_DELAY_MS", "1000")?;
    let max_retries = parse_u32("PREMWATCH_MAX_RETRIES", "2")?;
    let max_pages = parse_usize("PREMWATCH_MAX_PAGES", "10")?;

    let confidence_floor = parse_confidence_floor(&or_default("PREMWATCH_CONFIDENCE_FLOOR", "0.5"))?;
    let cooldown_runs = parse_u64("PREMWATCH_COOLDOWN_RUNS", "1")?;

    let run_deadline_secs = match optional("PREMWATCH_RUN_DEADLINE_SECS") {
        Some(raw) => Some(raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: "PREMWATCH_RUN_DEADLINE_SECS".to_string(),
            reason: e.to_string(),
        })?),
        None => None,
    };
    let risk_weights_path = optional("PREMWATCH_RISK_WEIGHTS_PATH").map(PathBuf::from);

    if max_concurrent_targets == 0 {
        return Err(ConfigError::InvalidEnvVar {
            var: "PREMWATCH_MAX_CONCURRENT_TARGETS".to_string(),
            reason: "must be at least 1".to_string(),
        });
    }
    if max_pages == 0 {
        return Err(ConfigError::InvalidEnvVar {
            var: "PREMWATCH_MAX_PAGES".to_string(),
            reason: "must be at least 1".to_string(),
        });
    }

    Ok(AppConfig {
        env,
        log_level,
        targets_path,
        data_dir,
        ai_enabled,
        openai_api_key,
        ai_base_url,
        ai_model,
        ai_snippet_max_chars,
        request_timeout_secs,
        browser_timeout_secs,
        user_agent,
        max_concurrent_targets,
        inter_request_delay_ms,
        max_retries,
        max_pages,
        confidence_floor,
        cooldown_runs,
        run_deadline_secs,
        risk_weights_path,
    })
}

fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "PREMWATCH_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}

fn parse_confidence_floor(raw: &str) -> Result<f64, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidEnvVar {
        var: "PREMWATCH_CONFIDENCE_FLOOR".to_string(),
        reason,
    };
    let value = raw.trim().parse::<f64>().map_err(|e| invalid(e.to_string()))?;
    if !(0.0..=1.0).contains(&value) {
        return Err(invalid(format!("{value} is outside [0, 1]")));
    }
    Ok(value)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
