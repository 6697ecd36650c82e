use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use taskmint_core::config::{AppConfig, LoadOptions};
use toml::Value;

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let source = |key_path: &str, env_key: &str| {
        field_source(key_path, env_key, config_file_doc.as_ref(), config_file_path.as_deref())
    };

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];

    lines.push(render_line(
        "database.url",
        &config.database.url,
        source("database.url", "TASKMINT_DATABASE_URL"),
    ));
    lines.push(render_line(
        "database.max_connections",
        &config.database.max_connections.to_string(),
        source("database.max_connections", "TASKMINT_DATABASE_MAX_CONNECTIONS"),
    ));
    lines.push(render_line(
        "database.timeout_secs",
        &config.database.timeout_secs.to_string(),
        source("database.timeout_secs", "TASKMINT_DATABASE_TIMEOUT_SECS"),
    ));

    lines.push(render_line(
        "auth.jwt_secret",
        "<redacted>",
        source("auth.jwt_secret", "TASKMINT_AUTH_JWT_SECRET"),
    ));
    lines.push(render_line(
        "auth.token_ttl_secs",
        &config.auth.token_ttl_secs.to_string(),
        source("auth.token_ttl_secs", "TASKMINT_AUTH_TOKEN_TTL_SECS"),
    ));
    lines.push(render_line(
        "auth.password_iterations",
        &config.auth.password_iterations.to_string(),
        source("auth.password_iterations", "TASKMINT_AUTH_PASSWORD_ITERATIONS"),
    ));

    lines.push(render_line(
        "llm.provider",
        &format!("{:?}", config.llm.provider),
        source("llm.provider", "TASKMINT_LLM_PROVIDER"),
    ));
    lines.push(render_line(
        "llm.model",
        &config.llm.model,
        source("llm.model", "TASKMINT_LLM_MODEL"),
    ));
    lines.push(render_line(
        "llm.base_url",
        config.llm.base_url.as_deref().unwrap_or("<unset>"),
        source("llm.base_url", "TASKMINT_LLM_BASE_URL"),
    ));
    let llm_api_key = if config.llm.api_key.is_some() { "<redacted>" } else { "<unset>" };
    lines.push(render_line(
        "llm.api_key",
        llm_api_key,
        source("llm.api_key", "TASKMINT_LLM_API_KEY"),
    ));

    lines.push(render_line(
        "extraction.reference_utc_offset_minutes",
        &config.extraction.reference_utc_offset_minutes.to_string(),
        source("extraction.reference_utc_offset_minutes", "TASKMINT_EXTRACTION_UTC_OFFSET_MINUTES"),
    ));
    lines.push(render_line(
        "extraction.max_input_chars",
        &config.extraction.max_input_chars.to_string(),
        source("extraction.max_input_chars", "TASKMINT_EXTRACTION_MAX_INPUT_CHARS"),
    ));

    lines.push(render_line(
        "server.bind_address",
        &config.server.bind_address,
        source("server.bind_address", "TASKMINT_SERVER_BIND_ADDRESS"),
    ));
    lines.push(render_line(
        "server.api_port",
        &config.server.api_port.to_string(),
        source("server.api_port", "TASKMINT_SERVER_API_PORT"),
    ));
    lines.push(render_line(
        "server.health_check_port",
        &config.server.health_check_port.to_string(),
        source("server.health_check_port", "TASKMINT_SERVER_HEALTH_CHECK_PORT"),
    ));

    lines.push(render_line(
        "logging.level",
        &config.logging.level,
        source("logging.level", "TASKMINT_LOGGING_LEVEL"),
    ));
    lines.push(render_line(
        "logging.format",
        &format!("{:?}", config.logging.format),
        source("logging.format", "TASKMINT_LOGGING_FORMAT"),
    ));

    lines.join("\n")
}

fn detect_config_path() -> Option<PathBuf> {
    let root = PathBuf::from("taskmint.toml");
    if root.exists() {
        return Some(root);
    }

    let nested = PathBuf::from("config/taskmint.toml");
    if nested.exists() {
        return Some(nested);
    }

    None
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_key: &str,
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if env::var_os(env_key).is_some() {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}
