use secrecy::ExposeSecret;
use serde::Serialize;

use rapport_core::config::{AppConfig, LoadOptions};

use crate::commands::CommandResult;

#[derive(Debug, Serialize)]
struct ConfigReport {
    precedence: &'static str,
    llm_provider: String,
    llm_api_key: String,
    llm_base_url: Option<String>,
    llm_mini_model: String,
    llm_full_model: String,
    llm_timeout_secs: u64,
    detector_sufficiency_threshold: u8,
    logging_level: String,
    logging_format: String,
}

pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return CommandResult::failure("config", "validation", error.to_string()),
    };

    let report = ConfigReport {
        precedence: "env > file > default",
        llm_provider: format!("{:?}", config.llm.provider).to_lowercase(),
        llm_api_key: redact(config.llm.api_key.as_ref().map(|key| key.expose_secret())),
        llm_base_url: config.llm.base_url.clone(),
        llm_mini_model: config.llm.mini_model.clone(),
        llm_full_model: config.llm.full_model.clone(),
        llm_timeout_secs: config.llm.timeout_secs,
        detector_sufficiency_threshold: config.detector.sufficiency_threshold,
        logging_level: config.logging.level.clone(),
        logging_format: format!("{:?}", config.logging.format).to_lowercase(),
    };

    CommandResult::success("config", report)
}

fn redact(secret: Option<&str>) -> String {
    match secret {
        None => "(unset)".to_string(),
        Some(value) if value.len() <= 4 => "****".to_string(),
        Some(value) => format!("{}****", &value[..4]),
    }
}
