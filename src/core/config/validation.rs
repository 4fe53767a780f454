use crate::core::config::service::RuntimeConfig;
use crate::core::errors::ApiError;

/// Range checks applied once at startup. A config that fails here aborts
/// initialization; the pipeline never runs with out-of-range knobs.
pub fn validate_runtime_config(config: &RuntimeConfig) -> Result<(), ApiError> {
    if config.llm.trim().is_empty() {
        return Err(config_error("llm", "value cannot be empty"));
    }

    let threshold = config.vectordb.threshold;
    if !(0.0..=1.0).contains(&threshold) || !threshold.is_finite() {
        return Err(config_error(
            "vectordb.threshold",
            "must be between 0.0 and 1.0",
        ));
    }

    if config.vectordb.n_results == 0 {
        return Err(config_error("vectordb.n_results", "must be at least 1"));
    }

    if config.memory_strategies.trimming_window_size == 0 {
        return Err(config_error(
            "memory_strategies.trimming_window_size",
            "must be at least 1",
        ));
    }

    if config.memory_strategies.summarization_max_tokens == 0 {
        return Err(config_error(
            "memory_strategies.summarization_max_tokens",
            "must be at least 1",
        ));
    }

    if config.translation.native_language.trim().is_empty() {
        return Err(config_error(
            "translation.native_language",
            "value cannot be empty",
        ));
    }

    Ok(())
}

fn config_error(path: &str, reason: &str) -> ApiError {
    ApiError::BadRequest(format!("Invalid config at '{}': {}", path, reason))
}
