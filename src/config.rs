//! Tunables of the dice pipeline.

use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use std::time::Duration;

const ENV_PREFIX: &str = "SHEET_DICE_";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiceConfig {
    /// Passes the macro expander may take before giving up.
    pub max_macro_depth: usize,
    /// Backstop for a single generation request of the dice engine.
    pub roll_timeout: Duration,
    /// How long a finished roll stays on screen before fading.
    pub result_display: Duration,
    pub fade_duration: Duration,
    /// Upper bound on dice rolled for one notation, rerolls included.
    pub max_rolls: usize,
    pub history_limit: usize,
    pub history_ttl: Duration,
    pub toast_limit: usize,
    pub toast_duration: Duration,
}

impl Default for DiceConfig {
    fn default() -> Self {
        Self {
            max_macro_depth: 5,
            roll_timeout: Duration::from_secs(100),
            result_display: Duration::from_secs(3),
            fade_duration: Duration::from_secs(1),
            max_rolls: 1000,
            history_limit: 3,
            history_ttl: Duration::from_secs(10),
            toast_limit: 3,
            toast_duration: Duration::from_secs(3),
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, Eq, PartialEq)]
#[error("{var} must be {expected}, found {value:?}")]
pub struct ConfigError {
    pub var: String,
    pub value: String,
    pub expected: &'static str,
}

impl DiceConfig {
    /// Defaults, overridden by any `SHEET_DICE_*` variable that is set.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        override_with("MAX_MACRO_DEPTH", &mut config.max_macro_depth)?;
        override_secs("ROLL_TIMEOUT_SECS", &mut config.roll_timeout)?;
        override_secs("RESULT_DISPLAY_SECS", &mut config.result_display)?;
        override_secs("FADE_SECS", &mut config.fade_duration)?;
        override_with("MAX_ROLLS", &mut config.max_rolls)?;
        override_with("HISTORY_LIMIT", &mut config.history_limit)?;
        override_secs("HISTORY_TTL_SECS", &mut config.history_ttl)?;
        override_with("TOAST_LIMIT", &mut config.toast_limit)?;
        override_secs("TOAST_SECS", &mut config.toast_duration)?;
        Ok(config)
    }
}

fn lookup<T: FromStr>(name: &str, expected: &'static str) -> Result<Option<T>, ConfigError> {
    let var = format!("{}{}", ENV_PREFIX, name);
    match env::var(&var) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError {
                var,
                value,
                expected,
            }),
        Err(_) => Ok(None),
    }
}

fn override_with(name: &str, slot: &mut usize) -> Result<(), ConfigError> {
    if let Some(v) = lookup(name, "a non-negative integer")? {
        *slot = v;
    }
    Ok(())
}

fn override_secs(name: &str, slot: &mut Duration) -> Result<(), ConfigError> {
    if let Some(v) = lookup::<f64>(name, "a non-negative number of seconds")? {
        *slot = Duration::try_from_secs_f64(v).map_err(|_| ConfigError {
            var: format!("{}{}", ENV_PREFIX, name),
            value: v.to_string(),
            expected: "a non-negative number of seconds",
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DiceConfig::default();
        assert_eq!(config.max_macro_depth, 5);
        assert_eq!(config.roll_timeout, Duration::from_secs(100));
        assert_eq!(config.history_limit, 3);
    }

    // Kept in one test: the variables are process-wide.
    #[test]
    fn test_env_override() {
        env::set_var("SHEET_DICE_TOAST_LIMIT", "7");
        let config = DiceConfig::from_env().unwrap();
        env::remove_var("SHEET_DICE_TOAST_LIMIT");
        assert_eq!(config.toast_limit, 7);

        env::set_var("SHEET_DICE_FADE_SECS", "soon");
        let err = DiceConfig::from_env().unwrap_err();
        env::remove_var("SHEET_DICE_FADE_SECS");
        assert_eq!(err.var, "SHEET_DICE_FADE_SECS");
        assert_eq!(err.value, "soon");
    }

    #[test]
    fn test_deserialize_partial() {
        let config: DiceConfig = serde_json::from_str(r#"{ "max_rolls": 50 }"#).unwrap();
        assert_eq!(config.max_rolls, 50);
        assert_eq!(config.max_macro_depth, 5);
    }
}
