use std::time::Duration;

use serde::Deserialize;

use crate::logging::LogLevel;

/// Seconds of dwell time required before the gate can open.
pub const READY_THRESHOLD_SECONDS: u64 = 4;

/// Shortest field marker accepted; below this the token space gets guessable.
pub const MIN_TOKEN_LENGTH: usize = 6;
pub const MAX_TOKEN_LENGTH: usize = 32;

/// Configuration rejected by [`DemoConfig::validate`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    ZeroTickInterval,
    TokenLengthOutOfRange(usize),
    EmptyLabel(&'static str),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ZeroTickInterval => write!(f, "tick interval must be > 0"),
            ConfigError::TokenLengthOutOfRange(len) => write!(
                f,
                "token length {len} outside {MIN_TOKEN_LENGTH}..={MAX_TOKEN_LENGTH}"
            ),
            ConfigError::EmptyLabel(which) => write!(f, "label `{which}` must not be empty"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Top-level configuration for the gated lead form demo
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DemoConfig {
    pub gate: GateConfig,
    pub form: FormConfig,
    pub log_level: LogLevel,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self::lead_demo()
    }
}

impl DemoConfig {
    /// Creates a DemoConfig matching the landing page behavior
    pub fn lead_demo() -> Self {
        Self {
            gate: GateConfig::default(),
            form: FormConfig::default(),
            log_level: LogLevel::feature_default(),
        }
    }

    pub fn from_json(text: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let config: DemoConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.gate.validate()?;
        self.form.validate()
    }
}

/// Behavioral gate thresholds
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    pub ready_threshold_seconds: u64,
    pub tick_interval_ms: u64,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            ready_threshold_seconds: READY_THRESHOLD_SECONDS,
            tick_interval_ms: 1_000,
        }
    }
}

impl GateConfig {
    /// Tick period, never shorter than 1 ms.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_interval_ms == 0 {
            return Err(ConfigError::ZeroTickInterval);
        }
        Ok(())
    }
}

/// Construction parameters for the encapsulated form
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FormConfig {
    pub token_length: usize,
    pub revert_delay_ms: u64,
    pub copy: FormCopy,
}

impl Default for FormConfig {
    fn default() -> Self {
        Self {
            token_length: 8,
            revert_delay_ms: 1_500,
            copy: FormCopy::default(),
        }
    }
}

impl FormConfig {
    pub fn revert_delay(&self) -> Duration {
        Duration::from_millis(self.revert_delay_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(MIN_TOKEN_LENGTH..=MAX_TOKEN_LENGTH).contains(&self.token_length) {
            return Err(ConfigError::TokenLengthOutOfRange(self.token_length));
        }
        self.copy.validate()
    }
}

/// User-facing text of the placeholder and the form
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FormCopy {
    pub locked_title: String,
    pub locked_body: String,
    pub hint: String,
    pub footnote: String,
    pub name_label: String,
    pub email_label: String,
    pub message_label: String,
    pub honeypot_label: String,
    pub name_placeholder: String,
    pub email_placeholder: String,
    pub message_placeholder: String,
    pub submit_label: String,
    pub blocked_label: String,
    pub incomplete_label: String,
}

impl Default for FormCopy {
    fn default() -> Self {
        Self {
            locked_title: "Unlocking secure form...".to_string(),
            locked_body: "Move your mouse, scroll, and type once. The form appears after a few \
                          seconds of human-like activity."
                .to_string(),
            hint: "This form lives in a closed root and uses randomized field markers.".to_string(),
            footnote: "We will not store your data. This is a demo-only submission.".to_string(),
            name_label: "Name".to_string(),
            email_label: "Work Email".to_string(),
            message_label: "Message".to_string(),
            honeypot_label: "Company website".to_string(),
            name_placeholder: "Ada Lovelace".to_string(),
            email_placeholder: "ada@analytics.io".to_string(),
            message_placeholder: "Tell us what you want to automate (or defeat).".to_string(),
            submit_label: "Request Demo".to_string(),
            blocked_label: "Submission blocked".to_string(),
            incomplete_label: "Complete all fields".to_string(),
        }
    }
}

impl FormCopy {
    fn validate(&self) -> Result<(), ConfigError> {
        let labels = [
            ("name_label", &self.name_label),
            ("email_label", &self.email_label),
            ("message_label", &self.message_label),
            ("submit_label", &self.submit_label),
            ("blocked_label", &self.blocked_label),
            ("incomplete_label", &self.incomplete_label),
        ];
        for (which, text) in labels {
            if text.trim().is_empty() {
                return Err(ConfigError::EmptyLabel(which));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lead_demo_preset_is_valid() {
        let config = DemoConfig::lead_demo();
        assert!(config.validate().is_ok());
        assert_eq!(config.gate.ready_threshold_seconds, 4);
        assert_eq!(config.gate.tick_interval(), Duration::from_secs(1));
        assert_eq!(config.form.revert_delay(), Duration::from_millis(1_500));
    }

    #[test]
    fn partial_json_keeps_defaults_for_missing_fields() {
        let config = DemoConfig::from_json(r#"{"form": {"revert_delay_ms": 250}, "log_level": "debug"}"#)
            .expect("partial config should load");
        assert_eq!(config.form.revert_delay_ms, 250);
        assert_eq!(config.form.token_length, 8);
        assert_eq!(config.gate, GateConfig::default());
        assert_eq!(config.log_level, LogLevel::Debug);
    }

    #[test]
    fn zero_tick_interval_is_rejected() {
        let result = DemoConfig::from_json(r#"{"gate": {"tick_interval_ms": 0}}"#);
        assert!(result.is_err());
    }

    #[test]
    fn tick_interval_is_never_zero() {
        let gate = GateConfig {
            tick_interval_ms: 0,
            ..GateConfig::default()
        };
        assert_eq!(gate.tick_interval(), Duration::from_millis(1));
    }

    #[test]
    fn short_tokens_are_rejected() {
        let form = FormConfig {
            token_length: 3,
            ..FormConfig::default()
        };
        assert_eq!(form.validate(), Err(ConfigError::TokenLengthOutOfRange(3)));
    }

    #[test]
    fn blank_submit_label_is_rejected() {
        let mut form = FormConfig::default();
        form.copy.submit_label = "   ".to_string();
        assert_eq!(form.validate(), Err(ConfigError::EmptyLabel("submit_label")));
    }
}
