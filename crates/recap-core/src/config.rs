//! Installation-wide summarization settings

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SummarizationError};

pub const MIN_TOKEN_THRESHOLD: u32 = 100;

/// How the batch window treats the message that would carry it past the threshold.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowPolicy {
    /// Admit the crossing message only when that lands closer to the
    /// threshold than stopping short of it.
    #[default]
    Nearest,
    /// Never admit a message that would exceed the threshold, except as the
    /// first message of a window.
    Ceiling,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummarizationConfig {
    #[serde(default = "default_token_threshold")]
    pub token_threshold: u32,

    #[serde(default)]
    pub enabled: bool,

    #[serde(default)]
    pub window_policy: WindowPolicy,

    #[serde(default = "default_preview_chars")]
    pub preview_chars: usize,

    #[serde(default = "default_system_instruction")]
    pub system_instruction: String,

    /// minijinja template; `None` uses the built-in prompt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_template: Option<String>,

    #[serde(default = "default_generation_timeout_secs")]
    pub generation_timeout_secs: u64,
}

fn default_token_threshold() -> u32 {
    1000
}

fn default_preview_chars() -> usize {
    200
}

fn default_system_instruction() -> String {
    "You are a helpful assistant that creates concise summaries.".to_string()
}

fn default_generation_timeout_secs() -> u64 {
    120
}

impl Default for SummarizationConfig {
    fn default() -> Self {
        Self {
            token_threshold: default_token_threshold(),
            enabled: false,
            window_policy: WindowPolicy::default(),
            preview_chars: default_preview_chars(),
            system_instruction: default_system_instruction(),
            prompt_template: None,
            generation_timeout_secs: default_generation_timeout_secs(),
        }
    }
}

impl SummarizationConfig {
    pub fn new(token_threshold: u32) -> Self {
        Self {
            token_threshold,
            ..Default::default()
        }
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_window_policy(mut self, policy: WindowPolicy) -> Self {
        self.window_policy = policy;
        self
    }

    pub fn with_preview_chars(mut self, chars: usize) -> Self {
        self.preview_chars = chars;
        self
    }

    pub fn with_system_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = instruction.into();
        self
    }

    pub fn with_prompt_template(mut self, template: impl Into<String>) -> Self {
        self.prompt_template = Some(template.into());
        self
    }

    pub fn with_generation_timeout_secs(mut self, secs: u64) -> Self {
        self.generation_timeout_secs = secs;
        self
    }

    pub fn generation_timeout(&self) -> Option<Duration> {
        if self.generation_timeout_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(self.generation_timeout_secs))
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.token_threshold < MIN_TOKEN_THRESHOLD {
            return Err(SummarizationError::InvalidConfig(format!(
                "token_threshold must be at least {}, got {}",
                MIN_TOKEN_THRESHOLD, self.token_threshold
            )));
        }
        if self.preview_chars == 0 {
            return Err(SummarizationError::InvalidConfig(
                "preview_chars must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SummarizationConfig::default();
        assert_eq!(config.token_threshold, 1000);
        assert!(!config.enabled);
        assert_eq!(config.window_policy, WindowPolicy::Nearest);
        assert_eq!(config.preview_chars, 200);
        assert!(config.prompt_template.is_none());
        assert_eq!(config.generation_timeout(), Some(Duration::from_secs(120)));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_threshold_floor() {
        assert!(SummarizationConfig::new(99).validate().is_err());
        assert!(SummarizationConfig::new(100).validate().is_ok());
    }

    #[test]
    fn test_zero_preview_rejected() {
        let config = SummarizationConfig::default().with_preview_chars(0);
        assert!(matches!(
            config.validate(),
            Err(SummarizationError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_zero_timeout_disables_it() {
        let config = SummarizationConfig::default().with_generation_timeout_secs(0);
        assert!(config.generation_timeout().is_none());
    }

    #[test]
    fn test_yaml_partial_config() {
        let yaml = r#"
token_threshold: 2500
enabled: true
window_policy: ceiling
"#;
        let config: SummarizationConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.token_threshold, 2500);
        assert!(config.enabled);
        assert_eq!(config.window_policy, WindowPolicy::Ceiling);
        assert_eq!(config.preview_chars, 200);
        assert!(config.system_instruction.contains("concise summaries"));
    }
}
