//! Configuration schema definitions

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Model used for every completion request
pub const DEFAULT_MODEL: &str = "claude-haiku-4-5-20251001";

/// Maximum output tokens requested from the endpoint
pub const DEFAULT_MAX_TOKENS: u32 = 2048;

/// Sampling temperature
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Personality and style instructions sent as the system prompt
pub const DEFAULT_SYSTEM_PROMPT: &str = r#"You are a friendly, professional conversational assistant. Your goal is to help people in a natural, approachable way.

PERSONALITY AND TONE:
- Be conversational and natural, as if talking with a friend or colleague
- Use clear, accessible language and avoid unnecessary jargon
- Show empathy and understanding for what the user needs
- Keep a positive, constructive tone
- Be concise but complete

COMMUNICATION STYLE:
- Use practical examples when they help
- Break complex information into simple steps
- Ask follow-up questions when something needs clarifying
- Say so when you are unsure instead of making things up
- Use inclusive, respectful language

RESPONSE FORMAT:
- Structure answers clearly with short paragraphs
- Use lists when presenting several points
- Highlight important information naturally
- Avoid overly formal or robotic replies

HUMAN TOUCH:
- Vary how you phrase things instead of repeating the same sentences
- Use natural transitions between ideas
- Show appropriate enthusiasm when it fits
- Acknowledge the context of the earlier conversation

Remember: be useful while keeping the conversation natural and pleasant."#;

/// Root configuration for charla
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Completion parameters
    #[serde(default)]
    pub chat: ChatConfig,
    /// Completion endpoint settings
    #[serde(default)]
    pub provider: ProviderConfig,
    /// Login settings
    #[serde(default)]
    pub auth: AuthConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Fixed completion parameters sent with every request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_max_tokens() -> u32 {
    DEFAULT_MAX_TOKENS
}

fn default_temperature() -> f32 {
    DEFAULT_TEMPERATURE
}

fn default_system_prompt() -> String {
    DEFAULT_SYSTEM_PROMPT.to_string()
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            system_prompt: default_system_prompt(),
        }
    }
}

/// Completion endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// API key; left empty until the user configures one
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_anthropic_version")]
    pub anthropic_version: String,
}

fn default_api_base() -> String {
    "https://api.anthropic.com".to_string()
}

fn default_anthropic_version() -> String {
    "2023-06-01".to_string()
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_base: default_api_base(),
            anthropic_version: default_anthropic_version(),
        }
    }
}

/// Login configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Simulated credential check latency in milliseconds
    #[serde(default = "default_login_delay_ms")]
    pub login_delay_ms: u64,
}

fn default_login_delay_ms() -> u64 {
    500
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            login_delay_ms: default_login_delay_ms(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (text, json)
    #[serde(default = "default_log_format")]
    pub format: String,
    /// Directory for log files
    #[serde(default = "default_log_dir")]
    pub dir: String,
    /// Module-specific overrides
    #[serde(default)]
    pub overrides: HashMap<String, String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_log_dir() -> String {
    "~/.charla/logs".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            dir: default_log_dir(),
            overrides: HashMap::new(),
        }
    }
}
