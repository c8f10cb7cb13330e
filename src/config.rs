/// How the binary prints the final game state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Board grid plus a status line.
    Text,
    /// `GameSummary` as JSON.
    Json,
}

impl OutputFormat {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "text" => Some(OutputFormat::Text),
            "json" => Some(OutputFormat::Json),
            _ => None,
        }
    }
}

/// Binary configuration parsed from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Log filter used when `RUST_LOG` is unset.
    pub log_filter: String,
    /// Print the legal moves of the side to move after replay.
    pub show_legal: bool,
    pub output: OutputFormat,
}

impl AppConfig {
    /// Load configuration from environment variables with defaults.
    pub fn from_env() -> Self {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset or malformed values fall back to
    /// the defaults.
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = AppConfig::default();
        AppConfig {
            log_filter: lookup("CHESS_LOG")
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(defaults.log_filter),
            show_legal: lookup("CHESS_SHOW_LEGAL")
                .and_then(|v| parse_bool(&v))
                .unwrap_or(defaults.show_legal),
            output: lookup("CHESS_OUTPUT")
                .and_then(|v| OutputFormat::parse(&v))
                .unwrap_or(defaults.output),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            log_filter: "chess_rules=info".to_string(),
            show_legal: false,
            output: OutputFormat::Text,
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
