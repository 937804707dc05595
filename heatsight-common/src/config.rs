use serde::{Deserialize, Serialize};

/// Zenoh connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZenohConfig {
    /// Zenoh mode: "client", "peer", or "router".
    #[serde(default = "default_mode")]
    pub mode: String,

    /// Endpoints to connect to (for client mode).
    #[serde(default)]
    pub connect: Vec<String>,

    /// Endpoints to listen on (for peer/router mode).
    #[serde(default)]
    pub listen: Vec<String>,
}

fn default_mode() -> String {
    "peer".to_string()
}

impl Default for ZenohConfig {
    fn default() -> Self {
        Self {
            mode: default_mode(),
            connect: Vec::new(),
            listen: Vec::new(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable text format (default).
    #[default]
    Text,
    /// Structured JSON format.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level or filter directive ("info", "zenoh=warn,debug", ...).
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log output format: "text" or "json".
    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct Sample {
        #[serde(default)]
        zenoh: ZenohConfig,
        #[serde(default)]
        logging: LoggingConfig,
    }

    #[test]
    fn test_parse_zenoh_and_logging() {
        let json5 = r#"
        {
            zenoh: {
                mode: "client",
                connect: ["tcp/localhost:7447"],
            },
            logging: {
                level: "debug",
                format: "json",
            },
        }
        "#;

        let config: Sample = json5::from_str(json5).unwrap();

        assert_eq!(config.zenoh.mode, "client");
        assert_eq!(config.zenoh.connect, vec!["tcp/localhost:7447"]);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_defaults() {
        let config: Sample = json5::from_str("{}").unwrap();

        assert_eq!(config.zenoh, ZenohConfig::default());
        assert_eq!(config.zenoh.mode, "peer");
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, LogFormat::Text);
    }
}
