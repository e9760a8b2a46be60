//! Blueprint parsing
//!
//! TOML is what `monza` configs are usually written in; JSON parses into the
//! same `MonzaBlueprint`.

use contracts::{ContractError, MonzaBlueprint};

/// Blueprint file format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Json,
}

impl ConfigFormat {
    /// Format for a file extension, case-insensitive
    pub fn from_extension(ext: &str) -> Option<Self> {
        if ext.eq_ignore_ascii_case("toml") {
            Some(Self::Toml)
        } else if ext.eq_ignore_ascii_case("json") {
            Some(Self::Json)
        } else {
            None
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Toml => "TOML",
            Self::Json => "JSON",
        }
    }
}

/// Deserialize a blueprint without validating it
pub fn parse(content: &str, format: ConfigFormat) -> Result<MonzaBlueprint, ContractError> {
    let parsed: Result<MonzaBlueprint, Box<dyn std::error::Error + Send + Sync>> = match format {
        ConfigFormat::Toml => toml::from_str(content).map_err(Into::into),
        ConfigFormat::Json => serde_json::from_str(content).map_err(Into::into),
    };

    parsed.map_err(|e| ContractError::ConfigParse {
        message: format!("{} parse error: {e}", format.label()),
        source: Some(e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::DestinationType;

    #[test]
    fn test_parse_toml_minimal() {
        let content = r#"
[[destinations]]
name = "udp"
destination_type = "network"
[destinations.params]
addr = "127.0.0.1:9999"
max_packet_size = "1400"
"#;
        let result = parse(content, ConfigFormat::Toml);
        assert!(result.is_ok(), "Failed: {:?}", result.err());
        let bp = result.unwrap();
        assert_eq!(bp.bind_address, "127.0.0.1");
        assert_eq!(bp.destinations.len(), 1);
        assert_eq!(bp.destinations[0].destination_type, DestinationType::Network);
        assert_eq!(
            bp.destinations[0].params.get("max_packet_size").map(String::as_str),
            Some("1400")
        );
    }

    #[test]
    fn test_parse_json_minimal() {
        let content = r#"{
            "bind_address": "0.0.0.0",
            "destinations": [{ "name": "console", "destination_type": "log" }]
        }"#;
        let result = parse(content, ConfigFormat::Json);
        assert!(result.is_ok(), "Failed: {:?}", result.err());
        assert_eq!(result.unwrap().queue_capacity, 1);
    }

    #[test]
    fn test_parse_toml_syntax_error() {
        let err = parse("invalid toml [[[", ConfigFormat::Toml).unwrap_err();
        assert!(matches!(err, ContractError::ConfigParse { source: Some(_), .. }));
        assert!(err.to_string().contains("TOML parse error"), "got: {err}");
    }

    #[test]
    fn test_parse_unknown_destination_type() {
        let content = r#"
[[destinations]]
name = "kafka"
destination_type = "kafka"
"#;
        assert!(parse(content, ConfigFormat::Toml).is_err());
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(ConfigFormat::from_extension("toml"), Some(ConfigFormat::Toml));
        assert_eq!(ConfigFormat::from_extension("TOML"), Some(ConfigFormat::Toml));
        assert_eq!(ConfigFormat::from_extension("json"), Some(ConfigFormat::Json));
        assert_eq!(ConfigFormat::from_extension("yaml"), None);
    }
}
