//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::{DestinationType, MonzaBlueprint};
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    bind_address: String,
    queue_capacity: usize,
    destination_count: usize,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(blueprint) => {
            let warnings = collect_warnings(&blueprint);
            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(ConfigSummary {
                    bind_address: blueprint.bind_address.clone(),
                    queue_capacity: blueprint.queue_capacity,
                    destination_count: blueprint.destinations.len(),
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(blueprint: &MonzaBlueprint) -> Vec<String> {
    let mut warnings = Vec::new();

    if blueprint.destinations.is_empty() {
        warnings.push("No destinations configured - events will not be delivered".to_string());
    }

    for destination in &blueprint.destinations {
        if destination.destination_type == DestinationType::File
            && !destination.params.contains_key("path")
        {
            warnings.push(format!(
                "File destination '{}' has no 'path' - using ./output/events.jsonl",
                destination.name
            ));
        }
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Bind address: {}", summary.bind_address);
            println!("  Queue capacity: {}", summary.queue_capacity);
            println!("  Destinations: {}", summary.destination_count);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(content: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_valid_config_with_warnings() {
        let file = write_config(
            r#"
[[destinations]]
name = "archive"
destination_type = "file"
"#,
        );
        let result = validate_config(&ValidateArgs {
            config: file.path().to_path_buf(),
            json: true,
        });

        assert!(result.valid);
        let warnings = result.warnings.unwrap();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("archive"));
        assert_eq!(result.summary.unwrap().destination_count, 1);
    }

    #[test]
    fn test_invalid_config_reports_error() {
        let file = write_config(
            r#"
[[destinations]]
name = "udp"
destination_type = "network"
"#,
        );
        let result = validate_config(&ValidateArgs {
            config: file.path().to_path_buf(),
            json: false,
        });

        assert!(!result.valid);
        assert!(result.error.unwrap().contains("addr"));
    }

    #[test]
    fn test_missing_file() {
        let result = validate_config(&ValidateArgs {
            config: "does/not/exist.toml".into(),
            json: false,
        });
        assert!(!result.valid);
        assert!(result.error.unwrap().contains("File not found"));
    }
}
