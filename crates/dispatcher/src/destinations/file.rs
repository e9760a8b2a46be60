//! FileDestination - appends events to a JSON-lines file

use contracts::{ContractError, Destination, Event};
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, instrument, warn};

/// Configuration for FileDestination
#[derive(Debug, Clone)]
pub struct FileDestinationConfig {
    /// Output file; parent directories are created on setup
    pub path: PathBuf,
}

impl FileDestinationConfig {
    /// Create config from params map
    pub fn from_params(params: &HashMap<String, String>) -> Self {
        let path = params
            .get("path")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./output/events.jsonl"));

        Self { path }
    }
}

/// Destination that writes one JSON line per event
pub struct FileDestination {
    name: String,
    config: FileDestinationConfig,
    writer: Option<BufWriter<File>>,
}

impl FileDestination {
    pub fn new(name: impl Into<String>, config: FileDestinationConfig) -> Self {
        Self {
            name: name.into(),
            config,
            writer: None,
        }
    }

    /// Create from params map (for factory)
    pub fn from_params(name: impl Into<String>, params: &HashMap<String, String>) -> Self {
        Self::new(name, FileDestinationConfig::from_params(params))
    }

    fn open(&self) -> std::io::Result<BufWriter<File>> {
        if let Some(parent) = self.config.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.config.path)?;
        Ok(BufWriter::new(file))
    }

    fn append(writer: &mut BufWriter<File>, line: &[u8]) -> std::io::Result<()> {
        writer.write_all(line)?;
        writer.write_all(b"\n")?;
        writer.flush()
    }
}

impl Destination for FileDestination {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "file_destination_setup",
        skip(self, _ctx),
        fields(destination = %self.name, path = %self.config.path.display())
    )]
    async fn setup(&mut self, _ctx: &CancellationToken) -> Result<(), ContractError> {
        let writer = self
            .open()
            .map_err(|e| ContractError::destination_setup(&self.name, e.to_string()))?;
        self.writer = Some(writer);
        debug!(destination = %self.name, "FileDestination opened");
        Ok(())
    }

    async fn record(&mut self, _ctx: &CancellationToken, event: &Event) {
        let Some(writer) = self.writer.as_mut() else {
            warn!(destination = %self.name, "FileDestination not open, event skipped");
            return;
        };

        let line = event.to_json();
        if line.is_empty() {
            warn!(destination = %self.name, event = ?event.name(), "Event encoding unavailable");
            return;
        }

        if let Err(e) = Self::append(writer, &line) {
            error!(destination = %self.name, error = %e, "Write failed");
        }
    }

    #[instrument(name = "file_destination_teardown", skip(self, _ctx))]
    async fn teardown(&mut self, _ctx: &CancellationToken) {
        if let Some(mut writer) = self.writer.take() {
            if let Err(e) = writer.flush() {
                error!(destination = %self.name, error = %e, "Flush failed on teardown");
            }
        }
        debug!(destination = %self.name, "FileDestination closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_file_destination_appends_lines() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("events.jsonl");
        let ctx = CancellationToken::new();

        let mut destination =
            FileDestination::new("archive", FileDestinationConfig { path: path.clone() });
        destination.setup(&ctx).await.unwrap();
        destination
            .record(&ctx, &Event::new("auth", "10.0.0.1").with_name("login"))
            .await;
        destination
            .record(&ctx, &Event::new("auth", "10.0.0.1").with_name("logout"))
            .await;
        destination.teardown(&ctx).await;

        let content = fs::read_to_string(&path).unwrap();
        let events: Vec<Event> = content
            .lines()
            .map(|line| Event::from_json(line.as_bytes()).unwrap())
            .collect();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].name(), Some("login"));
        assert_eq!(events[1].name(), Some("logout"));
    }

    #[tokio::test]
    async fn test_file_destination_setup_fails_on_directory() {
        let dir = tempdir().unwrap();
        let ctx = CancellationToken::new();

        // The path is an existing directory, so it cannot be opened as a file.
        let mut destination = FileDestination::new(
            "archive",
            FileDestinationConfig {
                path: dir.path().to_path_buf(),
            },
        );
        let result = destination.setup(&ctx).await;
        assert!(matches!(result, Err(ContractError::DestinationSetup { .. })));
    }

    #[test]
    fn test_config_default_path() {
        let config = FileDestinationConfig::from_params(&HashMap::new());
        assert_eq!(config.path, PathBuf::from("./output/events.jsonl"));
    }
}
