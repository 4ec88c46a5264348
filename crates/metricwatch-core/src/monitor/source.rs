//! Where monitor definitions come from

use std::path::{Path, PathBuf};

use serde_json::Value as JsonValue;
use tracing::debug;

use crate::error::{Error, Result};
use crate::properties::Properties;

/// Provides the properties defining every monitor
///
/// Monitors are read from keys `monitor.<id>.*`.
pub trait PropertiesSource: Send + Sync {
    /// Current properties
    fn load(&self) -> Result<Properties>;
}

/// Fixed set of properties
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    properties: Properties,
}

impl StaticSource {
    /// Serve `properties` on every load
    pub fn new(properties: Properties) -> Self {
        Self { properties }
    }
}

impl PropertiesSource for StaticSource {
    fn load(&self) -> Result<Properties> {
        Ok(self.properties.clone())
    }
}

/// TOML, YAML or JSON file, read again on every load
///
/// Nested tables are flattened into dotted keys. Keys keep their case.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    /// Read monitors from `path`, format chosen by extension
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PropertiesSource for FileSource {
    fn load(&self) -> Result<Properties> {
        let content = std::fs::read_to_string(&self.path)?;
        let document = parse_document(&self.path, &content)?;

        let properties = Properties::from_json(&document);
        debug!(path = %self.path.display(), keys = properties.len(), "Monitor definitions loaded");
        Ok(properties)
    }
}

fn parse_document(path: &Path, content: &str) -> Result<JsonValue> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    let invalid = |cause: String| Error::configuration(format!("{}: {cause}", path.display()));

    match extension.as_str() {
        "toml" => toml::from_str(content).map_err(|e| invalid(e.to_string())),
        "yaml" | "yml" => serde_yaml::from_str(content).map_err(|e| invalid(e.to_string())),
        "json" => serde_json::from_str(content).map_err(|e| invalid(e.to_string())),
        other => Err(invalid(format!("unsupported monitor file format '{other}'"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_static_source() {
        let source = StaticSource::new(Properties::new().with("monitor.cpu.analysis.type", "recent"));
        let props = source.load().unwrap();
        assert_eq!(props.get_property("monitor.cpu.analysis.type"), Some("recent"));
    }

    #[test]
    fn test_file_source_flattens_tables() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "{}",
            r#"
[monitor.cpu.analysis]
type = "fixed-threshold"
error = { upperbound = 90 }

[monitor.cpu.notificator.ops]
type = "constant"
statuses = ["ERROR", "WARNING"]
period = "10m"
"#
        )
        .unwrap();

        let props = FileSource::new(file.path()).load().unwrap();

        assert_eq!(props.get_property("monitor.cpu.analysis.type"), Some("fixed-threshold"));
        assert_eq!(
            props.get_float("monitor.cpu.analysis.error.upperbound").unwrap(),
            Some(90.0)
        );
        assert_eq!(
            props.get_property("monitor.cpu.notificator.ops.statuses"),
            Some("ERROR WARNING")
        );
        assert_eq!(props.get_property("monitor.cpu.notificator.ops.period"), Some("10m"));
    }

    #[test]
    fn test_file_source_keeps_key_case() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[monitor.DiskUsage.filter.attribute]
hostName = "db-01"

[monitor.DiskUsage.tags]
OwnerEmail = "dba@example.org"
"#
        )
        .unwrap();

        let props = FileSource::new(file.path()).load().unwrap();

        assert_eq!(
            props.get_property("monitor.DiskUsage.filter.attribute.hostName"),
            Some("db-01")
        );
        assert_eq!(
            props.get_property("monitor.DiskUsage.tags.OwnerEmail"),
            Some("dba@example.org")
        );
        assert_eq!(props.get_property("monitor.diskusage.tags.owneremail"), None);
    }

    #[test]
    fn test_file_source_reads_yaml_and_json() {
        let mut yaml = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(yaml, "monitor:\n  Cpu:\n    analysis:\n      type: recent").unwrap();
        let props = FileSource::new(yaml.path()).load().unwrap();
        assert_eq!(props.get_property("monitor.Cpu.analysis.type"), Some("recent"));

        let mut json = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        writeln!(json, r#"{{"monitor": {{"Cpu": {{"analysis": {{"type": "recent"}}}}}}}}"#).unwrap();
        let props = FileSource::new(json.path()).load().unwrap();
        assert_eq!(props.get_property("monitor.Cpu.analysis.type"), Some("recent"));
    }

    #[test]
    fn test_unknown_extension_is_a_configuration_error() {
        let mut file = tempfile::Builder::new().suffix(".ini").tempfile().unwrap();
        writeln!(file, "a = 1").unwrap();
        let err = FileSource::new(file.path()).load().unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let source = FileSource::new(dir.path().join("missing.toml"));
        assert!(source.load().is_err());
    }
}
