// Configuration file loaders

use crate::{ConfigError, Result};
use serde_json::Value;
use std::fs;
use std::path::Path;

/// Supported configuration file formats
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FileFormat {
    Json,
    Toml,
}

impl FileFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "json" => Some(FileFormat::Json),
            "toml" => Some(FileFormat::Toml),
            _ => None,
        }
    }
}

/// Configuration file loader
pub struct ConfigLoader {
    format: FileFormat,
}

impl ConfigLoader {
    pub fn new(format: FileFormat) -> Self {
        Self { format }
    }

    /// Auto-detect format from file extension
    pub fn auto(path: &str) -> Result<Self> {
        let path_obj = Path::new(path);
        let ext = path_obj
            .extension()
            .and_then(|s| s.to_str())
            .ok_or_else(|| ConfigError::LoadError("No file extension found".to_string()))?;

        let format = FileFormat::from_extension(ext)
            .ok_or_else(|| ConfigError::LoadError(format!("Unsupported format: {}", ext)))?;

        Ok(Self::new(format))
    }

    /// Load configuration from file
    pub fn load_file(&self, path: &str) -> Result<Value> {
        let content = fs::read_to_string(path)
            .map_err(|e| ConfigError::LoadError(format!("Failed to read file: {}", e)))?;

        self.parse(&content)
    }

    /// Parse configuration from string
    pub fn parse(&self, content: &str) -> Result<Value> {
        match self.format {
            FileFormat::Json => self.parse_json(content),
            FileFormat::Toml => self.parse_toml(content),
        }
    }

    fn parse_json(&self, content: &str) -> Result<Value> {
        serde_json::from_str(content)
            .map_err(|e| ConfigError::ParseError(format!("JSON parse error: {}", e)))
    }

    fn parse_toml(&self, content: &str) -> Result<Value> {
        let toml_value: toml::Value = toml::from_str(content)
            .map_err(|e| ConfigError::ParseError(format!("TOML parse error: {}", e)))?;

        serde_json::to_value(toml_value)
            .map_err(|e| ConfigError::ParseError(format!("TOML to JSON conversion error: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_json() {
        let loader = ConfigLoader::new(FileFormat::Json);
        let json = r#"{"http": {"port": 9000}}"#;

        let result = loader.parse(json).unwrap();
        assert_eq!(result["http"]["port"], 9000);
    }

    #[test]
    fn test_parse_toml() {
        let loader = ConfigLoader::new(FileFormat::Toml);
        let toml = "[http]\nport = 9000\n";

        let result = loader.parse(toml).unwrap();
        assert_eq!(result["http"]["port"], 9000);
    }

    #[test]
    fn test_parse_invalid_json() {
        let loader = ConfigLoader::new(FileFormat::Json);
        assert!(matches!(
            loader.parse("{not json"),
            Err(ConfigError::ParseError(_))
        ));
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(FileFormat::from_extension("json"), Some(FileFormat::Json));
        assert_eq!(FileFormat::from_extension("TOML"), Some(FileFormat::Toml));
        assert_eq!(FileFormat::from_extension("yaml"), None);
    }

    #[test]
    fn test_auto_requires_known_extension() {
        assert!(ConfigLoader::auto("app.toml").is_ok());
        assert!(ConfigLoader::auto("app.yaml").is_err());
        assert!(ConfigLoader::auto("app").is_err());
    }
}
