//! INI file configuration adapter.
//!
//! Section and key names are case-insensitive; values keep their case.

use std::fs;
use std::path::Path;

use configparser::ini::Ini;

use crate::domain::error::TaError;
use crate::ports::config_port::ConfigPort;

pub struct FileConfigAdapter {
    config: Ini,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, TaError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        Self::parse(&path.display().to_string(), content)
    }

    pub fn from_string(content: &str) -> Result<Self, TaError> {
        Self::parse("<string>", content.to_string())
    }

    fn parse(file: &str, content: String) -> Result<Self, TaError> {
        let mut config = Ini::new();
        config.read(content).map_err(|reason| TaError::ConfigParse {
            file: file.to_string(),
            reason,
        })?;
        Ok(Self { config })
    }

    fn parse_bool(value: &str) -> Option<bool> {
        match value.to_lowercase().as_str() {
            "true" | "yes" | "1" => Some(true),
            "false" | "no" | "0" => Some(false),
            _ => None,
        }
    }
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.config.get(section, key)
    }

    fn get_int(&self, section: &str, key: &str, default: i64) -> i64 {
        self.config
            .getint(section, key)
            .ok()
            .flatten()
            .unwrap_or(default)
    }

    fn get_double(&self, section: &str, key: &str, default: f64) -> f64 {
        self.config
            .getfloat(section, key)
            .ok()
            .flatten()
            .unwrap_or(default)
    }

    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool {
        self.config
            .get(section, key)
            .as_ref()
            .and_then(|v| Self::parse_bool(v))
            .unwrap_or(default)
    }

    fn has_section(&self, section: &str) -> bool {
        let section = section.to_lowercase();
        self.config.sections().iter().any(|s| *s == section)
    }
}
