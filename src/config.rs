//! Server configuration loaded from TOML.

use crate::template::{PathTemplate, PatternError};
use serde::Deserialize;
use std::{fs, io, path::{Path, PathBuf}};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("failed to read config: {0}")]
	Io(#[from] io::Error),
	#[error("failed to parse config: {0}")]
	Parse(#[from] toml::de::Error),
	#[error("invalid prefix `{prefix}`: {reason}")]
	Prefix { prefix: String, reason: String },
}

/// Where routes are discovered from and how they are served.
///
/// ```toml
/// root = "api"
/// prefix = "/api"
/// port = 8080
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
	/// Directory whose files become routes.
	pub root: PathBuf,
	/// Path every discovered route is mounted under.
	pub prefix: String,
	pub port: u16,
}

impl Default for Config {
	fn default() -> Self {
		Self {
			root: PathBuf::from("api"),
			prefix: "/api".to_owned(),
			port: 8080,
		}
	}
}

impl Config {
	pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let content = fs::read_to_string(path)?;
		Self::parse(&content)
	}

	pub fn parse(content: &str) -> Result<Self, ConfigError> {
		let config: Config = toml::from_str(content)?;
		config.prefix_template()?;
		Ok(config)
	}

	/// The prefix as a template. It must be absolute and free of parameters.
	pub fn prefix_template(&self) -> Result<PathTemplate, ConfigError> {
		let invalid = |reason: String| ConfigError::Prefix {
			prefix: self.prefix.clone(),
			reason,
		};

		if !self.prefix.starts_with('/') {
			return Err(invalid("must start with `/`".to_owned()));
		}

		let template = PathTemplate::compile(&self.prefix)
			.map_err(|e: PatternError| invalid(e.to_string()))?;
		if template.params().next().is_some() {
			return Err(invalid("must not contain parameters".to_owned()));
		}
		Ok(template)
	}
}

#[cfg(test)]
mod test {
	use super::{Config, ConfigError};
	use std::path::PathBuf;

	#[test]
	fn empty_config_uses_defaults() {
		assert_eq!(Config::parse("").unwrap(), Config::default());
	}

	#[test]
	fn parses_all_fields() {
		let config = Config::parse("root = \"routes\"\nprefix = \"/v1/\"\nport = 3000\n").unwrap();
		assert_eq!(config.root, PathBuf::from("routes"));
		assert_eq!(config.port, 3000);
		assert_eq!(config.prefix_template().unwrap().to_string(), "/v1");
	}

	#[test]
	fn root_prefix_is_allowed() {
		let config = Config::parse("prefix = \"/\"").unwrap();
		assert!(config.prefix_template().unwrap().is_root());
	}

	#[test]
	fn rejects_bad_prefixes() {
		assert!(matches!(Config::parse("prefix = \"api\""), Err(ConfigError::Prefix { .. })));
		assert!(matches!(Config::parse("prefix = \"/[id]\""), Err(ConfigError::Prefix { .. })));
		assert!(matches!(Config::parse("prefix = \"/[id\""), Err(ConfigError::Prefix { .. })));
	}

	#[test]
	fn rejects_unknown_fields() {
		assert!(matches!(Config::parse("listen = 1"), Err(ConfigError::Parse(_))));
	}
}
