use crate::template::PatternError;
use std::{io, path::PathBuf};
use thiserror::Error;

/// Errors that abort route discovery.
///
/// Every variant is fatal: a route file that cannot be turned into a route must never be
/// skipped silently.
#[derive(Debug, Error)]
pub enum Error {
	/// The root directory, or a directory below it, could not be read.
	#[error("failed to read directory {path}: {source}")]
	FileSystem {
		path: PathBuf,
		#[source]
		source: io::Error,
	},

	/// The handler loader rejected a route file.
	#[error("failed to load handler for {file}: {source}")]
	HandlerLoad {
		file: PathBuf,
		#[source]
		source: anyhow::Error,
	},

	#[error("invalid route pattern in {file}: {source}")]
	InvalidPattern {
		file: PathBuf,
		#[source]
		source: PatternError,
	},

	/// A route file name has no method component, e.g. `users.js`.
	#[error("route file {0} has no method component")]
	MissingMethod(PathBuf),

	#[error("route file {file} names unknown method `{token}`")]
	UnknownMethod { file: PathBuf, token: String },

	#[error("path {0} is not valid UTF-8")]
	NonUtf8Name(PathBuf),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
