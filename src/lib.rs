//! A directory-driven HTTP router built on hyper.
//!
//! Every regular file under a root directory is one route. The file name carries the path
//! fragment and the method, the directories above it carry the path prefix, and bracketed
//! names are parameters:
//!
//! ```text
//! api/
//! ├── index.get.json          GET    /api
//! └── users/
//!     ├── index.post.json     POST   /api/users
//!     ├── [id].get.json       GET    /api/users/:id
//!     └── [id].delete.json    DELETE /api/users/:id
//! ```
//!
//! ```no_run
//! use warren::{handler, ApiServer, Config, HandlerMap};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//! 	let loader = HandlerMap::default().with(
//! 		"users/[id].get.json",
//! 		handler(|req, res| async move {
//! 			let id = req.param("id").unwrap_or_default().to_owned();
//! 			res.status(200).send(id)
//! 		}),
//! 	);
//!
//! 	let server = ApiServer::from_config(&Config::default(), &loader)?;
//! 	let running = server.start(([127, 0, 0, 1], 8080)).await?;
//! 	tokio::signal::ctrl_c().await?;
//! 	running.close().await
//! }
//! ```
//!
//! Routes are tried in the order they were registered; the first whose template matches the
//! URL and which has a handler for the request method wins. Registering a path and method
//! twice keeps the first handler and logs a warning.
//!
//! How a file becomes a handler is up to the [`HandlerLoader`] given to discovery, so the
//! route table can be built and tested without touching the filesystem.

#[cfg(feature = "http")]
mod http;
#[cfg(feature = "http")]
pub use http::*;

pub mod config;

/// Walking a directory tree into routes.
pub mod discovery;

/// Matching requests against the route table.
pub mod dispatcher;

pub mod error;

/// The route table.
pub mod registry;

/// Routes and HTTP methods.
pub mod route;

/// Path templates and matching.
pub mod template;

pub use config::{Config, ConfigError};
pub use discovery::{
	DirectoryListing, Discovery, Entry, EntryKind, FsListing, HandlerLoader, HandlerMap, RouteFile,
};
pub use dispatcher::{Dispatch, Dispatcher, Matched};
pub use error::Error;
pub use registry::{PathRoutes, Registration, RoutesRegistry};
pub use route::{Method, Route, UnknownMethod};
pub use template::{Params, PathTemplate, PatternError, Segment};
