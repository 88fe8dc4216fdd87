use crate::{
	error::{Error, Result},
	route::{Method, Route},
	template::{PathTemplate, PatternError, Segment},
};
use anyhow::anyhow;
use std::{
	collections::HashMap,
	ffi::OsString,
	fs, io,
	path::{Path, PathBuf},
};
use tracing::debug;

/// What a directory entry is, as reported by the filesystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
	File,
	Directory,
	Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
	pub name: OsString,
	pub kind: EntryKind,
}

impl Entry {
	pub fn file(name: impl Into<OsString>) -> Self {
		Self {
			name: name.into(),
			kind: EntryKind::File,
		}
	}

	pub fn directory(name: impl Into<OsString>) -> Self {
		Self {
			name: name.into(),
			kind: EntryKind::Directory,
		}
	}
}

/// Lists the entries of a directory. The order returned is the discovery order.
pub trait DirectoryListing {
	fn entries(&self, dir: &Path) -> io::Result<Vec<Entry>>;
}

/// Lists real directories, sorted by name.
///
/// Symlinks are followed when deciding an entry's kind, and there is no loop protection:
/// a symlink pointing at one of its ancestors recurses until the walk fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsListing;

impl DirectoryListing for FsListing {
	fn entries(&self, dir: &Path) -> io::Result<Vec<Entry>> {
		let mut entries = fs::read_dir(dir)?
			.map(|entry| {
				let entry = entry?;
				let meta = fs::metadata(entry.path())?;
				let kind = if meta.is_file() {
					EntryKind::File
				} else if meta.is_dir() {
					EntryKind::Directory
				} else {
					EntryKind::Other
				};
				Ok(Entry {
					name: entry.file_name(),
					kind,
				})
			})
			.collect::<io::Result<Vec<_>>>()?;

		entries.sort_by(|a, b| a.name.cmp(&b.name));
		Ok(entries)
	}
}

/// A route file found during discovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteFile {
	/// Location of the file, including the discovery root.
	pub path: PathBuf,
	/// Location of the file relative to the discovery root.
	pub relative: PathBuf,
}

/// Turns a route file into a handler.
pub trait HandlerLoader<H> {
	fn load(&self, file: &RouteFile) -> anyhow::Result<H>;
}

impl<H, F> HandlerLoader<H> for F
where
	F: Fn(&RouteFile) -> anyhow::Result<H>,
{
	fn load(&self, file: &RouteFile) -> anyhow::Result<H> {
		self(file)
	}
}

/// Handlers registered ahead of time, keyed by their file's path relative to the root.
#[derive(Debug, Clone)]
pub struct HandlerMap<H> {
	handlers: HashMap<PathBuf, H>,
}

impl<H> Default for HandlerMap<H> {
	fn default() -> Self {
		Self {
			handlers: HashMap::new(),
		}
	}
}

impl<H> HandlerMap<H> {
	pub fn insert(&mut self, relative: impl Into<PathBuf>, handler: H) -> &mut Self {
		self.handlers.insert(relative.into(), handler);
		self
	}

	pub fn with(mut self, relative: impl Into<PathBuf>, handler: H) -> Self {
		self.insert(relative, handler);
		self
	}
}

impl<H: Clone> HandlerLoader<H> for HandlerMap<H> {
	fn load(&self, file: &RouteFile) -> anyhow::Result<H> {
		self.handlers
			.get(&file.relative)
			.cloned()
			.ok_or_else(|| anyhow!("no handler registered for {}", file.relative.display()))
	}
}

#[derive(Debug, PartialEq, Eq)]
pub enum FilenameError {
	MissingMethod,
	UnknownMethod(String),
	Pattern(PatternError),
}

/// Splits a route file name into its path fragment and method.
///
/// `users.get.rs` yields a `users` segment bound to `GET`; `index.post.rs` yields no
/// segment, so the route sits on its directory's own path. Components after the method
/// are ignored.
pub fn parse_filename(name: &str) -> Result<(Option<Segment>, Method), FilenameError> {
	let mut parts = name.split('.');
	let fragment = parts.next().unwrap_or_default();
	let token = parts
		.next()
		.filter(|token| !token.is_empty())
		.ok_or(FilenameError::MissingMethod)?;

	let method = token
		.parse::<Method>()
		.map_err(|e| FilenameError::UnknownMethod(e.0))?;

	let segment = match fragment {
		"index" => None,
		fragment => Some(Segment::parse(fragment).map_err(FilenameError::Pattern)?),
	};

	Ok((segment, method))
}

/// Derives routes from a directory tree.
///
/// Directories become path segments and each regular file becomes one route named
/// `<fragment>.<method>.<ext>`. Brackets mark parameters in both: `users/[id].get.rs`
/// is `GET /api/users/:id`.
///
/// Entries whose name starts with `.` are hidden and skipped, files and directories alike,
/// so `.gitkeep` or an editor swap file never becomes a route. A file named `.get.js` is
/// therefore ignored rather than mounted on its directory; use `index.get.js` for that.
#[derive(Debug, Clone)]
pub struct Discovery<L = FsListing> {
	root: PathBuf,
	prefix: PathTemplate,
	listing: L,
}

impl Discovery<FsListing> {
	pub fn new(root: impl Into<PathBuf>) -> Self {
		Self {
			root: root.into(),
			prefix: crate::path![api],
			listing: FsListing,
		}
	}
}

impl<L: DirectoryListing> Discovery<L> {
	/// Sets the path every discovered route is mounted under. Defaults to `/api`.
	pub fn prefix(mut self, prefix: PathTemplate) -> Self {
		self.prefix = prefix;
		self
	}

	pub fn listing<M: DirectoryListing>(self, listing: M) -> Discovery<M> {
		Discovery {
			root: self.root,
			prefix: self.prefix,
			listing,
		}
	}

	pub fn root(&self) -> &Path {
		&self.root
	}

	/// Walks the tree once and returns its routes in discovery order.
	pub fn discover<H>(&self, loader: &impl HandlerLoader<H>) -> Result<Vec<Route<H>>> {
		let mut routes = Vec::new();
		let mut segments = self.prefix.segments().to_vec();
		self.walk(Path::new(""), &mut segments, loader, &mut routes)?;
		Ok(routes)
	}

	fn walk<H>(
		&self,
		relative: &Path,
		segments: &mut Vec<Segment>,
		loader: &impl HandlerLoader<H>,
		routes: &mut Vec<Route<H>>,
	) -> Result<()> {
		let dir = match relative.as_os_str().is_empty() {
			true => self.root.clone(),
			false => self.root.join(relative),
		};
		let entries = self
			.listing
			.entries(&dir)
			.map_err(|source| Error::FileSystem { path: dir, source })?;

		for entry in entries {
			let relative = relative.join(&entry.name);
			let name = entry
				.name
				.to_str()
				.ok_or_else(|| Error::NonUtf8Name(relative.clone()))?;

			if name.starts_with('.') {
				debug!(path = %relative.display(), "skipping hidden entry");
				continue;
			}

			match entry.kind {
				EntryKind::File => routes.push(self.load_route(relative, segments, loader)?),
				EntryKind::Directory => {
					let segment = Segment::parse(name).map_err(|source| Error::InvalidPattern {
						file: relative.clone(),
						source,
					})?;
					segments.push(segment);
					let walked = self.walk(&relative, segments, loader, routes);
					segments.pop();
					walked?;
				}
				EntryKind::Other => {
					debug!(
						path = %relative.display(),
						"skipping entry that is neither file nor directory"
					);
				}
			}
		}

		Ok(())
	}

	fn load_route<H>(
		&self,
		relative: PathBuf,
		segments: &[Segment],
		loader: &impl HandlerLoader<H>,
	) -> Result<Route<H>> {
		let name = relative
			.file_name()
			.and_then(|name| name.to_str())
			.ok_or_else(|| Error::NonUtf8Name(relative.clone()))?;

		let (fragment, method) = match parse_filename(name) {
			Ok(parsed) => parsed,
			Err(FilenameError::MissingMethod) => return Err(Error::MissingMethod(relative)),
			Err(FilenameError::UnknownMethod(token)) => {
				return Err(Error::UnknownMethod {
					file: relative,
					token,
				})
			}
			Err(FilenameError::Pattern(source)) => {
				return Err(Error::InvalidPattern {
					file: relative,
					source,
				})
			}
		};

		let segments = segments.iter().cloned().chain(fragment).collect();
		let template = PathTemplate::from_segments(segments);
		if let Err(source) = template.check_unique_params() {
			return Err(Error::InvalidPattern {
				file: relative,
				source,
			});
		}

		let file = RouteFile {
			path: self.root.join(&relative),
			relative,
		};
		let handler = loader.load(&file).map_err(|source| Error::HandlerLoad {
			file: file.relative.clone(),
			source,
		})?;

		debug!(%method, path = %template, file = %file.relative.display(), "discovered route");
		Ok(Route::new(template, method, handler))
	}
}
