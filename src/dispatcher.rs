use crate::{
	registry::{Registration, RoutesRegistry},
	route::{Method, Route},
	template::{Params, PathTemplate, PatternError},
};
use arc_swap::ArcSwap;
use std::sync::{Arc, Mutex};
use tracing::debug;

/// A route selected for a request, with the parameters captured from its URL.
#[derive(Debug, Clone)]
pub struct Matched<H> {
	pub route: Route<H>,
	pub params: Params,
}

/// What happened to a request handed to [`Dispatcher::handle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
	/// Exactly one handler was invoked.
	Dispatched,
	/// No route matched both path and method. Nothing was invoked.
	Unrouted,
}

/// Matches requests against a route table.
///
/// Reads take a lock-free snapshot of the table. Registrations made while requests are in
/// flight are serialized behind a writer lock and published as a new snapshot, so readers
/// never see a half-updated table.
#[derive(Debug)]
pub struct Dispatcher<H> {
	routes: ArcSwap<RoutesRegistry<H>>,
	writer: Mutex<()>,
}

impl<H> Default for Dispatcher<H> {
	fn default() -> Self {
		Self::from_registry(RoutesRegistry::default())
	}
}

impl<H> From<RoutesRegistry<H>> for Dispatcher<H> {
	fn from(registry: RoutesRegistry<H>) -> Self {
		Self::from_registry(registry)
	}
}

impl<H> Dispatcher<H> {
	pub fn from_registry(registry: RoutesRegistry<H>) -> Self {
		Self {
			routes: ArcSwap::from_pointee(registry),
			writer: Mutex::new(()),
		}
	}

	pub fn snapshot(&self) -> Arc<RoutesRegistry<H>> {
		self.routes.load_full()
	}

	/// Finds the route for `url` and `method`.
	///
	/// Paths are tried in registry order. The first one whose template matches the URL and
	/// which has a handler for the method is selected.
	pub fn resolve(&self, url: &str, method: Method) -> Option<Matched<H>>
	where
		H: Clone,
	{
		let routes = self.routes.load();
		routes.get_all().iter().find_map(|path| {
			let route = path.get(method)?;
			let params = path.template().matches(url)?;
			Some(Matched {
				route: route.clone(),
				params,
			})
		})
	}

	/// Resolves a request and hands the match to `invoke`, at most once.
	pub fn handle<F>(&self, url: &str, method: Method, invoke: F) -> Dispatch
	where
		H: Clone,
		F: FnOnce(Matched<H>),
	{
		match self.resolve(url, method) {
			Some(matched) => {
				debug!(%method, %url, path = %matched.route.template(), "found handler");
				invoke(matched);
				Dispatch::Dispatched
			}
			None => {
				debug!(%method, %url, "no handler found");
				Dispatch::Unrouted
			}
		}
	}
}

impl<H: Clone> Dispatcher<H> {
	/// Adds a route with the same first-wins policy as discovery.
	pub fn add(&self, route: Route<H>) -> Registration {
		let _guard = self.writer.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
		let mut registry = RoutesRegistry::clone(&self.routes.load());
		let registration = registry.add(route);
		if registration == Registration::Added {
			self.routes.store(Arc::new(registry));
		}
		registration
	}

	/// Registers `handler` for `method` on a path in bracket or colon notation.
	pub fn route(
		&self,
		path: &str,
		method: Method,
		handler: H,
	) -> Result<Registration, PatternError> {
		let template = PathTemplate::compile(path)?;
		Ok(self.add(Route::new(template, method, handler)))
	}

	pub fn get(&self, path: &str, handler: H) -> Result<Registration, PatternError> {
		self.route(path, Method::Get, handler)
	}
}
