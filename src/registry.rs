use crate::{
	route::{Method, Route},
	template::PathTemplate,
};
use std::collections::HashMap;
use tracing::{info, warn};

/// The outcome of adding a route to a [`RoutesRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum Registration {
	Added,
	/// The path and method were already taken; the new route was dropped.
	Duplicate,
}

/// Every route registered under one path template.
#[derive(Debug, Clone)]
pub struct PathRoutes<H> {
	key: String,
	template: PathTemplate,
	routes: HashMap<Method, Route<H>>,
}

impl<H> PathRoutes<H> {
	pub fn key(&self) -> &str {
		&self.key
	}

	pub fn template(&self) -> &PathTemplate {
		&self.template
	}

	pub fn get(&self, method: Method) -> Option<&Route<H>> {
		self.routes.get(&method)
	}

	pub fn methods(&self) -> impl Iterator<Item = Method> + '_ {
		self.routes.keys().copied()
	}

	pub fn routes(&self) -> impl Iterator<Item = &Route<H>> {
		self.routes.values()
	}
}

/// The route table, keyed by canonical template string and then by method.
///
/// Paths keep the order they were first registered in, which is the order the dispatcher
/// tries them in.
#[derive(Debug, Clone)]
pub struct RoutesRegistry<H> {
	paths: Vec<PathRoutes<H>>,
	index: HashMap<String, usize>,
}

impl<H> Default for RoutesRegistry<H> {
	fn default() -> Self {
		Self {
			paths: Vec::new(),
			index: HashMap::new(),
		}
	}
}

impl<H> RoutesRegistry<H> {
	pub fn new() -> Self {
		Self::default()
	}

	/// Adds a route unless its path and method are already registered.
	///
	/// The first registration wins. A duplicate is logged as a warning and dropped, which
	/// keeps the table independent of the order routes arrive in.
	pub fn add(&mut self, route: Route<H>) -> Registration {
		let key = route.key();
		let method = route.method();

		let slot = match self.index.get(&key) {
			Some(&slot) => slot,
			None => {
				self.index.insert(key.clone(), self.paths.len());
				self.paths.push(PathRoutes {
					key: key.clone(),
					template: route.template().clone(),
					routes: HashMap::new(),
				});
				self.paths.len() - 1
			}
		};

		let routes = &mut self.paths[slot].routes;
		if routes.contains_key(&method) {
			warn!(%method, path = %key, "handler already registered, ignoring");
			return Registration::Duplicate;
		}

		info!(%method, path = %key, "adding handler");
		routes.insert(method, route);
		Registration::Added
	}

	/// All path entries in registry order.
	pub fn get_all(&self) -> &[PathRoutes<H>] {
		&self.paths
	}

	pub fn get(&self, path: &str, method: Method) -> Option<&Route<H>> {
		self.index
			.get(path)
			.and_then(|&slot| self.paths[slot].get(method))
	}

	pub fn iter(&self) -> impl Iterator<Item = &Route<H>> {
		self.paths.iter().flat_map(PathRoutes::routes)
	}

	/// Number of routes, counting each method separately.
	pub fn len(&self) -> usize {
		self.paths.iter().map(|path| path.routes.len()).sum()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}

impl<H> Extend<Route<H>> for RoutesRegistry<H> {
	fn extend<I: IntoIterator<Item = Route<H>>>(&mut self, routes: I) {
		for route in routes {
			let _ = self.add(route);
		}
	}
}

impl<H> FromIterator<Route<H>> for RoutesRegistry<H> {
	fn from_iter<I: IntoIterator<Item = Route<H>>>(routes: I) -> Self {
		let mut registry = Self::new();
		registry.extend(routes);
		registry
	}
}

#[cfg(test)]
mod test {
	use super::{Registration, RoutesRegistry};
	use crate::{Method, PathTemplate, Route};
	use std::sync::{
		atomic::{AtomicUsize, Ordering},
		Arc,
	};
	use tracing::{Event, Level, Subscriber};
	use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

	fn route(path: &str, method: Method, handler: u32) -> Route<u32> {
		Route::new(PathTemplate::compile(path).unwrap(), method, handler)
	}

	#[test]
	fn first_registration_wins() {
		let mut registry = RoutesRegistry::new();
		assert_eq!(registry.add(route("/api/users", Method::Get, 1)), Registration::Added);
		assert_eq!(registry.add(route("/api/users/", Method::Get, 2)), Registration::Duplicate);

		assert_eq!(registry.len(), 1);
		assert_eq!(registry.get("/api/users", Method::Get).map(|r| *r.handler()), Some(1));
	}

	#[derive(Default)]
	struct LevelCounter {
		info: AtomicUsize,
		warn: AtomicUsize,
	}

	struct CountLevels(Arc<LevelCounter>);

	impl<S: Subscriber> Layer<S> for CountLevels {
		fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
			match *event.metadata().level() {
				Level::INFO => self.0.info.fetch_add(1, Ordering::SeqCst),
				Level::WARN => self.0.warn.fetch_add(1, Ordering::SeqCst),
				_ => 0,
			};
		}
	}

	#[test]
	fn logs_each_add_and_each_duplicate_once() {
		let counter = Arc::new(LevelCounter::default());
		let subscriber = tracing_subscriber::registry().with(CountLevels(counter.clone()));

		tracing::subscriber::with_default(subscriber, || {
			let mut registry = RoutesRegistry::new();
			let _ = registry.add(route("/api/users", Method::Get, 1));
			let _ = registry.add(route("/api/users", Method::Post, 2));
			let _ = registry.add(route("/api/users/", Method::Get, 3));
		});

		assert_eq!(counter.info.load(Ordering::SeqCst), 2);
		assert_eq!(counter.warn.load(Ordering::SeqCst), 1);
	}

	#[test]
	fn bracket_and_colon_forms_collide() {
		let mut registry = RoutesRegistry::new();
		assert_eq!(registry.add(route("/users/[id]", Method::Get, 1)), Registration::Added);
		assert_eq!(registry.add(route("/users/:id", Method::Get, 2)), Registration::Duplicate);
		assert_eq!(registry.get_all().len(), 1);
	}

	#[test]
	fn methods_share_a_path() {
		let registry: RoutesRegistry<u32> = vec![
			route("/users/[id]", Method::Get, 1),
			route("/users/[id]", Method::Delete, 2),
			route("/users", Method::Post, 3),
		]
		.into_iter()
		.collect();

		assert_eq!(registry.len(), 3);
		let paths = registry.get_all();
		assert_eq!(paths.len(), 2);
		assert_eq!(paths[0].key(), "/users/:id");
		assert_eq!(paths[1].key(), "/users");

		let mut methods = paths[0].methods().collect::<Vec<_>>();
		methods.sort_by_key(|m| m.as_str());
		assert_eq!(methods, vec![Method::Delete, Method::Get]);
	}

	#[test]
	fn stored_routes_match_their_key() {
		let registry: RoutesRegistry<u32> = vec![
			route("/a/[x]/", Method::Get, 1),
			route("/b", Method::Put, 2),
		]
		.into_iter()
		.collect();

		for path in registry.get_all() {
			for route in path.routes() {
				assert_eq!(route.key(), path.key());
			}
		}
	}
}
