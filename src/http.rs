use crate::{
	config::Config,
	discovery::{Discovery, HandlerLoader, RouteFile},
	dispatcher::{Dispatcher, Matched},
	registry::{Registration, RoutesRegistry},
	route::Method,
	template::{Params, PathTemplate, PatternError},
};
use anyhow::{anyhow, Error, Result};
use hyper::{
	body::{Body, Bytes},
	http::{
		header::{HeaderName, HeaderValue},
		response::Builder,
		HeaderMap, StatusCode, Uri,
	},
	service::Service,
};
use std::{
	convert::Infallible,
	fs,
	future::{ready, Future, Ready},
	net::SocketAddr,
	pin::Pin,
	sync::{Arc, Mutex, PoisonError},
	task::{Context, Poll},
};
use tokio::{sync::oneshot, task::JoinHandle};
use tracing::{debug, error, info};

pub use hyper;

pub type Request = hyper::Request<Body>;
pub type Response = hyper::Response<Body>;

/// Header carrying the crate version on every response.
pub const VERSION_HEADER: &str = "x-warren-version";

pub type HandlerFuture = Pin<Box<dyn Future<Output = Result<()>> + Send>>;

/// A route handler. It receives the request and a [`Responder`] it must answer through.
pub type Handler = Arc<dyn Fn(RouteRequest, Responder) -> HandlerFuture + Send + Sync>;

/// Wraps an async function as a [`Handler`].
pub fn handler<F, Fut>(f: F) -> Handler
where
	F: Fn(RouteRequest, Responder) -> Fut + Send + Sync + 'static,
	Fut: Future<Output = Result<()>> + Send + 'static,
{
	Arc::new(move |req, res| Box::pin(f(req, res)))
}

/// Loads a route file by serving its contents as the response body.
///
/// The file is read once, at discovery time.
pub fn fixture_loader(file: &RouteFile) -> Result<Handler> {
	let body = Bytes::from(fs::read(&file.path)?);
	Ok(handler(move |_req, res| {
		let body = body.clone();
		async move { res.send(body) }
	}))
}

impl TryFrom<&hyper::Method> for Method {
	type Error = crate::route::UnknownMethod;

	fn try_from(method: &hyper::Method) -> Result<Self, Self::Error> {
		method.as_str().parse()
	}
}

impl From<Method> for hyper::Method {
	fn from(method: Method) -> Self {
		match method {
			Method::Get => hyper::Method::GET,
			Method::Head => hyper::Method::HEAD,
			Method::Post => hyper::Method::POST,
			Method::Put => hyper::Method::PUT,
			Method::Delete => hyper::Method::DELETE,
			Method::Connect => hyper::Method::CONNECT,
			Method::Options => hyper::Method::OPTIONS,
			Method::Trace => hyper::Method::TRACE,
			Method::Patch => hyper::Method::PATCH,
		}
	}
}

/// The request handed to a handler, with the parameters its route captured.
#[derive(Debug)]
pub struct RouteRequest {
	inner: Request,
	template: PathTemplate,
	params: Params,
}

impl RouteRequest {
	pub fn params(&self) -> &Params {
		&self.params
	}

	pub fn param(&self, name: &str) -> Option<&str> {
		self.params.get(name)
	}

	/// The template of the route that matched.
	pub fn template(&self) -> &PathTemplate {
		&self.template
	}

	pub fn method(&self) -> &hyper::Method {
		self.inner.method()
	}

	/// The full request URI, query string included.
	pub fn uri(&self) -> &Uri {
		self.inner.uri()
	}

	pub fn headers(&self) -> &HeaderMap {
		self.inner.headers()
	}

	pub fn inner(&self) -> &Request {
		&self.inner
	}

	pub fn into_inner(self) -> Request {
		self.inner
	}
}

type ResponseSlot = Arc<Mutex<Option<oneshot::Sender<Response>>>>;

fn take_sender(slot: &ResponseSlot) -> Option<oneshot::Sender<Response>> {
	slot.lock().unwrap_or_else(PoisonError::into_inner).take()
}

/// Writes the one response a handler owes its request.
///
/// `send` consumes the responder, so a second response cannot be written.
#[derive(Debug)]
pub struct Responder {
	builder: Builder,
	slot: ResponseSlot,
}

impl Responder {
	pub fn status(mut self, status: u16) -> Self {
		self.builder = self.builder.status(status);
		self
	}

	pub fn header(mut self, name: &str, value: &str) -> Self {
		self.builder = self.builder.header(name, value);
		self
	}

	pub fn send(self, body: impl Into<Body>) -> Result<()> {
		let response = self.builder.body(body.into())?;
		take_sender(&self.slot)
			.ok_or_else(|| anyhow!("response already sent"))?
			.send(response)
			.map_err(|_| anyhow!("client went away before the response was sent"))
	}
}

fn default_error_handler(e: Error) -> Response {
	let mut response = Response::new(e.to_string().into());
	*response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
	response
}

fn default_not_found_handler(_req: Request) -> Response {
	let mut response = Response::new(Body::empty());
	*response.status_mut() = StatusCode::NOT_FOUND;
	response
}

fn with_version(mut response: Response) -> Response {
	response.headers_mut().insert(
		HeaderName::from_static(VERSION_HEADER),
		HeaderValue::from_static(env!("CARGO_PKG_VERSION")),
	);
	response
}

/// A function that can convert an error into a response.
pub type ErrorHandler = fn(e: Error) -> Response;

/// A function that handles unroutable requests and creates a response.
pub type NotFoundHandler = fn(req: Request) -> Response;

/// Hyper make-service that routes every connection through one [`Dispatcher`].
#[derive(Clone)]
pub struct HttpRouter {
	dispatcher: Arc<Dispatcher<Handler>>,
	internal_error: ErrorHandler,
	not_found: NotFoundHandler,
}

impl From<Arc<Dispatcher<Handler>>> for HttpRouter {
	fn from(dispatcher: Arc<Dispatcher<Handler>>) -> Self {
		Self {
			dispatcher,
			internal_error: default_error_handler,
			not_found: default_not_found_handler,
		}
	}
}

impl HttpRouter {
	pub fn internal_error_handler(mut self, handler: ErrorHandler) -> Self {
		self.internal_error = handler;
		self
	}

	pub fn not_found_handler(mut self, handler: NotFoundHandler) -> Self {
		self.not_found = handler;
		self
	}

	pub fn handler(&self) -> RouteHandler {
		RouteHandler {
			dispatcher: Arc::clone(&self.dispatcher),
			internal_error: self.internal_error,
			not_found: self.not_found,
		}
	}
}

impl<T> Service<T> for HttpRouter {
	type Response = RouteHandler;
	type Error = Infallible;
	type Future = Ready<Result<Self::Response, Self::Error>>;

	fn poll_ready(&mut self, _: &mut Context) -> Poll<Result<(), Self::Error>> {
		Poll::Ready(Ok(()))
	}

	fn call(&mut self, _: T) -> Self::Future {
		ready(Ok(self.handler()))
	}
}

/// Responsible for handling the actual HTTP requests from hyper.
pub struct RouteHandler {
	dispatcher: Arc<Dispatcher<Handler>>,
	internal_error: ErrorHandler,
	not_found: NotFoundHandler,
}

impl RouteHandler {
	/// Starts the handler without waiting for it; the returned future only waits for its
	/// response. A handler that fails, or finishes without responding, yields an internal
	/// error response instead of a hung connection.
	fn dispatch(&self, matched: Matched<Handler>, req: Request) -> impl Future<Output = Response> {
		let Matched { route, params } = matched;
		let (sender, receiver) = oneshot::channel();
		let slot: ResponseSlot = Arc::new(Mutex::new(Some(sender)));

		let request = RouteRequest {
			inner: req,
			template: route.template().clone(),
			params,
		};
		let responder = Responder {
			builder: Builder::default(),
			slot: Arc::clone(&slot),
		};

		let fut = (route.handler())(request, responder);
		let internal_error = self.internal_error;
		let method = route.method();
		let path = route.key();

		tokio::spawn(async move {
			if let Err(e) = fut.await {
				error!(%method, %path, error = %e, "handler failed");
				if let Some(sender) = take_sender(&slot) {
					let _ = sender.send(internal_error(e));
				}
			}
		});

		async move {
			receiver
				.await
				.unwrap_or_else(|_| {
					internal_error(anyhow!("handler finished without sending a response"))
				})
		}
	}
}

impl Service<Request> for RouteHandler {
	type Response = Response;
	type Error = Infallible;
	type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

	fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
		Poll::Ready(Ok(()))
	}

	fn call(&mut self, req: Request) -> Self::Future {
		let uri = req.uri().clone();
		let url = uri.path_and_query().map_or("/", |pq| pq.as_str());

		let matched = Method::try_from(req.method())
			.ok()
			.and_then(|method| self.dispatcher.resolve(url, method));

		match matched {
			Some(matched) => {
				debug!(
					method = %req.method(),
					%url,
					path = %matched.route.template(),
					"found handler"
				);
				let response = self.dispatch(matched, req);
				Box::pin(async move { Ok(with_version(response.await)) })
			}
			None => {
				debug!(method = %req.method(), %url, "no handler found");
				let response = (self.not_found)(req);
				Box::pin(async { Ok(with_version(response)) })
			}
		}
	}
}

/// Owns the route table and serves it over HTTP.
pub struct ApiServer {
	dispatcher: Arc<Dispatcher<Handler>>,
	router: HttpRouter,
}

impl From<Dispatcher<Handler>> for ApiServer {
	fn from(dispatcher: Dispatcher<Handler>) -> Self {
		let dispatcher = Arc::new(dispatcher);
		Self {
			router: HttpRouter::from(Arc::clone(&dispatcher)),
			dispatcher,
		}
	}
}

impl ApiServer {
	/// Discovers every route under `config.root` before anything is served.
	pub fn from_config(config: &Config, loader: &impl HandlerLoader<Handler>) -> Result<Self> {
		let discovery = Discovery::new(&config.root).prefix(config.prefix_template()?);
		let registry: RoutesRegistry<Handler> = discovery.discover(loader)?.into_iter().collect();
		Ok(Dispatcher::from(registry).into())
	}

	pub fn internal_error_handler(mut self, handler: ErrorHandler) -> Self {
		self.router = self.router.internal_error_handler(handler);
		self
	}

	pub fn not_found_handler(mut self, handler: NotFoundHandler) -> Self {
		self.router = self.router.not_found_handler(handler);
		self
	}

	pub fn dispatcher(&self) -> &Dispatcher<Handler> {
		&self.dispatcher
	}

	pub fn router(&self) -> HttpRouter {
		self.router.clone()
	}

	pub fn route(
		&self,
		path: &str,
		method: Method,
		handler: Handler,
	) -> Result<Registration, PatternError> {
		self.dispatcher.route(path, method, handler)
	}

	pub fn get(&self, path: &str, handler: Handler) -> Result<Registration, PatternError> {
		self.dispatcher.get(path, handler)
	}

	/// Binds `addr` and starts serving in the background.
	pub async fn start(&self, addr: impl Into<SocketAddr>) -> Result<RunningServer> {
		let addr = addr.into();
		info!(%addr, "starting server");

		let server = hyper::Server::try_bind(&addr)?.serve(self.router());
		let local_addr = server.local_addr();
		let (shutdown, signal) = oneshot::channel::<()>();
		let task = tokio::spawn(server.with_graceful_shutdown(async move {
			let _ = signal.await;
		}));

		info!(addr = %local_addr, routes = self.dispatcher.snapshot().len(), "server started");
		Ok(RunningServer {
			local_addr,
			shutdown,
			task,
			dispatcher: Arc::clone(&self.dispatcher),
		})
	}
}

/// A server started by [`ApiServer::start`].
pub struct RunningServer {
	local_addr: SocketAddr,
	shutdown: oneshot::Sender<()>,
	task: JoinHandle<Result<(), hyper::Error>>,
	dispatcher: Arc<Dispatcher<Handler>>,
}

impl RunningServer {
	pub fn local_addr(&self) -> SocketAddr {
		self.local_addr
	}

	pub fn route(
		&self,
		path: &str,
		method: Method,
		handler: Handler,
	) -> Result<Registration, PatternError> {
		self.dispatcher.route(path, method, handler)
	}

	pub fn get(&self, path: &str, handler: Handler) -> Result<Registration, PatternError> {
		self.dispatcher.get(path, handler)
	}

	/// Stops accepting connections and waits for in-flight ones to finish.
	pub async fn close(self) -> Result<()> {
		info!(addr = %self.local_addr, "closing server");
		let _ = self.shutdown.send(());
		self.task.await??;
		info!("server closed");
		Ok(())
	}
}
