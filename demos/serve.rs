//! Serves every file under the configured root as a mock API.
//!
//! ```text
//! cargo run --example serve -- warren.toml
//! ```

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use warren::{fixture_loader, handler, path, ApiServer, Config, Method, Route};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	tracing_subscriber::registry()
		.with(
			tracing_subscriber::EnvFilter::try_from_default_env()
				.unwrap_or_else(|_| "warren=debug".into()),
		)
		.with(tracing_subscriber::fmt::layer())
		.init();

	let config = match std::env::args().nth(1) {
		Some(path) => Config::load(path)?,
		None => Config::default(),
	};

	let server = ApiServer::from_config(&config, &fixture_loader)?;
	let _ = server.dispatcher().add(Route::new(
		path![health],
		Method::Get,
		handler(|_req, res| async move { res.send("ok") }),
	));

	let running = server.start(([0, 0, 0, 0], config.port)).await?;
	println!("Listening on http://{}", running.local_addr());

	tokio::signal::ctrl_c().await?;
	running.close().await
}
