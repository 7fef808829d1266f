//! scanward binary entry point.

#[tokio::main]
async fn main() {
	tracing_subscriber::fmt()
		.with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
		.init();

	if let Err(err) = scanward::run().await {
		tracing::error!("fatal: {}", err);
		std::process::exit(1);
	}
}

// vim: ts=4
