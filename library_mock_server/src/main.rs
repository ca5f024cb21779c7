use std::env;
use std::net::TcpListener;
use std::sync::Arc;

use anyhow::Context;
use opentelemetry::global;
use opentelemetry_sdk::propagation::TraceContextPropagator;
use opentelemetry_sdk::runtime::TokioCurrentThread;
use tracing_bunyan_formatter::{BunyanFormattingLayer, JsonStorageLayer};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{EnvFilter, Registry};

use library_mock_server::library_store::{InMemoryLibraryStore, LibraryStore};

/// Installs JSON logs on stdout and span export to a Jaeger agent,
/// log level taken from `RUST_LOG` with `info` as default
fn init_telemetry(service_name: &str) -> anyhow::Result<()> {
    global::set_text_map_propagator(TraceContextPropagator::new());
    #[allow(deprecated)]
    let tracer = opentelemetry_jaeger::new_agent_pipeline()
        .with_service_name(service_name)
        .install_batch(TokioCurrentThread)
        .context("Failed to install Jaeger span exporter")?;

    let subscriber = Registry::default()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_opentelemetry::layer().with_tracer(tracer))
        .with(JsonStorageLayer)
        .with(BunyanFormattingLayer::new(
            service_name.to_string(),
            std::io::stdout,
        ));
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set global tracing subscriber")
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    init_telemetry("library_mock_server")?;

    let port: u16 = env::var("PORT")
        .ok()
        .and_then(|port| port.parse().ok())
        .unwrap_or(8080);
    let listener = TcpListener::bind(("0.0.0.0", port)).context("Failed to bind port")?;
    tracing::info!("starting library mock server at http://localhost:{}/api", port);

    let store: Arc<dyn LibraryStore> = Arc::new(InMemoryLibraryStore::default());
    library_mock_server::run(listener, store)?
        .await
        .context("Library mock server failed")
}
