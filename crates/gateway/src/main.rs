use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use clap::Parser;
use opentelemetry_sdk::trace::SdkTracerProvider;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use opentelemetry::trace::TracerProvider as _;
use opentelemetry_otlp::WithExportConfig as _;

use tl_domain::config::{Config, LogFormat, ObservabilityConfig};
use tl_gateway::{api, bootstrap, cors};
use tl_gateway::cli::{Cli, Command, ConfigCommand};
use tl_gateway::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        // Default to serve when no subcommand is given.
        None | Some(Command::Serve) => {
            let (config, _config_path) = tl_gateway::cli::load_config()?;
            let tracer_provider = init_tracing(&config.observability);
            run_server(Arc::new(config), tracer_provider).await
        }
        Some(Command::Doctor) => {
            init_cli_tracing();
            let (config, config_path) = tl_gateway::cli::load_config()?;
            let passed = tl_gateway::cli::doctor::run(&config, &config_path).await?;
            if !passed {
                std::process::exit(1);
            }
            Ok(())
        }
        Some(Command::Config(ConfigCommand::Validate)) => {
            let (config, config_path) = tl_gateway::cli::load_config()?;
            if !tl_gateway::cli::config::validate(&config, &config_path) {
                std::process::exit(1);
            }
            Ok(())
        }
        Some(Command::Config(ConfigCommand::Show)) => {
            let (config, _config_path) = tl_gateway::cli::load_config()?;
            tl_gateway::cli::config::show(&config)
        }
        Some(Command::Version) => {
            println!("threadline {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

/// Install the `serve` subscriber: env filter, JSON or pretty output and,
/// when `otlp_endpoint` is set, an OpenTelemetry span exporter.
///
/// The returned provider must be shut down on exit to flush spans.
fn init_tracing(obs: &ObservabilityConfig) -> Option<SdkTracerProvider> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&obs.log_filter));

    let output = match obs.log_format {
        LogFormat::Json => tracing_subscriber::fmt::layer().json().boxed(),
        LogFormat::Pretty => tracing_subscriber::fmt::layer().pretty().boxed(),
    };

    // The subscriber is not up yet, so exporter failures go to stderr.
    let provider = obs
        .otlp_endpoint
        .as_deref()
        .and_then(|endpoint| match otlp_provider(endpoint, obs) {
            Ok(p) => Some(p),
            Err(e) => {
                eprintln!("WARNING: OTLP export to {endpoint} disabled: {e:#}");
                None
            }
        });
    let otel = provider
        .as_ref()
        .map(|p| tracing_opentelemetry::layer().with_tracer(p.tracer("threadline")));

    tracing_subscriber::registry()
        .with(filter)
        .with(output)
        .with(otel)
        .init();

    provider
}

fn otlp_provider(endpoint: &str, obs: &ObservabilityConfig) -> anyhow::Result<SdkTracerProvider> {
    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()
        .context("building OTLP span exporter")?;

    Ok(SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .with_sampler(opentelemetry_sdk::trace::Sampler::TraceIdRatioBased(
            obs.sample_rate,
        ))
        .with_resource(
            opentelemetry_sdk::Resource::builder()
                .with_service_name(obs.service_name.clone())
                .build(),
        )
        .build())
}

/// Compact stderr tracing for one-shot CLI commands.
fn init_cli_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

async fn run_server(
    config: Arc<Config>,
    tracer_provider: Option<SdkTracerProvider>,
) -> anyhow::Result<()> {
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "threadline starting");

    let state = bootstrap::build_app_state(config.clone())?;
    let app = build_app(&config, state.clone())?;

    let bind = (config.server.host.as_str(), config.server.port);
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("cannot listen on {}:{}", bind.0, bind.1))?;
    tracing::info!(
        addr = %listener.local_addr()?,
        prefix = %config.server.api_prefix,
        "threadline listening"
    );

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server terminated with an error")?;

    // In-flight requests have drained; persist and flush telemetry.
    if let Err(e) = state.store.flush().await {
        tracing::warn!(error = %e, "flushing user store failed");
    }
    if let Some(provider) = tracer_provider {
        if let Err(e) = provider.shutdown() {
            tracing::warn!(error = ?e, "flushing spans failed");
        }
    }

    tracing::info!("threadline stopped");
    Ok(())
}

/// Assemble routes, optional static files and the middleware stack.
fn build_app(config: &Config, state: AppState) -> anyhow::Result<Router> {
    let server = &config.server;
    let mut router = api::router(server);

    // ── Static frontend (optional) ───────────────────────────────────
    match &server.static_dir {
        Some(dir) if dir.is_dir() => {
            tracing::info!(dir = %dir.display(), "serving static files");
            router = router
                .nest_service("/static", ServeDir::new(dir))
                .route_service("/", ServeFile::new(dir.join("index.html")));
        }
        Some(dir) => {
            tracing::warn!(dir = %dir.display(), "static_dir does not exist; not serving static files");
        }
        None => {}
    }

    let mut router = router
        .layer(TraceLayer::new_for_http())
        .layer(cors::layer(&server.cors, &config.identity))
        .layer(tower::limit::ConcurrencyLimitLayer::new(
            server.max_concurrent_requests,
        ));

    // Outermost, so throttled clients never take a concurrency slot.
    if let Some(limit) = &server.rate_limit {
        let quota = tower_governor::governor::GovernorConfigBuilder::default()
            .per_second(limit.requests_per_second)
            .burst_size(limit.burst_size)
            .finish()
            .context("server.rate_limit values must be positive")?;
        router = router.layer(tower_governor::GovernorLayer {
            config: Arc::new(quota),
        });
        tracing::info!(
            per_second = limit.requests_per_second,
            burst = limit.burst_size,
            "client rate limiting on"
        );
    }

    Ok(router.with_state(state))
}

/// Wait for SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    {
        let sigterm = async {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut s) => {
                    s.recv().await;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "failed to register SIGTERM handler");
                    std::future::pending::<()>().await;
                }
            }
        };

        tokio::select! {
            _ = ctrl_c => tracing::info!("received SIGINT, shutting down"),
            _ = sigterm => tracing::info!("received SIGTERM, shutting down"),
        }
    }

    #[cfg(not(unix))]
    {
        ctrl_c.await;
        tracing::info!("received SIGINT, shutting down");
    }
}
