//! Tracing setup shared by the binaries

use std::time::Duration;

use anyhow::Context;
use opentelemetry::trace::TracerProvider as _;
use opentelemetry_otlp::{SpanExporter, WithExportConfig};
use opentelemetry_sdk::{Resource, trace::SdkTracerProvider};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Registry};

use crate::config::LogArgs;

/// Keeps the log writers alive. Flushes everything on drop.
pub struct TelemetryGuard {
    _file_guard: Option<WorkerGuard>,
    provider: Option<SdkTracerProvider>,
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        if let Some(provider) = self.provider.take() {
            if let Err(e) = provider.shutdown() {
                eprintln!("error shutting down the tracer provider: {e}");
            }
        }
    }
}

/// Installs the global subscriber. Logs always go to stderr so stdout only
/// carries results.
///
/// Has to run inside the tokio runtime when an OTLP endpoint is configured.
pub fn init(service_name: &'static str, args: &LogArgs) -> anyhow::Result<TelemetryGuard> {
    _ = dotenvy::dotenv();

    let provider = args
        .otlp_endpoint
        .as_deref()
        .map(|endpoint| tracer_provider(service_name, endpoint))
        .transpose()?;

    let telemetry_layer = provider
        .as_ref()
        .map(|provider| tracing_opentelemetry::layer().with_tracer(provider.tracer(service_name)));

    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();

    let (file_log, file_guard) = match &args.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, format!("{service_name}.log"));
            let (non_blocking_appender, guard) = tracing_appender::non_blocking(appender);

            // A layer that logs events to rolling files.
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking_appender)
                .with_ansi(false)
                .pretty();

            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let stderr_log = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    Registry::default()
        .with(telemetry_layer)
        .with(file_log)
        .with(stderr_log)
        .with(env_filter)
        .try_init()
        .context("couldn't install the tracing subscriber")?;

    Ok(TelemetryGuard {
        _file_guard: file_guard,
        provider,
    })
}

fn tracer_provider(service_name: &'static str, endpoint: &str) -> anyhow::Result<SdkTracerProvider> {
    let exporter = SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .with_timeout(Duration::from_millis(1000))
        .build()
        .context("couldn't build the OTLP span exporter")?;

    Ok(SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .with_resource(Resource::builder().with_service_name(service_name).build())
        .build())
}
