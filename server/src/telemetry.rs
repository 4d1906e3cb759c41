//! Logging setup and per-request store-call accounting.
//!
//! Console logging is always on. When `OTEL_EXPORTER_OTLP_ENDPOINT` is set
//! and reachable, traces and logs are also exported over OTLP.
//!
//! Every store call opens a `store.call` span. [`StoreCallCountingLayer`]
//! counts those spans per HTTP request so slow endpoints can be diagnosed
//! without a tracing backend.

use axum::{
    body::Body,
    extract::{MatchedPath, State},
    http::{HeaderValue, Request},
    middleware::Next,
    response::Response,
};
use opentelemetry::trace::TracerProvider;
use opentelemetry_appender_tracing::layer::OpenTelemetryTracingBridge;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::logs::SdkLoggerProvider;
use opentelemetry_sdk::trace::SdkTracerProvider;
use std::env;
use std::net::{TcpStream, ToSocketAddrs};
use std::sync::{
    atomic::{AtomicU32, Ordering},
    Arc,
};
use std::time::Duration;
use tower_http::classify::{ServerErrorsAsFailures, ServerErrorsFailureClass, SharedClassifier};
use tower_http::trace::{DefaultOnBodyChunk, DefaultOnEos, TraceLayer};
use tracing::{span::Id, Level, Span, Subscriber};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{layer::Context, registry::LookupSpan, EnvFilter, Layer};

use crate::api;
use crate::AppState;

pub const SERVICE_NAME: &str = "recipes-server";
pub const STORE_CALL_COUNT_HEADER: &str = "x-store-call-count";

/// Keeps the OpenTelemetry providers alive and flushes them on drop.
pub struct TelemetryGuard {
    providers: Option<(SdkTracerProvider, SdkLoggerProvider)>,
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        if let Some((traces, logs)) = self.providers.take() {
            let _ = traces.shutdown();
            let _ = logs.shutdown();
        }
    }
}

enum OtelStatus {
    Disabled,
    Unreachable(String),
    Failed(String, String),
    Enabled(String, String),
}

/// Install the global tracing subscriber. Hold the returned guard for the
/// lifetime of the process.
pub fn init_telemetry() -> TelemetryGuard {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = tracing_subscriber::fmt::layer();

    let service_name = env::var("OTEL_SERVICE_NAME").unwrap_or_else(|_| SERVICE_NAME.to_string());

    let (providers, status) = match env::var("OTEL_EXPORTER_OTLP_ENDPOINT").ok() {
        None => (None, OtelStatus::Disabled),
        Some(endpoint) if !is_reachable(&endpoint) => (None, OtelStatus::Unreachable(endpoint)),
        Some(endpoint) => match build_providers(&endpoint, &service_name) {
            Ok(providers) => (
                Some(providers),
                OtelStatus::Enabled(endpoint, service_name.clone()),
            ),
            Err(e) => (None, OtelStatus::Failed(endpoint, e)),
        },
    };

    let otel_trace_layer = providers.as_ref().map(|(traces, _)| {
        tracing_opentelemetry::layer().with_tracer(traces.tracer(service_name.clone()))
    });
    let otel_log_layer = providers
        .as_ref()
        .map(|(_, logs)| OpenTelemetryTracingBridge::new(logs));

    if let Some((traces, _)) = &providers {
        opentelemetry::global::set_tracer_provider(traces.clone());
    }

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .with(StoreCallCountingLayer)
        .with(otel_trace_layer)
        .with(otel_log_layer)
        .init();

    match status {
        OtelStatus::Disabled => {
            tracing::debug!("OTEL_EXPORTER_OTLP_ENDPOINT not set, using console logging only")
        }
        OtelStatus::Unreachable(endpoint) => tracing::info!(
            "OpenTelemetry endpoint {} not reachable, using console logging only",
            endpoint
        ),
        OtelStatus::Failed(endpoint, error) => tracing::warn!(
            "Failed to set up OpenTelemetry export to {}: {}; using console logging only",
            endpoint,
            error
        ),
        OtelStatus::Enabled(endpoint, service_name) => tracing::info!(
            "OpenTelemetry enabled, exporting traces and logs to {} as {}",
            endpoint,
            service_name
        ),
    }

    TelemetryGuard { providers }
}

/// Quick TCP check so a missing collector doesn't stall every export.
fn is_reachable(endpoint: &str) -> bool {
    let host_port = endpoint
        .trim_start_matches("http://")
        .trim_start_matches("https://")
        .trim_end_matches('/');

    host_port
        .to_socket_addrs()
        .ok()
        .and_then(|mut addrs| addrs.next())
        .map(|addr| TcpStream::connect_timeout(&addr, Duration::from_millis(100)).is_ok())
        .unwrap_or(false)
}

fn build_providers(
    endpoint: &str,
    service_name: &str,
) -> Result<(SdkTracerProvider, SdkLoggerProvider), String> {
    let resource = opentelemetry_sdk::Resource::builder()
        .with_service_name(service_name.to_string())
        .build();

    let trace_exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()
        .map_err(|e| format!("trace exporter: {e}"))?;

    let log_exporter = opentelemetry_otlp::LogExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()
        .map_err(|e| format!("log exporter: {e}"))?;

    let traces = SdkTracerProvider::builder()
        .with_batch_exporter(trace_exporter)
        .with_resource(resource.clone())
        .build();

    let logs = SdkLoggerProvider::builder()
        .with_batch_exporter(log_exporter)
        .with_resource(resource)
        .build();

    Ok((traces, logs))
}

/// HTTP tracing layer with the callbacks below plugged in.
pub type HttpTraceLayer = TraceLayer<
    SharedClassifier<ServerErrorsAsFailures>,
    fn(&Request<Body>) -> Span,
    fn(&Request<Body>, &Span),
    fn(&Response, Duration, &Span),
    DefaultOnBodyChunk,
    DefaultOnEos,
    fn(ServerErrorsFailureClass, Duration, &Span),
>;

/// One span per request, named by matched route. Health checks get a
/// trace-level span and no completion log.
pub fn trace_layer() -> HttpTraceLayer {
    TraceLayer::new_for_http()
        .make_span_with(request_span as fn(&Request<Body>) -> Span)
        .on_request(ignore_request as fn(&Request<Body>, &Span))
        .on_response(log_response as fn(&Response, Duration, &Span))
        .on_failure(log_failure as fn(ServerErrorsFailureClass, Duration, &Span))
}

fn request_span(request: &Request<Body>) -> Span {
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(MatchedPath::as_str)
        .unwrap_or(request.uri().path());

    if route == api::health::PATH {
        tracing::trace_span!("http_request")
    } else {
        tracing::info_span!("http_request", method = %request.method(), route = %route)
    }
}

fn ignore_request(_request: &Request<Body>, _span: &Span) {}

fn log_response(response: &Response, latency: Duration, span: &Span) {
    if span.metadata().map(|m| *m.level()) == Some(Level::TRACE) {
        return;
    }

    let status = response.status().as_u16();
    if status >= 500 {
        tracing::error!(
            status,
            latency_ms = %latency.as_millis(),
            "request failed with server error"
        );
    } else {
        tracing::info!(status, latency_ms = %latency.as_millis(), "request completed");
    }
}

fn log_failure(error: ServerErrorsFailureClass, latency: Duration, _span: &Span) {
    tracing::error!(error = %error, latency_ms = latency.as_millis(), "request failed");
}

tokio::task_local! {
    /// Store calls made while serving the current request.
    static STORE_CALL_COUNTER: Arc<AtomicU32>;
}

/// Store calls made so far by the current request, if counting is active.
pub fn get_store_call_count() -> Option<u32> {
    STORE_CALL_COUNTER
        .try_with(|counter| counter.load(Ordering::Relaxed))
        .ok()
}

/// Counts `store.call` spans against the request that created them.
///
/// The span is opened in the handler's task before the call moves to the
/// blocking pool, so the task-local counter is still in reach.
pub struct StoreCallCountingLayer;

impl<S> Layer<S> for StoreCallCountingLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(&self, _attrs: &tracing::span::Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(id) else {
            return;
        };

        if span.name() == "store.call" {
            let _ = STORE_CALL_COUNTER.try_with(|counter| {
                counter.fetch_add(1, Ordering::Relaxed);
            });
        }
    }
}

/// Middleware that opens a fresh store-call counter for each request.
/// Must be the outermost of the two counting middlewares.
pub async fn store_call_counting_middleware(request: Request<Body>, next: Next) -> Response {
    let counter = Arc::new(AtomicU32::new(0));
    STORE_CALL_COUNTER.scope(counter, next.run(request)).await
}

/// Middleware that reports the store-call count in a response header when
/// `track_store_calls` is enabled.
pub async fn store_call_count_header_middleware(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let mut response = next.run(request).await;

    if state.track_store_calls {
        if let Some(count) = get_store_call_count() {
            if let Ok(value) = HeaderValue::from_str(&count.to_string()) {
                response
                    .headers_mut()
                    .insert(STORE_CALL_COUNT_HEADER, value);
            }
        }
    }

    response
}
