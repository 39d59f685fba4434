//! Prometheus metrics for the RAG chat pipeline.
//!
//! Exposes:
//! - `lightrag_chat_turn_duration_seconds` (histogram)
//! - `lightrag_chat_turn_total` (counter with outcome)
//! - `lightrag_chat_turn_inflight` (gauge)
//! - `lightrag_chat_context_hits_total` (counter by kind)
//! - process metrics via `process` collector

use std::convert::Infallible;
use std::net::SocketAddr;
use std::time::Duration;

use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use once_cell::sync::Lazy;
use prometheus::process_collector::ProcessCollector;
use prometheus::{
    default_registry, register_histogram, register_int_counter_vec, register_int_gauge,
    Encoder, Histogram, IntCounterVec, IntGauge, TextEncoder,
};
use tokio::net::TcpListener;
use tracing::{error, info, warn};

static PROCESS_COLLECTOR: Lazy<()> = Lazy::new(|| {
    if let Err(err) = default_registry().register(Box::new(ProcessCollector::for_self())) {
        warn!("Failed to register process collector: {}", err);
    }
});

static TURN_DURATION: Lazy<Histogram> = Lazy::new(|| {
    // Exponential buckets from 50ms up to ~3 minutes.
    let buckets =
        prometheus::exponential_buckets(0.05, 2.0, 14).expect("failed to create histogram buckets");
    register_histogram!(
        "lightrag_chat_turn_duration_seconds",
        "Chat turn duration in seconds",
        buckets
    )
    .expect("failed to register turn duration histogram")
});

static TURN_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "lightrag_chat_turn_total",
        "Total chat turns by outcome",
        &["outcome"]
    )
    .expect("failed to register turn counter")
});

static TURN_INFLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!("lightrag_chat_turn_inflight", "Number of in-flight chat turns")
        .expect("failed to register inflight gauge")
});

static CONTEXT_HITS: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "lightrag_chat_context_hits_total",
        "Context hits that passed the distance threshold",
        &["kind"]
    )
    .expect("failed to register context hit counter")
});

/// Ensure collectors are registered.
fn init_collectors() {
    Lazy::force(&PROCESS_COLLECTOR);
    Lazy::force(&TURN_DURATION);
    Lazy::force(&TURN_TOTAL);
    Lazy::force(&TURN_INFLIGHT);
    Lazy::force(&CONTEXT_HITS);
}

/// Increment inflight gauge when a turn starts.
pub fn record_turn_start() {
    init_collectors();
    TURN_INFLIGHT.inc();
}

/// Record turn completion with duration and outcome (`ok`, `embedding_failed`, ...).
pub fn record_turn_result(outcome: &'static str, duration: Duration) {
    init_collectors();
    TURN_INFLIGHT.dec();
    TURN_DURATION.observe(duration.as_secs_f64());
    TURN_TOTAL.with_label_values(&[outcome]).inc();
}

/// Count entity and relation hits that made it into a context block.
pub fn record_context_hits(entities: usize, relations: usize) {
    init_collectors();
    CONTEXT_HITS
        .with_label_values(&["entity"])
        .inc_by(entities as u64);
    CONTEXT_HITS
        .with_label_values(&["relation"])
        .inc_by(relations as u64);
}

#[cfg(test)]
pub(crate) fn turn_total(outcome: &str) -> u64 {
    init_collectors();
    TURN_TOTAL.with_label_values(&[outcome]).get()
}

async fn metrics_response() -> Result<Response<Full<Bytes>>, Infallible> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(err) = encoder.encode(&metric_families, &mut buffer) {
        error!("Failed to encode metrics: {}", err);
        return Ok(Response::builder()
            .status(StatusCode::INTERNAL_SERVER_ERROR)
            .body(Full::from("encode error"))
            .unwrap());
    }

    Ok(Response::builder()
        .status(StatusCode::OK)
        .header(hyper::header::CONTENT_TYPE, encoder.format_type())
        .body(Full::from(buffer))
        .unwrap())
}

async fn handle_request(req: Request<Incoming>) -> Result<Response<Full<Bytes>>, Infallible> {
    match req.uri().path() {
        "/metrics" => metrics_response().await,
        _ => Ok(Response::builder()
            .status(StatusCode::NOT_FOUND)
            .body(Full::new(Bytes::new()))
            .unwrap()),
    }
}

async fn serve(addr: SocketAddr) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "Prometheus metrics endpoint started");

    loop {
        let (stream, peer) = listener.accept().await?;
        let service = service_fn(handle_request);
        let io = TokioIo::new(stream);

        tokio::spawn(async move {
            if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                warn!(?peer, "Metrics connection error: {}", err);
            }
        });
    }
}

/// Spawn the metrics HTTP endpoint on the given address.
pub fn spawn_metrics_server(addr: SocketAddr) {
    init_collectors();
    tokio::spawn(async move {
        if let Err(err) = serve(addr).await {
            error!(%addr, "Metrics server failed: {}", err);
        }
    });
}
