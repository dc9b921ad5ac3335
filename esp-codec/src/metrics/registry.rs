//! Global metrics registry and collector definitions.

use std::sync::OnceLock;

use lazy_static::lazy_static;
use prometheus::{Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGaugeVec, Opts, Registry};

use crate::error::MetricsError;

static INITIALIZED: OnceLock<Result<(), String>> = OnceLock::new();

lazy_static! {
    /// Registry served at `/metrics`.
    pub static ref REGISTRY: Registry = Registry::new();

    // ============================================================================
    // Intake
    // ============================================================================

    pub static ref PACKETS_TOTAL: IntCounter = IntCounter::with_opts(
        Opts::new("packets_total", "Total number of packets read from the input")
            .namespace("esp_codec")
            .subsystem("intake")
    ).expect("failed to create packets_total metric");

    pub static ref BYTES_TOTAL: IntCounter = IntCounter::with_opts(
        Opts::new("bytes_total", "Total number of packet bytes read from the input")
            .namespace("esp_codec")
            .subsystem("intake")
    ).expect("failed to create bytes_total metric");

    /// Labels: status = "success" | "error"
    pub static ref CHANNEL_SENDS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("channel_sends_total", "Total number of packet hand-offs to decode workers")
            .namespace("esp_codec")
            .subsystem("intake"),
        &["status"]
    ).expect("failed to create channel_sends_total metric");

    // ============================================================================
    // Decode
    // ============================================================================

    /// Labels: codec, outcome = "rejected" | "opaque" | "decodable" | "ambiguous"
    pub static ref LAYERS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("layers_total", "Total number of protocol layers decoded, by codec and outcome")
            .namespace("esp_codec")
            .subsystem("decode"),
        &["codec", "outcome"]
    ).expect("failed to create layers_total metric");

    /// Labels: event
    pub static ref DECODER_EVENTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("events_total", "Total number of decoder events raised")
            .namespace("esp_codec")
            .subsystem("decode"),
        &["event"]
    ).expect("failed to create decoder events_total metric");

    /// Per-packet decode time. Decoding is bounded and in-memory, so the
    /// buckets stay in the sub-millisecond range.
    pub static ref DECODE_LATENCY_SECONDS: Histogram = Histogram::with_opts(
        HistogramOpts::new("latency_seconds", "Time spent decoding one packet across all layers")
            .namespace("esp_codec")
            .subsystem("decode")
            .buckets(vec![0.000_000_5, 0.000_001, 0.000_005, 0.000_01, 0.000_05, 0.000_1, 0.001])
    ).expect("failed to create decode latency_seconds metric");

    // ============================================================================
    // Pegs
    // ============================================================================

    /// Folded peg totals. Labels: codec, peg = "processed" | "discards"
    pub static ref CODEC_PEGS: IntGaugeVec = IntGaugeVec::new(
        Opts::new("pegs", "Folded peg counter totals per codec")
            .namespace("esp_codec")
            .subsystem("codec"),
        &["codec", "peg"]
    ).expect("failed to create codec pegs metric");
}

/// Registers every collector with [`REGISTRY`]. Calling it again returns the
/// outcome of the first call.
///
/// # Errors
///
/// Returns [`MetricsError::Registration`] if a collector with the same name
/// was registered by someone else first.
pub fn init_registry() -> Result<(), MetricsError> {
    INITIALIZED
        .get_or_init(|| register_all(&REGISTRY).map_err(|e| e.to_string()))
        .clone()
        .map_err(|msg| MetricsError::Registration(prometheus::Error::Msg(msg)))
}

fn register_all(registry: &Registry) -> Result<(), MetricsError> {
    registry.register(Box::new(PACKETS_TOTAL.clone()))?;
    registry.register(Box::new(BYTES_TOTAL.clone()))?;
    registry.register(Box::new(CHANNEL_SENDS_TOTAL.clone()))?;
    registry.register(Box::new(LAYERS_TOTAL.clone()))?;
    registry.register(Box::new(DECODER_EVENTS_TOTAL.clone()))?;
    registry.register(Box::new(DECODE_LATENCY_SECONDS.clone()))?;
    registry.register(Box::new(CODEC_PEGS.clone()))?;
    Ok(())
}

/// Renders [`REGISTRY`] in the Prometheus text exposition format.
pub fn render() -> Result<String, prometheus::Error> {
    prometheus::TextEncoder::new().encode_to_string(&REGISTRY.gather())
}
