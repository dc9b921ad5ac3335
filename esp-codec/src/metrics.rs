//! Prometheus metrics for the codec host.
//!
//! - `registry`: collector definitions and registration
//! - `server`: the `/metrics` HTTP endpoint

pub mod registry;
pub mod server;

use crate::codec::CodecApi;

/// Copies a descriptor's folded peg totals into the `codec_pegs` gauges.
pub fn publish_pegs(api: &dyn CodecApi) {
    for (peg, value) in api.stats() {
        registry::CODEC_PEGS
            .with_label_values(&[api.name(), peg])
            .set(i64::try_from(value).unwrap_or(i64::MAX));
    }
}
