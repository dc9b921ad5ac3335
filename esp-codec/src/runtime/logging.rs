//! Tracing subscriber setup.
//!
//! Logs go to stderr so stdout stays free for the decode summary.

use tracing::Level;
use tracing_subscriber::{
    EnvFilter,
    fmt::{Layer, format::FmtSpan},
    prelude::__tracing_subscriber_SubscriberExt,
    util::SubscriberInitExt,
};

/// Filter directives for `level`: everything at `warn`, this crate at `level`.
/// `RUST_LOG`, when set, replaces them.
pub fn filter_directives(level: Level) -> String {
    format!("warn,esp_codec={level}")
}

/// Installs the global subscriber. Calling it twice is a no-op.
pub fn init(level: Level) {
    let mut fmt_layer = Layer::new()
        .with_writer(std::io::stderr)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(std::env::var("NO_COLOR").is_err());

    match level {
        Level::DEBUG => fmt_layer = fmt_layer.with_file(true).with_line_number(true),
        Level::TRACE => {
            fmt_layer = fmt_layer
                .with_thread_ids(true)
                .with_thread_names(true)
                .with_file(true)
                .with_line_number(true)
        }
        _ => {}
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directives(level)));

    // a second init (tests, embedding) keeps the first subscriber
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init();
}
