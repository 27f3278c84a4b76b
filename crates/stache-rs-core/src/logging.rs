//! Logging integration for stache-rs.
//!
//! The engine emits [`tracing`] events (compilation, partial loading, fetcher
//! cache activity). This module installs a subscriber configured from
//! [`Settings`] and provides the spans the template crate opens.

use crate::settings::Settings;

/// Filter used when `log_level` is not a valid directive.
const FALLBACK_FILTER: &str = "info";

/// Installs the global `tracing` subscriber described by `settings`.
///
/// `settings.log_level` is an `EnvFilter` directive. What the engine emits:
///
/// - `debug`: a compiler built from settings, each compiled template
///   (segment count), and each partial load inside a `partial` span.
/// - `trace`: fetcher cache misses and stale fetchers discarded after a
///   type mismatch. This is per-variable and noisy.
///
/// With `settings.debug` set, events are pretty-printed with source
/// locations; otherwise each event is one JSON line. Does nothing if a
/// global subscriber is already installed.
pub fn setup_logging(settings: &Settings) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_new(&settings.log_level)
        .unwrap_or_else(|_| EnvFilter::new(FALLBACK_FILTER));
    let builder = fmt().with_env_filter(filter).with_target(true);

    if settings.debug {
        builder
            .pretty()
            .with_file(true)
            .with_line_number(true)
            .try_init()
            .ok();
    } else {
        builder.json().try_init().ok();
    }
}

/// Creates a tracing span for loading and compiling a partial template.
///
/// # Examples
///
/// ```
/// use stache_rs_core::logging::partial_span;
///
/// let span = partial_span("header");
/// let _guard = span.enter();
/// tracing::debug!("loading partial");
/// ```
pub fn partial_span(name: &str) -> tracing::Span {
    tracing::debug_span!("partial", name = name)
}
