//! Process-wide logging setup and the analytics tracking layer.

pub mod tracing_layer;

pub use tracing_layer::{TrackedEvent, TrackingLayer};

use tokio::sync::mpsc;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

/// Filter used when neither an explicit directive nor `RUST_LOG` is set.
pub const DEFAULT_FILTER: &str = "info";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Human,
    Json,
}

#[derive(Debug, Clone, Default)]
pub struct TracingOptions {
    pub format: LogFormat,
    /// Filter directive taking precedence over `RUST_LOG`.
    pub filter: Option<String>,
    /// Forward tracked events into a channel returned by [`init_tracing`].
    pub capture_tracking: bool,
    /// Log to stderr instead of stdout.
    pub stderr: bool,
}

/// Builds the log filter. Invalid directives fall back to [`DEFAULT_FILTER`].
pub fn build_filter(directive: Option<&str>) -> EnvFilter {
    let filter = match directive {
        Some(directive) => EnvFilter::try_new(directive).ok(),
        None => EnvFilter::try_from_default_env().ok(),
    };
    filter.unwrap_or_else(|| EnvFilter::new(DEFAULT_FILTER))
}

/// Installs the global subscriber.
///
/// The filter applies to log output only; the tracking layer sees every
/// tracked event regardless of level settings. Returns the tracking receiver
/// when `capture_tracking` is set.
pub fn init_tracing(
    options: TracingOptions,
) -> Result<Option<mpsc::UnboundedReceiver<TrackedEvent>>, TryInitError> {
    let fmt_layer: Box<dyn Layer<Registry> + Send + Sync> = match (options.format, options.stderr) {
        (LogFormat::Json, true) => fmt::layer().json().with_writer(std::io::stderr).boxed(),
        (LogFormat::Json, false) => fmt::layer().json().boxed(),
        (LogFormat::Human, true) => fmt::layer().with_writer(std::io::stderr).boxed(),
        (LogFormat::Human, false) => fmt::layer().boxed(),
    };
    let fmt_layer = fmt_layer.with_filter(build_filter(options.filter.as_deref()));

    let (tracking, receiver) = if options.capture_tracking {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Some(TrackingLayer::new(sender)), Some(receiver))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(tracking)
        .try_init()?;
    Ok(receiver)
}
