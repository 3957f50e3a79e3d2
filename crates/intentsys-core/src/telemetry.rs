//! Log output for the `intentsys` binary.
//!
//! Stage events from [`crate::obs`] go to stderr so that stdout stays free
//! for report JSON and Mermaid text. Library users that install their own
//! subscriber never need this module.

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Route log events to stderr, one line per event.
///
/// The filter comes from `RUST_LOG` if set, else from `level`. With `json`,
/// each event is a JSON object carrying the span fields (`run_id`,
/// `stage`). A subscriber already installed by the host process is kept.
pub fn init_tracing(json: bool, level: Level) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));
    let layer = fmt::layer().with_target(false).with_writer(std::io::stderr);

    if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(layer.json())
            .try_init()
            .ok();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(layer)
            .try_init()
            .ok();
    }
}
