use std::sync::Once;

use tracing::Level;
use tracing_subscriber::{filter::FilterFn, layer::SubscriberExt, util::SubscriberInitExt};

/// Installs the global subscriber. Later calls are no-ops.
pub fn setup_logging(max_level: Level) {
    static LOGGING_SETUP: Once = Once::new();

    LOGGING_SETUP.call_once(|| {
        let filter = FilterFn::new(move |meta| {
            meta.module_path().unwrap_or_default().starts_with("ops_console") && *meta.level() <= max_level
        });
        let layer = tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_writer(std::io::stderr);
        // Fails only when the host already installed a subscriber
        let _ = tracing_subscriber::registry().with(layer).with(filter).try_init();
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setup_is_idempotent() {
        setup_logging(Level::DEBUG);
        setup_logging(Level::TRACE);
        tracing::info!("logging ready");
    }
}
