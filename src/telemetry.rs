use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global subscriber: JSON lines on stdout, level from `RUST_LOG`
/// (default `info`).
pub fn init_telemetry() {
    let _ = try_init_telemetry("info");
}

/// Like `init_telemetry` but tolerates a subscriber already being installed,
/// which happens when several integration tests share a process.
pub fn try_init_telemetry(default_filter: &str) -> Result<(), tracing_subscriber::util::TryInitError> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));

    let formatting_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stdout)
        .json()
        .with_current_span(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(formatting_layer)
        .try_init()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_initialisation_is_reported_not_fatal() {
        let _ = try_init_telemetry("warn");
        assert!(try_init_telemetry("warn").is_err());
    }
}
