use std::sync::Once;

static INIT: Once = Once::new();

/// Install a `RUST_LOG`-driven fmt subscriber. Safe to call more than once.
pub fn init() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();
    });
}
