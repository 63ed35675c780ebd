//! Process-wide logger init, grounded on `util/logger-service`'s single
//! guarded `init()` entry point: a second call is a no-op rather than a
//! panic, since both the binary and integration tests may call it.

use once_cell::sync::OnceCell;

static INIT: OnceCell<()> = OnceCell::new();

/// Initialise the global logger from `RUST_LOG`, defaulting to `info`.
///
/// Safe to call more than once (e.g. once from `main`, once from a test
/// harness); only the first call takes effect.
pub fn init() {
    INIT.get_or_init(|| {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
            .format_timestamp_millis()
            .init();
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_is_idempotent() {
        init();
        init();
    }
}
