//! Logging initialization for integration tests.
//!
//! Mirrors the crate's `test_bootstrap::logging` module, which is test-only
//! and so not visible to integration test binaries. Filter precedence is
//! `TEST_LOG`, then `RUST_LOG`, then `"warn"`.

use once_cell::sync::OnceCell;

static INITIALIZED: OnceCell<()> = OnceCell::new();

pub fn init() {
    INITIALIZED.get_or_init(|| {
        let filter = std::env::var("TEST_LOG")
            .or_else(|_| std::env::var("RUST_LOG"))
            .unwrap_or_else(|_| "warn".to_owned());

        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .without_time()
            .try_init()
            .ok();
    });
}

/// Runs once per integration test binary, before any tests.
#[ctor::ctor]
fn auto_init() {
    init();
}
