pub use assembly_test_macros::test;
use std::sync::Once;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static INIT: Once = Once::new();

fn init_test_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt = fmt::layer().with_test_writer().with_target(false).compact();

    // try_init also installs the log bridge, the log macros of the crates under test land here
    let _ = tracing_subscriber::registry().with(fmt).with(filter).try_init();
}

/// Test setup executed before each test.
pub fn setup_test() {
    INIT.call_once(|| {
        init_test_tracing();

        let orig_hook = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |panic_info| {
            orig_hook(panic_info);
            log::error!("test panicked: {panic_info}");
        }));
    });
}
