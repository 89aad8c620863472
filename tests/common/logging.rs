use std::sync::Once;

use log::LevelFilter;

static LOGGER_INIT: Once = Once::new();

// Set up a logger that logs all log messages with level `level` and above, once per test binary.
pub(crate) fn setup_logger(level: LevelFilter) {
    LOGGER_INIT.call_once(|| {
        stampchain::logging::setup_logger(level).unwrap();
    })
}
