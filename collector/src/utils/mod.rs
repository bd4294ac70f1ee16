pub mod logging;
pub mod signal_handler;
pub mod startup_info;
