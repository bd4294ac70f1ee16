pub mod client;
pub mod config;
pub mod error;

pub use config::{Config, RunMode, RunParams};
