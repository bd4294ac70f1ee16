pub mod checkpoint;
pub mod collection;
pub mod fetcher;
pub mod market;
pub mod pacer;
pub mod pipeline;
pub mod planner;
pub mod scanner;
pub mod snapshot;
pub mod unit;

pub use pipeline::Pipeline;
