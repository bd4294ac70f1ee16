pub mod collection;
pub mod pipeline;
