pub mod pipeline;
pub mod signal;
